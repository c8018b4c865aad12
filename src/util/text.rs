use std::borrow::Cow;

/// Suffix appended to titles that were cut short.
const ELLIPSIS: &str = "...";

/// Cuts a string to at most `max_chars` characters, appending `"..."` when
/// anything was removed.
///
/// Counts Unicode scalar values, not bytes or display columns, so the cut
/// never lands inside a code point. The ellipsis is added on top of the
/// limit: an over-long title becomes `max_chars + 3` characters.
///
/// Returns `Cow::Borrowed` when the string already fits.
///
/// # Examples
///
/// ```
/// use feedhub::util::truncate_chars;
///
/// assert_eq!(truncate_chars("Short", 10), "Short");
/// assert_eq!(truncate_chars("Hello World", 5), "Hello...");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max_chars) {
        None => Cow::Borrowed(s),
        Some((cut, _)) => Cow::Owned(format!("{}{}", &s[..cut], ELLIPSIS)),
    }
}

/// Removes characters that XML 1.0 forbids in text content.
///
/// Drops C0 control characters and DEL.
/// Preserves: tab (0x09), newline (0x0A), carriage return (0x0D).
///
/// Returns `Cow::Borrowed` when the input contains nothing to strip.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_forbidden = |c: char| c == '\u{7f}' || (c < ' ' && !matches!(c, '\t' | '\n' | '\r'));

    if !s.chars().any(is_forbidden) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.chars().filter(|&c| !is_forbidden(c)).collect())
}

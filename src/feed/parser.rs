use chrono::{DateTime, Utc};
use feed_rs::model::Feed;
use feed_rs::parser::{self, ParseFeedError};
use quick_xml::events::Event;
use quick_xml::Reader;

/// One feed entry as the fetcher sees it, before date filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEntry {
    pub title: String,
    pub link: String,
    /// Published time, falling back to the updated time.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Parses RSS 0.9x/1.0/2.0, Atom or JSON Feed bytes into entries.
///
/// A valid document without entries is an empty list. A malformed document
/// still succeeds when at least one complete, well-formed `<item>` or
/// `<entry>` can be recovered from it; only a document yielding nothing is
/// an error.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<ParsedEntry>, ParseFeedError> {
    let feed = match parser::parse(bytes) {
        Ok(feed) => feed,
        Err(e) => match recover_entries(bytes) {
            Some(feed) => {
                tracing::warn!(
                    error = %e,
                    recovered = feed.entries.len(),
                    "Malformed feed, kept the entries that parse"
                );
                feed
            }
            None => return Err(e),
        },
    };

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| {
            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "No title".to_string());
            let link = entry
                .links
                .into_iter()
                .next()
                .map(|l| l.href)
                .unwrap_or_default();

            ParsedEntry {
                title,
                link,
                timestamp: entry.published.or(entry.updated),
            }
        })
        .collect();

    Ok(entries)
}

/// Rebuilds a malformed XML feed from its complete entry blocks.
///
/// The text before the first block is kept as the document head and its
/// open elements are closed again after the blocks. Each block is checked
/// on its own under that head, so one broken entry only drops itself.
/// Returns `None` when no block survives.
fn recover_entries(bytes: &[u8]) -> Option<Feed> {
    let doc = String::from_utf8_lossy(bytes);

    ["item", "entry"].iter().find_map(|tag| {
        let blocks = complete_blocks(&doc, tag);
        let first = blocks.first()?;
        let head = &doc[..first.0];
        let tail = closing_tags(head)?;

        let kept: Vec<&str> = blocks
            .iter()
            .map(|&(start, end)| &doc[start..end])
            .filter(|block| {
                let single = format!("{}{}{}", head, block, tail);
                matches!(parser::parse(single.as_bytes()), Ok(f) if f.entries.len() == 1)
            })
            .collect();
        if kept.is_empty() {
            return None;
        }

        let repaired = format!("{}{}{}", head, kept.concat(), tail);
        parser::parse(repaired.as_bytes())
            .ok()
            .filter(|feed| !feed.entries.is_empty())
    })
}

/// Byte ranges of every `<tag ...>...</tag>` block that is closed before
/// the next block opens. Scanning stops at the first unclosed block.
fn complete_blocks(doc: &str, tag: &str) -> Vec<(usize, usize)> {
    let close = format!("</{}>", tag);
    let mut blocks = Vec::new();
    let mut pos = 0;

    while let Some(start) = find_open_tag(doc, tag, pos) {
        let after = start + tag.len() + 1;
        let end = doc[after..].find(&close).map(|i| after + i + close.len());
        match (end, find_open_tag(doc, tag, after)) {
            (Some(end), Some(next)) if end > next => pos = next,
            (Some(end), _) => {
                blocks.push((start, end));
                pos = end;
            }
            (None, _) => break,
        }
    }
    blocks
}

/// Position of the next `<tag>` or `<tag attr...>` at or after `from`;
/// longer names sharing the prefix (`<items>`) do not match.
fn find_open_tag(doc: &str, tag: &str, from: usize) -> Option<usize> {
    let open = format!("<{}", tag);
    doc[from..].match_indices(&open).find_map(|(i, _)| {
        let at = from + i;
        match doc.as_bytes().get(at + open.len()) {
            Some(b'>') | Some(b'/') => Some(at),
            Some(b) if b.is_ascii_whitespace() => Some(at),
            _ => None,
        }
    })
}

/// Closing tags for the elements still open at the end of `head`, innermost
/// first. `None` if the head itself is not well-formed.
fn closing_tags(head: &str) -> Option<String> {
    let mut reader = Reader::from_str(head);
    let mut open = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => open.push(String::from_utf8_lossy(e.name().as_ref()).into_owned()),
            Ok(Event::End(_)) => {
                open.pop();
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return None,
        }
    }
    Some(open.iter().rev().map(|name| format!("</{}>", name)).collect())
}

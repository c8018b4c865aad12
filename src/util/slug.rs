/// Derives a URL-safe identifier from a feed's display name.
///
/// Lowercases the name, turns spaces and `/` into hyphens, drops every
/// remaining character that is neither alphanumeric nor a hyphen, collapses
/// hyphen runs and trims hyphens from both ends. Names without any
/// alphanumeric character yield an empty slug.
///
/// # Examples
///
/// ```
/// use feedhub::util::slugify;
///
/// assert_eq!(slugify("Microsoft DevOps Blog"), "microsoft-devops-blog");
/// assert_eq!(slugify("AWS / Azure"), "aws-azure");
/// assert_eq!(slugify("Test@#$%Feed"), "testfeed");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());

    for c in name.chars().flat_map(char::to_lowercase) {
        let c = match c {
            ' ' | '/' => '-',
            c if c.is_alphanumeric() => c,
            '-' => '-',
            _ => continue,
        };
        if c == '-' && (slug.is_empty() || slug.ends_with('-')) {
            continue;
        }
        slug.push(c);
    }

    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

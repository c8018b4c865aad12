//! Multi-page static site.
//!
//! Pages are produced by plain string substitution into an external
//! template; the template is never parsed. Every piece of text that came
//! from a feed or the feed list is escaped before it is embedded.
use quick_xml::escape::escape;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::{format_display_date, RenderError};
use crate::report::{CollectionReport, FailedFeed, FeedResult};
use crate::util::{atomic_write, slugify};

pub const CONTENT_PLACEHOLDER: &str = "<!-- CONTENT_PLACEHOLDER -->";
pub const SIDEBAR_PLACEHOLDER: &str = "<!-- SIDEBAR_PLACEHOLDER -->";
pub const TIMESTAMP_PLACEHOLDER: &str = "<!-- TIMESTAMP_PLACEHOLDER -->";
/// Stylesheet link carrying a cache-busting version; replaced before the
/// generic timestamp placeholder so it receives the epoch version.
const STYLESHEET_LINK: &str = r#"href="styles.css?v=<!-- TIMESTAMP_PLACEHOLDER -->""#;

/// Which page of the site is being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page<'a> {
    /// `index.html`: every feed.
    Index,
    /// `summary.html`: counters, failures and per-feed breakdown.
    Summary,
    /// `feed-<slug>.html`: a single feed.
    Feed(&'a str),
}

/// File name of a feed's page.
pub fn feed_page_name(feed_name: &str) -> String {
    format!("feed-{}.html", slugify(feed_name))
}

/// Reads the page template.
pub fn load_template(path: &Path) -> Result<String, RenderError> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RenderError::TemplateNotFound(path.to_path_buf())
        } else {
            RenderError::Template {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}

/// Sidebar navigation: all feeds, each feed alphabetically, then summary.
pub fn render_nav(report: &CollectionReport, current: Page<'_>) -> String {
    let active = |is_current: bool| if is_current { " active" } else { "" };

    let mut nav = String::from("<nav class=\"feed-nav\">\n");
    let _ = writeln!(
        nav,
        "  <a href=\"index.html\" class=\"nav-link{}\">All Feeds</a>",
        active(current == Page::Index)
    );
    for (name, _) in report.feeds.iter_sorted() {
        let _ = writeln!(
            nav,
            "  <a href=\"{}\" class=\"nav-link{}\">{}</a>",
            feed_page_name(name),
            active(current == Page::Feed(name)),
            escape(name)
        );
    }
    let _ = writeln!(
        nav,
        "  <a href=\"summary.html\" class=\"nav-link{}\">Summary</a>",
        active(current == Page::Summary)
    );
    nav.push_str("</nav>\n");
    nav
}

/// Page body (without the template wrapper).
pub fn render_content(report: &CollectionReport, page: Page<'_>) -> String {
    match page {
        Page::Summary => render_summary(report),
        Page::Feed(name) => {
            let mut content = format!("\n        <h2>{}</h2>\n", escape(name));
            if let Some(feed) = report.feeds.get(name) {
                content.push_str(&render_feed_section(name, feed));
            }
            content
        }
        Page::Index => {
            // Feeds with articles first, then empty feeds; each group alphabetical
            let (with_articles, empty): (Vec<_>, Vec<_>) =
                report.feeds.iter_sorted().partition(|(_, f)| f.count() > 0);
            with_articles
                .into_iter()
                .chain(empty)
                .map(|(name, feed)| render_feed_section(name, feed))
                .collect()
        }
    }
}

/// Complete page: template with content, navigation, timestamp and title filled in.
pub fn render_page(
    report: &CollectionReport,
    template: &str,
    page: Page<'_>,
    site_title: &str,
) -> String {
    let collected_at = report.metadata.collected_at;
    let formatted_time = collected_at.format("%B %d, %Y at %I:%M %p UTC").to_string();
    let cache_version = collected_at.timestamp().to_string();

    let page_title = match page {
        Page::Index => site_title.to_string(),
        Page::Summary => format!("Summary - {}", site_title),
        Page::Feed(name) => format!("{} - {}", name, site_title),
    };

    template
        .replace(CONTENT_PLACEHOLDER, &render_content(report, page))
        .replace(SIDEBAR_PLACEHOLDER, &render_nav(report, page))
        .replace(
            STYLESHEET_LINK,
            &format!("href=\"styles.css?v={}\"", cache_version),
        )
        .replace(TIMESTAMP_PLACEHOLDER, &formatted_time)
        .replace(
            &format!("<title>{}</title>", site_title),
            &format!("<title>{}</title>", escape(&page_title)),
        )
}

/// Writes `index.html`, `summary.html` and one page per feed into `out_dir`.
///
/// Returns the written paths in write order.
pub fn write_site(
    report: &CollectionReport,
    template: &str,
    out_dir: &Path,
    site_title: &str,
) -> Result<Vec<PathBuf>, RenderError> {
    let mut written = Vec::new();
    let mut write = |file_name: &str, html: String| -> Result<(), RenderError> {
        let path = out_dir.join(file_name);
        atomic_write(&path, html.as_bytes()).map_err(|e| RenderError::Write {
            path: path.clone(),
            source: e,
        })?;
        tracing::info!(path = %path.display(), "Wrote page");
        written.push(path);
        Ok(())
    };

    write("index.html", render_page(report, template, Page::Index, site_title))?;
    write(
        "summary.html",
        render_page(report, template, Page::Summary, site_title),
    )?;

    let mut seen: HashMap<String, &str> = HashMap::new();
    for (name, _) in report.feeds.iter_sorted() {
        let file_name = feed_page_name(name);
        if let Some(previous) = seen.insert(file_name.clone(), name) {
            tracing::warn!(
                feed = %name,
                other = %previous,
                file = %file_name,
                "Feed names share a slug, later page overwrites the earlier one"
            );
        }
        write(
            &file_name,
            render_page(report, template, Page::Feed(name), site_title),
        )?;
    }

    Ok(written)
}

fn render_feed_section(name: &str, feed: &FeedResult) -> String {
    let count = feed.count();
    let plural = if count == 1 { "" } else { "s" };

    let mut content = format!(
        r#"
        <div class="feed-section">
            <h3>{}
                <span class="feed-count">{} article{}</span>
            </h3>
"#,
        escape(name),
        count,
        plural
    );

    if feed.articles().is_empty() {
        content.push_str(
            r#"            <div class="no-articles">No new articles in this time period</div>
"#,
        );
    } else {
        content.push_str("            <ul class=\"article-list\">\n");
        for article in feed.articles() {
            let published = article.published.to_string();
            let _ = write!(
                content,
                r#"                <li class="article-item" data-published="{}">
                    <a href="{}" class="article-title" target="_blank" rel="noopener noreferrer">{}</a>
                    <div class="article-meta">{}</div>
                </li>
"#,
                escape(&published),
                escape(&article.link),
                escape(&article.title),
                escape(&format_display_date(&article.published))
            );
        }
        content.push_str("            </ul>\n");
    }

    content.push_str("        </div>\n");
    content
}

fn render_failed_feeds(failed_feeds: &[FailedFeed]) -> String {
    let mut content = String::from("\n        <h2>Failed Feeds</h2>\n");
    if failed_feeds.is_empty() {
        content.push_str("        <div class=\"no-articles\">No failed feeds</div>\n");
        return content;
    }

    content.push_str("        <div class=\"failed-feeds\">\n");
    for failed in failed_feeds {
        let _ = write!(
            content,
            r#"            <div class="failed-feed-item">
                <div class="failed-feed-name">{}</div>
                <div class="failed-feed-url">{}</div>
                <div class="failed-feed-error">Error: {}</div>
            </div>
"#,
            escape(&failed.name),
            escape(&failed.url),
            escape(&failed.error)
        );
    }
    content.push_str("        </div>\n");
    content
}

const ICON_FEEDS: &str = r#"<path d="M4 11a9 9 0 0 1 9 9"></path><path d="M4 4a16 16 0 0 1 16 16"></path><circle cx="5" cy="19" r="1"></circle>"#;
const ICON_SUCCESS: &str = r#"<path d="M12 22s8-4 8-10V5l-8-3-8 3v7c0 6 8 10 8 10z"></path><polyline points="9 12 11 14 15 10"></polyline>"#;
const ICON_FAILED: &str = r#"<path d="M10.29 3.86L1.82 18a2 2 0 0 0 1.71 3h16.94a2 2 0 0 0 1.71-3L13.71 3.86a2 2 0 0 0-3.42 0z"></path><line x1="12" y1="9" x2="12" y2="13"></line><line x1="12" y1="17" x2="12.01" y2="17"></line>"#;
const ICON_ARTICLES: &str = r#"<polygon points="12 2 2 7 12 12 22 7 12 2"></polygon><polyline points="2 17 12 22 22 17"></polyline><polyline points="2 12 12 17 22 12"></polyline>"#;

fn stat_card(content: &mut String, modifier: &str, icon: &str, label: &str, value: usize) {
    let _ = write!(
        content,
        r#"            <div class="stat-card{}">
                <div class="stat-icon">
                    <svg width="32" height="32" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round">{}</svg>
                </div>
                <div class="stat-label">{}</div>
                <div class="stat-value">{}</div>
            </div>
"#,
        modifier, icon, label, value
    );
}

fn render_summary(report: &CollectionReport) -> String {
    let summary = &report.summary;
    let mut content = String::from(
        r#"
        <h2>Feed Collection Summary</h2>
        <div class="summary-intro">
            Overview of RSS feed collection status and statistics.
        </div>
        <div class="stats">
"#,
    );
    stat_card(&mut content, "", ICON_FEEDS, "Total Feeds", summary.total_feeds);
    stat_card(&mut content, " success", ICON_SUCCESS, "Successful", summary.successful_feeds);
    stat_card(&mut content, " error", ICON_FAILED, "Failed", summary.failed_feeds);
    stat_card(&mut content, "", ICON_ARTICLES, "Total Articles", summary.total_articles);
    content.push_str("        </div>\n");

    if !report.failed_feeds.is_empty() {
        content.push_str(&render_failed_feeds(&report.failed_feeds));
    }

    if !report.feeds.is_empty() {
        content.push_str("\n        <h2>Feed Breakdown</h2>\n        <div class=\"feed-breakdown\">\n");

        // Stable sort: equal counts keep collection order
        let mut by_count: Vec<_> = report.feeds.iter().collect();
        by_count.sort_by(|a, b| b.1.count().cmp(&a.1.count()));

        for (name, feed) in by_count {
            let percentage = if summary.total_articles > 0 {
                feed.count() as f64 / summary.total_articles as f64 * 100.0
            } else {
                0.0
            };
            let _ = write!(
                content,
                r#"            <div class="feed-breakdown-item">
                <div class="feed-breakdown-header">
                    <a href="{}" class="feed-breakdown-name">{}</a>
                    <div class="feed-breakdown-count">{} articles</div>
                </div>
                <div class="feed-breakdown-bar">
                    <div class="feed-breakdown-fill" style="width: {:.1}%"></div>
                </div>
            </div>
"#,
                feed_page_name(name),
                escape(name),
                feed.count(),
                percentage
            );
        }
        content.push_str("        </div>\n");
    }

    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Article, FeedMap, Metadata, Published};
    use chrono::{TimeZone, Utc};

    const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<title>Feed Hub</title>
<link rel="stylesheet" href="styles.css?v=<!-- TIMESTAMP_PLACEHOLDER -->">
</head>
<body>
<aside><!-- SIDEBAR_PLACEHOLDER --></aside>
<main><!-- CONTENT_PLACEHOLDER --></main>
<footer>Last updated: <!-- TIMESTAMP_PLACEHOLDER --></footer>
</body>
</html>
"#;

    fn article(title: &str, hour: u32) -> Article {
        Article {
            title: title.to_string(),
            link: format!("https://example.com/{}", slugify(title)),
            published: Published::at(Utc.with_ymd_and_hms(2026, 1, 7, hour, 0, 0).unwrap()),
        }
    }

    fn report_with(feeds: Vec<(&str, Vec<Article>)>, failed: Vec<FailedFeed>) -> CollectionReport {
        let total = feeds.len() + failed.len();
        let mut map = FeedMap::new();
        for (name, articles) in feeds {
            map.insert(name, FeedResult::new(format!("https://{}.example.com", slugify(name)), articles));
        }
        let collected_at = Utc.with_ymd_and_hms(2026, 1, 7, 23, 5, 0).unwrap();
        CollectionReport::new(
            Metadata {
                collected_at,
                since: collected_at - chrono::Duration::hours(720),
                hours: 720,
            },
            map,
            failed,
            total,
        )
    }

    fn ordering_report() -> CollectionReport {
        report_with(
            vec![
                ("Empty Feed A", vec![]),
                ("GitHub Blog", vec![article("Article 1", 20), article("Article 2", 19)]),
                ("Empty Feed Z", vec![]),
                ("Active Feed B", vec![article("Article 3", 18)]),
            ],
            vec![],
        )
    }

    #[test]
    fn test_index_orders_non_empty_feeds_first() {
        let html = render_content(&ordering_report(), Page::Index);
        let pos = |needle: &str| html.find(needle).unwrap();

        assert!(pos("Active Feed B") < pos("GitHub Blog"));
        assert!(pos("GitHub Blog") < pos("Empty Feed A"));
        assert!(pos("Empty Feed A") < pos("Empty Feed Z"));
    }

    #[test]
    fn test_feed_count_pluralization() {
        let html = render_content(&ordering_report(), Page::Index);
        assert!(html.contains("2 articles"));
        assert!(html.contains("1 article</span>"));
        assert!(html.contains("0 articles"));
        assert!(html.contains("No new articles in this time period"));
    }

    #[test]
    fn test_feed_page_shows_only_that_feed() {
        let html = render_content(&ordering_report(), Page::Feed("GitHub Blog"));
        assert!(html.contains("<h2>GitHub Blog</h2>"));
        assert!(html.contains("Article 1"));
        assert!(!html.contains("Article 3"));
        assert!(!html.contains("Empty Feed A"));
    }

    #[test]
    fn test_article_markup() {
        let html = render_content(&ordering_report(), Page::Feed("Active Feed B"));
        assert!(html.contains(r#"data-published="2026-01-07T18:00:00+00:00""#));
        assert!(html.contains(r#"href="https://example.com/article-3""#));
        assert!(html.contains("Jan 07, 2026 at 06:00 PM"));
        assert!(html.contains(r#"rel="noopener noreferrer""#));
    }

    #[test]
    fn test_undated_article_shows_unknown() {
        let report = report_with(
            vec![(
                "Blog",
                vec![Article {
                    title: "Undated".into(),
                    link: "https://example.com/u".into(),
                    published: Published::Unknown,
                }],
            )],
            vec![],
        );
        let html = render_content(&report, Page::Index);
        assert!(html.contains(r#"data-published="Unknown""#));
        assert!(html.contains(r#"<div class="article-meta">Unknown</div>"#));
    }

    #[test]
    fn test_offset_dates_shown_as_written() {
        let report = report_with(
            vec![(
                "Blog",
                vec![Article {
                    title: "Offset".into(),
                    link: "https://example.com/o".into(),
                    published: Published::parse("2026-01-10T10:00:00+01:00"),
                }],
            )],
            vec![],
        );
        let html = render_content(&report, Page::Index);
        assert!(html.contains(r#"data-published="2026-01-10T10:00:00+01:00""#));
        assert!(html.contains("Jan 10, 2026 at 10:00 AM"));
    }

    #[test]
    fn test_escapes_injected_text() {
        let report = report_with(
            vec![(
                "Test Blog <script>",
                vec![Article {
                    title: "<img src=x onerror=alert(1)>".into(),
                    link: "https://example.com/?a=1&b=\"2\"".into(),
                    published: Published::Unknown,
                }],
            )],
            vec![FailedFeed {
                name: "<b>bad</b>".into(),
                url: "https://example.com/<x>".into(),
                error: "<script>alert(1)</script>".into(),
            }],
        );

        for page in [Page::Index, Page::Summary, Page::Feed("Test Blog <script>")] {
            let html = render_page(&report, TEMPLATE, page, "Feed Hub");
            assert!(!html.contains("<script>"), "unescaped script in {:?}", page);
            assert!(!html.contains("<img"), "unescaped img in {:?}", page);
            assert!(!html.contains("<b>bad"), "unescaped failure in {:?}", page);
        }

        let index = render_page(&report, TEMPLATE, Page::Index, "Feed Hub");
        assert!(index.contains("Test Blog &lt;script&gt;"));
        assert!(index.contains("a=1&amp;b=&quot;2&quot;"));
    }

    #[test]
    fn test_nav_marks_current_page() {
        let report = ordering_report();

        let nav = render_nav(&report, Page::Index);
        assert!(nav.contains(r#"<a href="index.html" class="nav-link active">All Feeds</a>"#));
        assert!(nav.contains(r#"<a href="summary.html" class="nav-link">Summary</a>"#));

        let nav = render_nav(&report, Page::Feed("GitHub Blog"));
        assert!(nav.contains(r#"<a href="feed-github-blog.html" class="nav-link active">GitHub Blog</a>"#));
        assert!(nav.contains(r#"<a href="index.html" class="nav-link">All Feeds</a>"#));

        let nav = render_nav(&report, Page::Summary);
        assert!(nav.contains(r#"<a href="summary.html" class="nav-link active">Summary</a>"#));
        assert_eq!(nav.matches(" active").count(), 1);
    }

    #[test]
    fn test_nav_lists_feeds_alphabetically() {
        let nav = render_nav(&ordering_report(), Page::Index);
        let pos = |needle: &str| nav.find(needle).unwrap();
        assert!(pos("Active Feed B") < pos("Empty Feed A"));
        assert!(pos("Empty Feed A") < pos("Empty Feed Z"));
        assert!(pos("Empty Feed Z") < pos("GitHub Blog"));
        assert!(pos("GitHub Blog") < pos("summary.html"));
    }

    #[test]
    fn test_feed_named_summary_is_not_the_summary_page() {
        let report = report_with(vec![("summary", vec![article("Inside", 10)])], vec![]);
        let nav = render_nav(&report, Page::Feed("summary"));
        assert!(nav.contains(r#"<a href="feed-summary.html" class="nav-link active">summary</a>"#));
        assert!(nav.contains(r#"<a href="summary.html" class="nav-link">Summary</a>"#));
    }

    #[test]
    fn test_template_substitution() {
        let report = ordering_report();
        let html = render_page(&report, TEMPLATE, Page::Feed("GitHub Blog"), "Feed Hub");

        assert!(html.contains("<title>GitHub Blog - Feed Hub</title>"));
        assert!(html.contains(r#"href="styles.css?v=1767827100""#));
        assert!(html.contains("Last updated: January 07, 2026 at 11:05 PM UTC"));
        assert!(!html.contains("PLACEHOLDER"));

        let summary = render_page(&report, TEMPLATE, Page::Summary, "Feed Hub");
        assert!(summary.contains("<title>Summary - Feed Hub</title>"));

        let index = render_page(&report, TEMPLATE, Page::Index, "Feed Hub");
        assert!(index.contains("<title>Feed Hub</title>"));
    }

    #[test]
    fn test_summary_page() {
        let report = report_with(
            vec![
                ("Small", vec![article("s1", 1)]),
                ("Big", vec![article("b1", 1), article("b2", 2), article("b3", 3)]),
            ],
            vec![FailedFeed {
                name: "Down".into(),
                url: "https://down.example.com".into(),
                error: "HTTP error: status 503".into(),
            }],
        );
        let html = render_content(&report, Page::Summary);

        assert!(html.contains(r#"<div class="stat-label">Total Feeds</div>
                <div class="stat-value">3</div>"#));
        assert!(html.contains(r#"<div class="stat-label">Total Articles</div>
                <div class="stat-value">4</div>"#));
        assert!(html.contains("Error: HTTP error: status 503"));
        assert!(html.contains("width: 75.0%"));
        assert!(html.contains("width: 25.0%"));
        // Breakdown sorted by count, descending
        assert!(html.find(r#"href="feed-big.html""#).unwrap() < html.find(r#"href="feed-small.html""#).unwrap());
    }

    #[test]
    fn test_summary_without_failures_omits_section() {
        let html = render_content(&ordering_report(), Page::Summary);
        assert!(!html.contains("Failed Feeds"));
        assert!(html.contains("Feed Breakdown"));
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let report = ordering_report();
        for page in [Page::Index, Page::Summary, Page::Feed("GitHub Blog")] {
            assert_eq!(
                render_page(&report, TEMPLATE, page, "Feed Hub"),
                render_page(&report, TEMPLATE, page, "Feed Hub")
            );
        }
    }

    #[test]
    fn test_write_site() {
        let dir = std::env::temp_dir().join("feedhub_html_test_write_site");
        std::fs::remove_dir_all(&dir).ok();

        let written = write_site(&ordering_report(), TEMPLATE, &dir, "Feed Hub").unwrap();
        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "index.html",
                "summary.html",
                "feed-active-feed-b.html",
                "feed-empty-feed-a.html",
                "feed-empty-feed-z.html",
                "feed-github-blog.html",
            ]
        );
        let page = std::fs::read_to_string(dir.join("feed-github-blog.html")).unwrap();
        assert!(page.contains("<h2>GitHub Blog</h2>"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_template() {
        let err = load_template(Path::new("/tmp/feedhub_no_such_template.html")).unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound(_)));
    }
}

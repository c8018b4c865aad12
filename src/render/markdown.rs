use crate::report::CollectionReport;
use crate::util::truncate_chars;

/// Rows shown per feed before the "...and N more" notice.
const MAX_ROWS_PER_FEED: usize = 10;
/// Titles longer than this many characters are shortened.
const MAX_TITLE_CHARS: usize = 80;

/// Renders the Markdown status summary (for CI job summaries).
///
/// Sections: header, summary counts, one table per successful feed (in
/// collection order, at most ten rows), then the failed feeds with their
/// error reasons.
pub fn render_markdown(report: &CollectionReport, site_title: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("# 📰 {} Summary\n", site_title));
    lines.push(format!(
        "**Collected at:** {}\n",
        report.metadata.collected_at.to_rfc3339()
    ));
    lines.push(format!("**Time range:** Last {} hours\n", report.metadata.hours));
    lines.push("**Note:** Web interface provides filtering for 1 day, 7 days, or 30 days\n".into());
    lines.push(String::new());

    let summary = &report.summary;
    lines.push("## 📊 Summary\n".into());
    lines.push(format!("- **Total feeds:** {}", summary.total_feeds));
    lines.push(format!("- **Successful:** {}", summary.successful_feeds));
    lines.push(format!("- **Failed:** {}", summary.failed_feeds));
    lines.push(format!("- **Total articles:** {}", summary.total_articles));
    lines.push(String::new());

    if !report.feeds.is_empty() {
        lines.push("## ✅ Successful Feeds\n".into());
        for (name, feed) in report.feeds.iter() {
            lines.push(format!("### {}", name));
            lines.push(format!("- **Articles:** {}", feed.count()));

            if feed.articles().is_empty() {
                lines.push("*No new articles*".into());
            } else {
                lines.push("\n| Title | Published |".into());
                lines.push("|-------|-----------|".into());
                for article in feed.articles().iter().take(MAX_ROWS_PER_FEED) {
                    lines.push(format!(
                        "| [{}]({}) | {} |",
                        truncate_chars(&article.title, MAX_TITLE_CHARS),
                        article.link,
                        article.published
                    ));
                }
                if feed.count() > MAX_ROWS_PER_FEED {
                    lines.push(format!(
                        "\n*...and {} more articles*",
                        feed.count() - MAX_ROWS_PER_FEED
                    ));
                }
            }
            lines.push(String::new());
        }
    }

    if !report.failed_feeds.is_empty() {
        lines.push("## ❌ Failed Feeds\n".into());
        lines.push("| Feed Name | URL | Error |".into());
        lines.push("|-----------|-----|-------|".into());
        for failed in &report.failed_feeds {
            lines.push(format!("| {} | {} | {} |", failed.name, failed.url, failed.error));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

//! Output renderers for a [`CollectionReport`](crate::report::CollectionReport).
//!
//! Every renderer is a pure function of the report (plus site settings);
//! the `write_*` helpers only add the final file writes. Rendering the same
//! report twice yields identical bytes.
//!
//! - [`markdown`] - status summary for CI job pages
//! - [`html`] - multi-page static site driven by an external template
//! - [`rss`] - RSS 2.0 master feed plus one feed per source

pub mod html;
pub mod markdown;
pub mod rss;

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

use crate::report::{Article, Published};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("HTML template file not found at '{0}'. Ensure the template file exists and the path is correct.")]
    TemplateNotFound(PathBuf),

    #[error("Error reading HTML template file at '{path}': {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XML writer error: {0}")]
    Xml(String),
}

/// Orders items newest first by their article's timestamp.
///
/// Undated and unparseable articles sort after every dated one. The sort is
/// stable: items sharing a timestamp keep their input order.
pub fn sort_newest_first<T>(items: &mut [T], article: impl Fn(&T) -> &Article) {
    items.sort_by(|a, b| {
        let a = article(a).published.timestamp();
        let b = article(b).published.timestamp();
        // None < Some(_), so comparing b to a puts undated entries last
        b.cmp(&a)
    });
}

/// Human-readable date for article listings, e.g. `Jan 06, 2026 at 07:24 PM`,
/// in the timestamp's own offset. Text that is not a timestamp is shown as-is.
pub fn format_display_date(published: &Published) -> String {
    match published {
        Published::At { time, .. } => time.format("%b %d, %Y at %I:%M %p").to_string(),
        other => other.to_string(),
    }
}

/// RFC 822 date as required by RSS 2.0, always in UTC.
pub fn format_rfc822(dt: DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S +0000").to_string()
}

//! Static-site feed aggregator.
//!
//! `collect` fetches the configured feeds into a [`report::CollectionReport`];
//! the renderers in [`render`] turn that report into a Markdown summary, an
//! HTML site and RSS feeds.

pub mod config;
pub mod feed;
pub mod render;
pub mod report;
pub mod util;

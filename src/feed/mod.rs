//! Feed collection: fetching, parsing and date-window filtering.
//!
//! - [`parser`] - feed parsing using the `feed-rs` crate
//! - [`filter`] - cutoff computation and the keep/drop rule for entries
//! - [`fetcher`] - one HTTP request per feed, classified into [`FetchError`]
//! - [`collector`] - sequential walk over the feed list producing a
//!   [`CollectionReport`](crate::report::CollectionReport)
//!
//! # Example
//!
//! ```ignore
//! use feedhub::feed::{collect, FeedFetcher};
//!
//! let fetcher = FeedFetcher::new(&settings)?;
//! let report = collect(&fetcher, &feed_list, Utc::now(), 24).await;
//! report.save(Path::new("collection.json"))?;
//! ```

mod collector;
mod fetcher;
mod filter;
mod parser;

pub use collector::collect;
pub use fetcher::{FeedFetcher, FetchError};
pub use filter::{cutoff, effective_hours, filter_entries, MIN_LOOKBACK_HOURS};
pub use parser::{parse_feed, ParsedEntry};

//! The collection report: the JSON hand-off between the collect stage and
//! every render stage.
//!
//! Field names and nesting are a compatibility surface. A report written by
//! [`CollectionReport::save`] and read back by [`CollectionReport::load`]
//! renders byte-identically to the in-memory original.
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::util::atomic_write;

/// Marker stored in place of a timestamp for undated entries.
pub const UNKNOWN_DATE: &str = "Unknown";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Input file {0} not found")]
    NotFound(PathBuf),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ============================================================================
// Timestamps
// ============================================================================

/// Publication time of an article as carried in the report.
///
/// Collected articles are always `At` or `Unknown`. `At` keeps the text it
/// was read from next to the parsed time, so a report written by another
/// tool renders its dates as written (offset included). `Raw` only appears
/// when a report holds text that does not parse as a timestamp; renderers
/// degrade gracefully on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Published {
    At {
        time: DateTime<FixedOffset>,
        text: String,
    },
    Unknown,
    Raw(String),
}

impl Published {
    /// A collected timestamp in canonical form (RFC 3339, `+00:00`).
    pub fn at(time: DateTime<Utc>) -> Self {
        Self::At {
            time: time.fixed_offset(),
            text: time.to_rfc3339_opts(SecondsFormat::AutoSi, false),
        }
    }

    /// Interprets report text with [`parse_timestamp`], then the
    /// `"Unknown"` marker. The text itself is kept for display.
    pub fn parse(text: &str) -> Self {
        if text == UNKNOWN_DATE {
            return Self::Unknown;
        }
        match parse_timestamp(text) {
            Some(time) => Self::At {
                time,
                text: text.to_string(),
            },
            None => Self::Raw(text.to_string()),
        }
    }

    /// The instant, if there is a usable one.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::At { time, .. } => Some(time.with_timezone(&Utc)),
            Self::Unknown | Self::Raw(_) => None,
        }
    }
}

impl fmt::Display for Published {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At { text, .. } => f.write_str(text),
            Self::Unknown => f.write_str(UNKNOWN_DATE),
            Self::Raw(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for Published {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Published {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Self::parse(&text))
    }
}

/// Offset-less layouts, taken as UTC.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses an ISO 8601 timestamp, keeping its offset.
///
/// Accepts RFC 3339, a space instead of `T`, values without an offset
/// (taken as UTC) and bare dates (midnight UTC).
pub fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt);
    }
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    Some(naive.and_utc().fixed_offset())
}

mod lenient_datetime {
    use super::*;

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, false))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_timestamp(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", text)))
    }
}

// ============================================================================
// Report Structures
// ============================================================================

/// One syndicated entry that survived the date filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub link: String,
    pub published: Published,
}

fn default_title() -> String {
    "No title".to_string()
}

/// Articles collected from one successfully fetched feed.
///
/// `count` always equals `articles.len()`: the only constructor computes it,
/// and deserialization recomputes it from the article list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FeedResultRecord")]
pub struct FeedResult {
    pub url: String,
    articles: Vec<Article>,
    count: usize,
}

impl FeedResult {
    pub fn new(url: impl Into<String>, articles: Vec<Article>) -> Self {
        let count = articles.len();
        Self {
            url: url.into(),
            articles,
            count,
        }
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

#[derive(Deserialize)]
struct FeedResultRecord {
    #[serde(default)]
    url: String,
    #[serde(default)]
    articles: Vec<Article>,
    count: Option<usize>,
}

impl From<FeedResultRecord> for FeedResult {
    fn from(record: FeedResultRecord) -> Self {
        if let Some(count) = record.count.filter(|&c| c != record.articles.len()) {
            tracing::warn!(
                url = %record.url,
                stored = count,
                actual = record.articles.len(),
                "Stored article count does not match article list, using list length"
            );
        }
        Self::new(record.url, record.articles)
    }
}

/// A feed whose fetch or parse failed during collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedFeed {
    pub name: String,
    pub url: String,
    #[serde(default = "default_error")]
    pub error: String,
}

fn default_error() -> String {
    "Unknown".to_string()
}

/// Feed name → result, in collection order.
///
/// Serialized as a JSON object whose key order is the insertion order, so
/// the Markdown summary lists feeds the way the feed list does.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedMap {
    entries: Vec<(String, FeedResult)>,
}

impl FeedMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a feed, replacing (in place) any earlier feed with the same
    /// name. Returns the replaced result.
    pub fn insert(&mut self, name: impl Into<String>, feed: FeedResult) -> Option<FeedResult> {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, feed)),
            None => {
                self.entries.push((name, feed));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&FeedResult> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    /// Iterates in collection order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeedResult)> {
        self.entries.iter().map(|(n, f)| (n.as_str(), f))
    }

    /// Iterates alphabetically by feed name.
    pub fn iter_sorted(&self) -> impl Iterator<Item = (&str, &FeedResult)> {
        let mut sorted: Vec<_> = self.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        sorted.into_iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_articles(&self) -> usize {
        self.entries.iter().map(|(_, f)| f.count()).sum()
    }
}

impl Serialize for FeedMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, feed) in &self.entries {
            map.serialize_entry(name, feed)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FeedMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FeedMapVisitor;

        impl<'de> Visitor<'de> for FeedMapVisitor {
            type Value = FeedMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of feed name to feed result")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FeedMap, A::Error> {
                let mut feeds = FeedMap::new();
                while let Some((name, feed)) = access.next_entry::<String, FeedResult>()? {
                    feeds.insert(name, feed);
                }
                Ok(feeds)
            }
        }

        deserializer.deserialize_map(FeedMapVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(with = "lenient_datetime")]
    pub collected_at: DateTime<Utc>,
    #[serde(with = "lenient_datetime")]
    pub since: DateTime<Utc>,
    #[serde(default = "default_hours")]
    pub hours: u32,
}

fn default_hours() -> u32 {
    24
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_feeds: usize,
    pub successful_feeds: usize,
    pub failed_feeds: usize,
    pub total_articles: usize,
}

/// Everything one collection run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionReport {
    pub metadata: Metadata,
    pub feeds: FeedMap,
    pub failed_feeds: Vec<FailedFeed>,
    pub summary: Summary,
}

impl CollectionReport {
    /// Builds a report, deriving the summary counters from its parts.
    ///
    /// `total_feeds` is the size of the configured feed list, which may
    /// exceed `feeds + failed_feeds` when entries without a URL were skipped.
    pub fn new(
        metadata: Metadata,
        feeds: FeedMap,
        failed_feeds: Vec<FailedFeed>,
        total_feeds: usize,
    ) -> Self {
        let summary = Summary {
            total_feeds,
            successful_feeds: feeds.len(),
            failed_feeds: failed_feeds.len(),
            total_articles: feeds.total_articles(),
        };
        Self {
            metadata,
            feeds,
            failed_feeds,
            summary,
        }
    }

    /// Reads a report written by the collect stage.
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ReportError::NotFound(path.to_path_buf())
            } else {
                ReportError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        serde_json::from_str(&content).map_err(|e| ReportError::Json {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Writes the report as pretty-printed JSON (two-space indent).
    pub fn save(&self, path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| ReportError::Json {
            path: path.to_path_buf(),
            source: e,
        })?;
        atomic_write(path, json.as_bytes()).map_err(|e| ReportError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

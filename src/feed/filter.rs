use chrono::{DateTime, Duration, Timelike, Utc};

use crate::feed::parser::ParsedEntry;
use crate::report::{Article, Published};

/// Smallest lookback window ever collected (30 days). The site narrows it
/// to 1, 7 or 30 days client-side.
pub const MIN_LOOKBACK_HOURS: u32 = 720;

/// The window actually collected for a requested number of hours.
pub fn effective_hours(requested_hours: u32) -> u32 {
    requested_hours.max(MIN_LOOKBACK_HOURS)
}

/// Earliest-exclusive inclusion boundary: `now - max(requested, 720)` hours.
pub fn cutoff(now: DateTime<Utc>, requested_hours: u32) -> DateTime<Utc> {
    now - Duration::hours(i64::from(effective_hours(requested_hours)))
}

/// Keeps entries newer than `cutoff` plus every undated entry.
///
/// Timestamps are truncated to whole seconds before comparison, matching
/// the canonical text they are stored as. Undated entries are never dropped:
/// they are kept and marked `Unknown`.
pub fn filter_entries(entries: Vec<ParsedEntry>, cutoff: DateTime<Utc>) -> Vec<Article> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let published = match entry.timestamp {
                Some(ts) => {
                    let ts = ts.with_nanosecond(0).unwrap_or(ts);
                    if ts <= cutoff {
                        return None;
                    }
                    Published::at(ts)
                }
                None => Published::Unknown,
            };
            Some(Article {
                title: entry.title,
                link: entry.link,
                published,
            })
        })
        .collect()
}

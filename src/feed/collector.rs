use chrono::{DateTime, Utc};

use crate::config::FeedList;
use crate::feed::fetcher::FeedFetcher;
use crate::feed::filter::{cutoff, effective_hours};
use crate::report::{CollectionReport, FailedFeed, FeedMap, FeedResult, Metadata};

/// Fetches every configured feed and assembles the collection report.
///
/// Feeds are fetched one after another in configuration order, so the
/// failed-feed list keeps that order. A feed with an empty (or `null`) URL
/// is skipped with a warning and leaves no trace in `feeds` or
/// `failed_feeds`, but still counts towards `summary.total_feeds`. A
/// whitespace-only URL is not empty: it is attempted and fails.
///
/// Per-feed failures never abort the run; they become [`FailedFeed`]
/// entries carrying the error text.
pub async fn collect(
    fetcher: &FeedFetcher,
    feed_list: &FeedList,
    now: DateTime<Utc>,
    requested_hours: u32,
) -> CollectionReport {
    let hours = effective_hours(requested_hours);
    let since = cutoff(now, requested_hours);
    tracing::info!(
        since = %since.to_rfc3339(),
        hours = hours,
        "Fetching articles published after cutoff"
    );

    let mut feeds = FeedMap::new();
    let mut failed_feeds = Vec::new();

    for source in &feed_list.feeds {
        if source.url.is_empty() {
            tracing::warn!(feed = %source.name, "Skipping feed: no URL provided");
            continue;
        }

        tracing::info!(feed = %source.name, "Fetching feed");
        match fetcher.fetch(&source.url, since).await {
            Ok(articles) => {
                tracing::info!(feed = %source.name, articles = articles.len(), "Found new articles");
                let result = FeedResult::new(source.url.clone(), articles);
                if feeds.insert(source.name.clone(), result).is_some() {
                    tracing::warn!(
                        feed = %source.name,
                        "Duplicate feed name, keeping the later feed's articles"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(feed = %source.name, url = %source.url, error = %e, "Failed to fetch feed");
                failed_feeds.push(FailedFeed {
                    name: source.name.clone(),
                    url: source.url.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    CollectionReport::new(
        Metadata {
            collected_at: now,
            since,
            hours,
        },
        feeds,
        failed_feeds,
        feed_list.feeds.len(),
    )
}

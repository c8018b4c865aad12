use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

use crate::config::Settings;
use crate::feed::filter::filter_entries;
use crate::feed::parser::parse_feed;
use crate::report::Article;
use crate::util::validate_url;

/// Errors that end a single feed's fetch.
///
/// Every variant is terminal for that feed in that run; there are no
/// retries. The `Display` text is what lands in the report's failed-feed
/// list and on the rendered pages.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// DNS, connection, TLS or body transfer failure
    #[error("Connection error: {0}")]
    Connection(String),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Body could not be parsed as RSS, Atom or JSON Feed
    #[error("Feed parsing error: {0}")]
    FeedFormat(String),
    /// Anything else (invalid URL, oversized body, client setup)
    #[error("{0}")]
    Unknown(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = e.status() {
            FetchError::HttpStatus(status.as_u16())
        } else if e.is_connect() || e.is_request() || e.is_body() || e.is_decode() {
            FetchError::Connection(error_chain(&e))
        } else {
            FetchError::Unknown(error_chain(&e))
        }
    }
}

/// The error message followed by each of its sources, `: `-separated.
fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Fetches one feed URL and returns the articles inside the date window.
///
/// Holds a configured HTTP client (user agent, timeout) and the body size
/// limit. One request per call, no retries.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
}

impl FeedFetcher {
    /// Builds a fetcher with a client configured from `settings`.
    pub fn new(settings: &Settings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout())
            .build()?;
        Ok(Self::with_client(
            client,
            settings.timeout(),
            settings.max_feed_bytes,
        ))
    }

    /// Uses an existing client. `timeout` bounds the whole request including
    /// the body transfer.
    pub fn with_client(client: reqwest::Client, timeout: Duration, max_bytes: usize) -> Self {
        Self {
            client,
            timeout,
            max_bytes,
        }
    }

    /// Fetches `url`, parses it and keeps entries newer than `cutoff`.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Unknown`] - URL is not http(s) or the body exceeds the size limit
    /// - [`FetchError::Timeout`] - request exceeded the timeout
    /// - [`FetchError::Connection`] - DNS, connect, TLS or transfer failure
    /// - [`FetchError::HttpStatus`] - non-2xx HTTP response
    /// - [`FetchError::FeedFormat`] - body is not a parseable feed
    pub async fn fetch(
        &self,
        url: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Article>, FetchError> {
        let url = validate_url(url).map_err(|e| FetchError::Unknown(e.to_string()))?;

        let bytes = tokio::time::timeout(self.timeout, self.fetch_bytes(url))
            .await
            .map_err(|_| FetchError::Timeout)??;

        let entries = parse_feed(&bytes).map_err(|e| FetchError::FeedFormat(e.to_string()))?;
        let total = entries.len();
        let articles = filter_entries(entries, cutoff);

        tracing::debug!(
            entries = total,
            kept = articles.len(),
            "Parsed feed"
        );
        Ok(articles)
    }

    async fn fetch_bytes(&self, url: url::Url) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url.as_str()).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, self.max_bytes).await
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let too_large = || FetchError::Unknown(format!("Response too large (limit {} bytes)", limit));

    let expected_length = response.content_length();
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(too_large());
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(too_large());
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::Connection(format!(
                "Incomplete response: expected {} bytes, received {}",
                expected,
                bytes.len()
            )));
        }
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Published;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rss_with_items(items: &[(&str, Option<DateTime<Utc>>)]) -> String {
        let mut body = String::from(
            r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Test</title>"#,
        );
        for (title, date) in items {
            body.push_str("<item>");
            body.push_str(&format!("<title>{}</title>", title));
            body.push_str(&format!("<link>https://example.com/{}</link>", title));
            if let Some(date) = date {
                body.push_str(&format!("<pubDate>{}</pubDate>", date.to_rfc2822()));
            }
            body.push_str("</item>");
        }
        body.push_str("</channel></rss>");
        body
    }

    fn test_fetcher(timeout: Duration) -> FeedFetcher {
        let client = reqwest::Client::builder()
            .user_agent("feedhub-test/1.0")
            .build()
            .unwrap();
        FeedFetcher::with_client(client, timeout, 1024 * 1024)
    }

    async fn serve(template: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(template)
            .mount(&mock_server)
            .await;
        mock_server
    }

    #[tokio::test]
    async fn test_fetch_filters_by_cutoff() {
        let now = Utc::now();
        let body = rss_with_items(&[
            ("recent", Some(now - chrono::Duration::hours(2))),
            ("ancient", Some(now - chrono::Duration::days(90))),
            ("undated", None),
        ]);
        let server = serve(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("Content-Type", "application/rss+xml"),
        )
        .await;

        let cutoff = now - chrono::Duration::hours(720);
        let articles = test_fetcher(Duration::from_secs(5))
            .fetch(&format!("{}/feed", server.uri()), cutoff)
            .await
            .unwrap();

        let titles: Vec<_> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["recent", "undated"]);
        assert!(matches!(articles[0].published, Published::At { .. }));
        assert_eq!(articles[1].published, Published::Unknown);
        assert_eq!(articles[0].link, "https://example.com/recent");
    }

    #[tokio::test]
    async fn test_fetch_sends_user_agent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("User-Agent", "Mozilla/5.0 RSS-Feed-Collector/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(rss_with_items(&[])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetcher = FeedFetcher::new(&Settings::default()).unwrap();
        let result = fetcher
            .fetch(&format!("{}/feed", mock_server.uri()), Utc::now())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_404_error() {
        let server = serve(ResponseTemplate::new(404)).await;

        let result = test_fetcher(Duration::from_secs(5))
            .fetch(&format!("{}/feed", server.uri()), Utc::now())
            .await;
        match result {
            Err(FetchError::HttpStatus(404)) => {}
            other => panic!("Expected HttpStatus(404), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_500_is_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = test_fetcher(Duration::from_secs(5))
            .fetch(&format!("{}/feed", mock_server.uri()), Utc::now())
            .await;
        assert!(matches!(result, Err(FetchError::HttpStatus(500))));
    }

    #[tokio::test]
    async fn test_malformed_feed_parse_error() {
        let server = serve(ResponseTemplate::new(200).set_body_string("<not valid xml")).await;

        let result = test_fetcher(Duration::from_secs(5))
            .fetch(&format!("{}/feed", server.uri()), Utc::now())
            .await;
        match result {
            Err(FetchError::FeedFormat(_)) => {}
            other => panic!("Expected FeedFormat error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_partially_malformed_feed_succeeds() {
        let mut body = rss_with_items(&[("first", None), ("second", None)]);
        // Cut the closing tags and append an unterminated item
        body.truncate(body.len() - "</channel></rss>".len());
        body.push_str("<item><title>third</title><link>https://exa");
        let server = serve(ResponseTemplate::new(200).set_body_string(body)).await;

        let articles = test_fetcher(Duration::from_secs(5))
            .fetch(&format!("{}/feed", server.uri()), Utc::now())
            .await
            .unwrap();
        let titles: Vec<_> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_empty_feed_success() {
        let empty_rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel></channel></rss>"#;
        let server = serve(ResponseTemplate::new(200).set_body_string(empty_rss)).await;

        let articles = test_fetcher(Duration::from_secs(5))
            .fetch(&format!("{}/feed", server.uri()), Utc::now())
            .await
            .unwrap();
        assert!(articles.is_empty());
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let server = serve(
            ResponseTemplate::new(200)
                .set_body_string(rss_with_items(&[]))
                .set_delay(Duration::from_secs(3)),
        )
        .await;

        let result = test_fetcher(Duration::from_millis(200))
            .fetch(&format!("{}/feed", server.uri()), Utc::now())
            .await;
        assert!(matches!(result, Err(FetchError::Timeout)));
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let server = serve(ResponseTemplate::new(200).set_body_string("x".repeat(2048))).await;

        let client = reqwest::Client::new();
        let fetcher = FeedFetcher::with_client(client, Duration::from_secs(5), 1024);
        let result = fetcher
            .fetch(&format!("{}/feed", server.uri()), Utc::now())
            .await;
        match result {
            Err(FetchError::Unknown(msg)) => assert!(msg.contains("too large")),
            other => panic!("Expected Unknown(too large), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_without_request() {
        let result = test_fetcher(Duration::from_secs(5))
            .fetch("ftp://example.com/feed", Utc::now())
            .await;
        match result {
            Err(FetchError::Unknown(msg)) => assert!(msg.contains("Unsupported scheme")),
            other => panic!("Expected Unknown(Unsupported scheme), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Bind then drop a listener so the port is known to be closed
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let result = test_fetcher(Duration::from_secs(5))
            .fetch(&format!("http://127.0.0.1:{}/feed", port), Utc::now())
            .await;
        assert!(
            matches!(result, Err(FetchError::Connection(_))),
            "Expected Connection error, got {:?}",
            result
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(FetchError::HttpStatus(403).to_string(), "HTTP error: status 403");
        assert_eq!(FetchError::Timeout.to_string(), "Request timed out");
        assert_eq!(
            FetchError::FeedFormat("bad".into()).to_string(),
            "Feed parsing error: bad"
        );
    }
}

//! Configuration inputs.
//!
//! Two files drive a run:
//!
//! - the **feed list** (JSON, required for `collect`): `{"feeds": [{"name", "url"}]}`
//! - the **settings** file (TOML, optional): site title, base URL and HTTP
//!   knobs. A missing file yields `Settings::default()`.
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file {0} not found")]
    NotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in settings file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Settings file exceeds maximum allowed size.
    #[error("Settings file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Feed List
// ============================================================================

/// One configured feed. Both fields are optional in the file and may be
/// `null`: a missing name becomes `"Unknown"`, a missing URL makes the
/// collector skip it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedSource {
    #[serde(default = "default_feed_name", deserialize_with = "nullable_name")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable_url")]
    pub url: String,
}

fn default_feed_name() -> String {
    "Unknown".to_string()
}

fn nullable_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_feed_name))
}

fn nullable_url<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FeedList {
    #[serde(default)]
    pub feeds: Vec<FeedSource>,
}

impl FeedList {
    /// Load the feed list from a JSON file. Missing or malformed files are
    /// configuration errors; the caller aborts the run.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Io(e)
            }
        })?;

        let list: FeedList = serde_json::from_str(&content).map_err(|e| ConfigError::Json {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), feeds = list.feeds.len(), "Loaded feed list");
        Ok(list)
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Site and HTTP settings.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Site name used in page titles, the Markdown header and RSS channels.
    pub site_title: String,

    /// Public URL the site is served from; RSS channel links hang off it.
    pub base_url: String,

    /// Description of the master RSS channel.
    pub site_description: String,

    /// User-Agent sent with every feed request.
    pub user_agent: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Largest feed body accepted, in bytes.
    pub max_feed_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            site_title: "DevOps Feed Hub".to_string(),
            base_url: "https://example.github.io/feed-hub".to_string(),
            site_description: "Aggregated DevOps, cloud, and technology news from multiple sources"
                .to_string(),
            user_agent: "Mozilla/5.0 RSS-Feed-Collector/1.0".to_string(),
            timeout_secs: 30,
            max_feed_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Settings {
    /// Maximum settings file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 6] = [
        "site_title",
        "base_url",
        "site_description",
        "user_agent",
        "timeout_secs",
        "max_feed_bytes",
    ];

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Load settings from a TOML file.
    ///
    /// - Missing file → `Ok(Settings::default())`
    /// - Empty file → `Ok(Settings::default())`
    /// - Invalid TOML → `Err(ConfigError::Toml)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Settings file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Settings file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in settings file, ignoring");
                }
            }
        }

        let settings: Settings = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), site = %settings.site_title, "Loaded settings");
        Ok(settings)
    }
}

// ============================================================================
// Tests
// ============================================================================

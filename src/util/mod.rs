//! Utility functions for common operations.
//!
//! This module provides reusable utilities for:
//!
//! - **Slugs**: URL-safe identifiers for per-feed page and feed file names
//! - **Text processing**: character-based truncation and XML-safe cleanup
//! - **URL validation**: scheme checks for configured feed URLs
//! - **File output**: atomic writes for every generated artifact
//!
//! # Examples
//!
//! ```
//! use feedhub::util::{slugify, truncate_chars, validate_url};
//!
//! assert_eq!(slugify("GitHub Blog"), "github-blog");
//! assert_eq!(truncate_chars("Long article title", 4), "Long...");
//! assert!(validate_url("https://example.com/feed.xml").is_ok());
//! ```

mod fs;
mod slug;
mod text;
mod url_validator;

pub use fs::atomic_write;
pub use slug::slugify;
pub use text::{strip_control_chars, truncate_chars};
pub use url_validator::{validate_url, UrlValidationError};

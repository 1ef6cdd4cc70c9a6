//! Feed error types
//!
//! These never reach callers of the catalog lookups. The catalog logs them
//! and treats the failing repository as having contributed nothing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading a repository feed
#[derive(Error, Debug)]
pub enum FeedError {
    /// The feed file could not be read
    #[error("Failed to read feed {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The feed document is not a valid package index
    #[error("Failed to parse feed from {origin}")]
    Parse {
        origin: String,
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// The request never produced a response
    #[cfg(feature = "remote")]
    #[error("Failed to fetch feed from {url}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("Failed to fetch feed: HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// The repository URL scheme has no feed implementation
    #[error("Unsupported repository URL: {0}")]
    UnsupportedUrl(String),

    /// Remote feeds were compiled out
    #[error("Remote feeds are not enabled. Rebuild with --features remote")]
    FeatureDisabled,
}

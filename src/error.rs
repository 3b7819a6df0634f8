//! Error taxonomy for the dashboard build.
//!
//! Every variant is fatal for the run. Per-cell numeric problems in the
//! CSV never surface here; the aggregator records them as null values.

use std::path::PathBuf;
use thiserror::Error;

/// Maximum number of characters of an unexpected response kept for diagnostics.
pub const RESPONSE_DUMP_LIMIT: usize = 500;

/// Any failure that aborts a dashboard build.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Missing or invalid run configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network or HTTP failure while fetching.
    #[error("failed to fetch {url}: {reason}")]
    Transport { url: String, reason: String },

    /// The metadata document did not have the expected shape.
    #[error("could not resolve download URL: {reason}\nResponse: {dump}")]
    Resolution { reason: String, dump: String },

    /// The CSV could not be interpreted.
    #[error("malformed CSV: {0}")]
    Format(String),

    /// The template has no injection region.
    #[error("template error: {0}")]
    Template(String),

    /// Reading the template or writing the output failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Build a resolution error, keeping only the head of the offending response.
    pub fn resolution(reason: impl Into<String>, body: &str) -> Self {
        BuildError::Resolution {
            reason: reason.into(),
            dump: truncate_chars(body, RESPONSE_DUMP_LIMIT),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Truncate to at most `limit` characters, marking the cut with an ellipsis.
pub fn truncate_chars(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

//! Error types for mrfscan.
//!
//! Library crates use [`MrfScanError`] via `thiserror`.
//! The cli app wraps this with `color-eyre` for rich diagnostics.
//!
//! Only [`MrfScanError::Transport`] and [`MrfScanError::Decompress`] are
//! fatal to a scan; malformed records and failed lookups are recorded and
//! skipped so the rest of the stream keeps flowing.

use std::path::PathBuf;

/// Top-level error type for all mrfscan operations.
#[derive(Debug, thiserror::Error)]
pub enum MrfScanError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Index source unreachable or non-success status before streaming began. Fatal.
    #[error("transport error: {0}")]
    Transport(String),

    /// Corrupt or truncated compressed stream. Fatal.
    #[error("decompression error: {0}")]
    Decompress(String),

    /// A single index line that failed to parse. Local: log and skip.
    #[error("malformed record: {message}")]
    MalformedRecord { message: String },

    /// A per-identifier lookup failure. Local: bounded retry, then log and skip.
    #[error("lookup error: {0}")]
    Lookup(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MrfScanError>;

impl MrfScanError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a malformed-record error from any displayable message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error aborts the whole pipeline (vs. skip-and-log).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Decompress(_))
    }
}

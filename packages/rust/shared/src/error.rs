//! Error types for specmill.
//!
//! Library crates use [`SpecmillError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Most processing problems are deliberately NOT errors: unresolved
//! references, missing include files and malformed interface blocks all
//! degrade to pipeline warnings. The error type covers the remaining
//! hard failures — misconfiguration, I/O, and resolver transport.

use std::path::PathBuf;

/// Top-level error type for all specmill operations.
#[derive(Debug, thiserror::Error)]
pub enum SpecmillError {
    /// Caller misconfiguration (e.g. an unregistered content format).
    #[error("config error: {message}")]
    Config { message: String },

    /// Markup or embedded-grammar parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// External cross-reference resolver transport failure.
    #[error("resolver error: {0}")]
    Resolver(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad snapshot, invalid option value, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SpecmillError>;

impl SpecmillError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
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
}

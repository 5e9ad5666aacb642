//! Error types for docprep.
//!
//! Library crates use [`DocPrepError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all docprep operations.
#[derive(Debug, thiserror::Error)]
pub enum DocPrepError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A required input file or directory does not exist.
    #[error("input not found: {path:?}")]
    MissingInput { path: PathBuf },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Record serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Data validation error (bad heading levels, empty extension set, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocPrepError>;

impl DocPrepError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a missing-input error for a path.
    pub fn missing_input(path: impl Into<PathBuf>) -> Self {
        Self::MissingInput { path: path.into() }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for DocPrepError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = DocPrepError::config("unknown key");
        assert_eq!(err.to_string(), "config error: unknown key");

        let err = DocPrepError::validation("heading_levels must be between 1 and 6");
        assert!(err.to_string().contains("between 1 and 6"));

        let err = DocPrepError::missing_input("data/api-docs.md");
        assert!(err.to_string().contains("api-docs.md"));
    }

    #[test]
    fn io_error_keeps_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = DocPrepError::io("docs/intro.mdx", source);
        let msg = err.to_string();
        assert!(msg.contains("docs/intro.mdx"));
        assert!(msg.contains("gone"));
    }
}

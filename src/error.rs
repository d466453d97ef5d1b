//! Centralized error types for emlgrab.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the emlgrab library.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified input file does not exist.
    #[error("EML file not found: {0}")]
    FileNotFound(PathBuf),

    /// The input bytes could not be parsed as an email message.
    #[error("not a parseable email message: {0}")]
    MalformedMessage(PathBuf),
}

/// Convenience alias for `Result<T, ExtractError>`.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Helper to convert a bare `std::io::Error` together with a path.
impl ExtractError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `ExtractError`
/// when no path context is available. Prefer `ExtractError::io` otherwise.
impl From<std::io::Error> for ExtractError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}

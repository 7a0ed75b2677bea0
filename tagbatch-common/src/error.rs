//! Common error types for tagbatch

use thiserror::Error;

/// Common result type for tagbatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across tagbatch crates
///
/// Only configuration and input problems halt a run. Failures of a single
/// file never surface here; they become that file's outcome.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input (missing directory, missing record store, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Data source could not be loaded or parsed
    #[error("Load error: {0}")]
    Load(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for errors the caller can fix by changing settings or input
    pub fn is_user_error(&self) -> bool {
        matches!(self, Error::Config(_) | Error::InvalidInput(_) | Error::Load(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_error_classification() {
        assert!(Error::Config("bad".into()).is_user_error());
        assert!(Error::InvalidInput("bad".into()).is_user_error());
        assert!(Error::Load("bad".into()).is_user_error());
        assert!(!Error::Internal("bad".into()).is_user_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(err.to_string().starts_with("IO error"));
    }
}

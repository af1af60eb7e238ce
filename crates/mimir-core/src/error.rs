use core::result::Result as CoreResult;
use std::io::Error as IoError;

use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use toml::de::Error as TomlError;
use toml::ser::Error as TomlSerializeError;

/// Result type for Mimir operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors that can occur across the Mimir crates.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] SerdeJsonError),

    /// TOML deserialization failed.
    #[error("TOML deserialization error: {0}")]
    Toml(#[from] TomlError),

    /// TOML serialization failed.
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] TomlSerializeError),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The embedding backend failed to produce a vector.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// An operation did not finish within its deadline.
    #[error("Timed out after {0}s")]
    Timeout(u64),

    /// A cache storage backend rejected a write.
    ///
    /// The in-memory engine never produces this; it exists for backends that
    /// live outside the process.
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// A general error not covered by other variants.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Determines whether this error may succeed if retried.
    ///
    /// Returns `true` for transient failures of the embedding backend.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Embedding(_) | Self::Timeout(_))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Test code is allowed to use unwrap and has different conventions"
)]
mod tests {
    use super::*;
    use serde_json::{Value as JsonValue, from_str};
    use std::io;

    #[test]
    fn test_error_display() {
        let config_error = Error::Config("threshold out of range".to_owned());
        assert_eq!(
            config_error.to_string(),
            "Configuration error: threshold out of range"
        );

        let embedding_error = Error::Embedding("model not found".to_owned());
        assert_eq!(embedding_error.to_string(), "Embedding error: model not found");

        assert_eq!(Error::Timeout(30).to_string(), "Timed out after 30s");
    }

    #[test]
    fn test_error_is_retryable() {
        assert!(Error::Embedding("connection refused".to_owned()).is_retryable());
        assert!(Error::Timeout(5).is_retryable());

        assert!(!Error::Config("bad config".to_owned()).is_retryable());
        assert!(!Error::Backend("read only".to_owned()).is_retryable());
        assert!(!Error::Other("failed".to_owned()).is_retryable());
    }

    #[test]
    fn test_error_from_io() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_error = from_str::<JsonValue>("invalid json").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }
}

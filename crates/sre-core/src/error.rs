use core::result::Result as CoreResult;
use std::io::Error as IoError;

use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use toml::de::Error as TomlError;
use toml::ser::Error as TomlSerError;

/// Result type for core operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors that can occur while answering a question.
#[derive(Debug, Error)]
pub enum Error {
    /// The embedding provider failed or returned an unusable response.
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// A query vector does not match the dimensionality of the index.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension configured for the similarity store.
        expected: usize,
        /// Length of the vector that was supplied.
        actual: usize,
    },

    /// The similarity store failed to answer a query.
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    /// The completion provider failed or returned an unusable response.
    #[error("Completion failed: {0}")]
    Completion(String),

    /// The question was empty or contained only whitespace.
    #[error("Question must not be empty")]
    EmptyQuestion,

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required API key was not found.
    #[error("API key not found: {0}")]
    MissingApiKey(String),

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
    TomlSer(#[from] TomlSerError),
}

impl Error {
    /// Short variant name for log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Embedding(_) => "embedding",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::Retrieval(_) => "retrieval",
            Self::Completion(_) => "completion",
            Self::EmptyQuestion => "empty_question",
            Self::Config(_) => "config",
            Self::MissingApiKey(_) => "missing_api_key",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Toml(_) | Self::TomlSer(_) => "toml",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value as JsonValue, from_str};
    use std::io;

    #[test]
    fn test_error_display() {
        let error1 = Error::Config("invalid config".to_owned());
        assert_eq!(error1.to_string(), "Configuration error: invalid config");

        let error2 = Error::DimensionMismatch {
            expected: 1536,
            actual: 3,
        };
        assert_eq!(
            error2.to_string(),
            "Embedding dimension mismatch: expected 1536, got 3"
        );

        let error3 = Error::MissingApiKey("OPENAI_API_KEY".to_owned());
        assert_eq!(error3.to_string(), "API key not found: OPENAI_API_KEY");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(Error::Retrieval("connection reset".to_owned()).kind(), "retrieval");
        assert_eq!(
            Error::DimensionMismatch {
                expected: 4,
                actual: 2
            }
            .kind(),
            "dimension_mismatch"
        );
        assert_eq!(Error::MissingApiKey("PINECONE_API_KEY".to_owned()).kind(), "missing_api_key");
        assert_eq!(Error::EmptyQuestion.kind(), "empty_question");
    }

    #[test]
    fn test_error_from_io() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let Err(json_error) = from_str::<JsonValue>("invalid json") else {
            panic!("invalid json parsed");
        };
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }
}

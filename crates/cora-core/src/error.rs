//! Error types for CORA

use std::path::Path;

use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the CORA pipeline
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Configuration error: embedding dimension mismatch (expected {expected}, got {actual})")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    #[error("Transient provider error ({provider}): {message}")]
    Transient { provider: String, message: String },

    #[error("Ingestion error ({path}): {message}")]
    Ingestion { path: String, message: String },

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an ingestion error for the given file
    pub fn ingestion(path: &Path, message: impl Into<String>) -> Self {
        Error::Ingestion {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    /// Build a final provider error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Build a retryable provider error
    pub fn transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Transient {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP status returned by a provider API
    ///
    /// 401/403 are credential problems, 404 means the endpoint, deployment or
    /// model does not exist, 408/429/5xx may succeed on retry.
    pub fn from_http_status(provider: &str, status: u16, detail: &str) -> Self {
        let message = format!("API returned {}: {}", status, detail);
        match status {
            401 | 403 => Error::Authentication(format!("{}: {}", provider, message)),
            404 => Error::Configuration(format!("{}: {}", provider, message)),
            408 | 429 | 500..=599 => Error::transient(provider, message),
            _ => Error::provider(provider, message),
        }
    }

    /// Configuration-class errors end the process; they are never retried
    /// and never isolated per file or per question.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_) | Error::DimensionMismatch { .. } | Error::Authentication(_)
        )
    }

    /// Whether another attempt at the same remote call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

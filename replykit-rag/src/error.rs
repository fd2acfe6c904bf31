//! Error types for the `replykit-rag` crate.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// The provider call a [`RagError::Timeout`] was raised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Computing the embedding of the input text.
    Embedding,
    /// Completing the chat request.
    Generation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Embedding => f.write_str("embedding"),
            Stage::Generation => f.write_str("generation"),
        }
    }
}

/// Errors that can occur while answering a message.
#[derive(Debug, Error)]
pub enum RagError {
    /// The caller supplied an empty or malformed message.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A vector's length does not match the index dimensionality.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimensionality the index was created with.
        expected: usize,
        /// The length of the offending vector.
        actual: usize,
    },

    /// A document violates the index contract.
    #[error("Invalid document '{id}': {reason}")]
    InvalidDocument {
        /// The ID of the rejected document.
        id: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The index holds no documents to ground a reply on.
    #[error("No grounding available: the index is empty")]
    NoResultsAvailable,

    /// The embedding provider failed.
    #[error("Embedding provider error ({provider}): {message}")]
    EmbeddingProviderError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The generation provider failed.
    #[error("Generation provider error ({provider}): {message}")]
    GenerationProviderError {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A provider call did not finish within its time limit.
    #[error("{stage} timed out after {limit:?}")]
    Timeout {
        /// The call that timed out.
        stage: Stage,
        /// The limit that was exceeded.
        limit: Duration,
    },

    /// Reading or writing the persisted index failed.
    #[error("Storage error ({}): {message}", path.display())]
    StorageError {
        /// The file or directory involved.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// A stable, machine-readable classification of a [`RagError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    DimensionMismatch,
    InvalidDocument,
    NoResultsAvailable,
    EmbeddingProviderError,
    GenerationProviderError,
    Timeout,
    StorageError,
    ConfigError,
}

impl ErrorKind {
    /// The snake_case name used in logs and HTTP error bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::DimensionMismatch => "dimension_mismatch",
            ErrorKind::InvalidDocument => "invalid_document",
            ErrorKind::NoResultsAvailable => "no_results_available",
            ErrorKind::EmbeddingProviderError => "embedding_provider_error",
            ErrorKind::GenerationProviderError => "generation_provider_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::StorageError => "storage_error",
            ErrorKind::ConfigError => "config_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RagError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RagError::InvalidInput(_) => ErrorKind::InvalidInput,
            RagError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            RagError::InvalidDocument { .. } => ErrorKind::InvalidDocument,
            RagError::NoResultsAvailable => ErrorKind::NoResultsAvailable,
            RagError::EmbeddingProviderError { .. } => ErrorKind::EmbeddingProviderError,
            RagError::GenerationProviderError { .. } => ErrorKind::GenerationProviderError,
            RagError::Timeout { .. } => ErrorKind::Timeout,
            RagError::StorageError { .. } => ErrorKind::StorageError,
            RagError::ConfigError(_) => ErrorKind::ConfigError,
        }
    }

    /// Whether a caller may reasonably retry the same request.
    ///
    /// Only external dependency failures qualify. Nothing in this crate
    /// retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RagError::EmbeddingProviderError { .. }
                | RagError::GenerationProviderError { .. }
                | RagError::Timeout { .. }
        )
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, err: impl fmt::Display) -> Self {
        RagError::StorageError { path: path.into(), message: err.to_string() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_provider_failures_are_retryable() {
        let retryable = [
            RagError::EmbeddingProviderError { provider: "p".into(), message: "m".into() },
            RagError::GenerationProviderError { provider: "p".into(), message: "m".into() },
            RagError::Timeout { stage: Stage::Generation, limit: Duration::from_secs(1) },
        ];
        for err in &retryable {
            assert!(err.is_retryable(), "{err} should be retryable");
        }

        let fatal = [
            RagError::InvalidInput("empty".into()),
            RagError::DimensionMismatch { expected: 3, actual: 2 },
            RagError::NoResultsAvailable,
            RagError::ConfigError("bad".into()),
        ];
        for err in &fatal {
            assert!(!err.is_retryable(), "{err} should not be retryable");
        }
    }

    #[test]
    fn timeout_message_names_the_stage() {
        let err = RagError::Timeout { stage: Stage::Embedding, limit: Duration::from_millis(250) };
        assert_eq!(err.kind().as_str(), "timeout");
        assert!(err.to_string().starts_with("embedding timed out"));
    }
}

//! Error types for verirag.
//!
//! A single error enum covers configuration, I/O, the three capability
//! backends (completion, embedding, vector index), prompt rendering and
//! workflow control.

use thiserror::Error;

/// Unified error type for verirag.
///
/// All fallible functions return `Result<T, AppError>`. The workflow steps
/// recover backend errors locally; only configuration, I/O and explicit
/// cancellation reach the caller.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Completion backend errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding backend errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector index errors
    #[error("Index error: {0}")]
    Index(String),

    /// A backend call exceeded its deadline
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A backend answered, but not in the expected shape
    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The caller cancelled a workflow run
    #[error("Workflow cancelled")]
    Cancelled,

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether the error means a backend could not be reached or did not
    /// answer in time.
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(
            self,
            AppError::Llm(_) | AppError::Embedding(_) | AppError::Index(_) | AppError::Timeout(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

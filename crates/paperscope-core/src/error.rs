//! Error types for paperscope.

use thiserror::Error;

/// Result type alias using paperscope's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for paperscope operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Document source unavailable or returned an error status
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Document could not be opened or paginated
    #[error("Document error: {0}")]
    Document(String),

    /// Vision-language model call failed
    #[error("Vision error: {0}")]
    Vision(String),

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Inference/generation failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Language model produced no usable search intent
    #[error("Intent extraction failed: {0}")]
    IntentExtraction(String),

    /// Language model produced no hypothetical document
    #[error("HyDE generation failed: {0}")]
    HydeGeneration(String),

    /// Vector index unavailable or rejected the query
    #[error("Index error: {0}")]
    Index(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Operation exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable snake_case name of the variant, used in API error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Database(_) => "database",
            Error::NotFound(_) => "not_found",
            Error::Fetch(_) => "fetch",
            Error::Document(_) => "document",
            Error::Vision(_) => "vision",
            Error::Embedding(_) => "embedding",
            Error::Inference(_) => "inference",
            Error::IntentExtraction(_) => "intent_extraction",
            Error::HydeGeneration(_) => "hyde_generation",
            Error::Index(_) => "index",
            Error::Serialization(_) => "serialization",
            Error::Config(_) => "config",
            Error::InvalidInput(_) => "invalid_input",
            Error::Request(_) => "request",
            Error::Timeout(_) => "timeout",
            Error::Internal(_) => "internal",
            Error::Io(_) => "io",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else {
            Error::Request(e.to_string())
        }
    }
}

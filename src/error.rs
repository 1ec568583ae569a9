use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    /// Transient connectivity failure, safe to retry
    #[error("Network error: {0}")]
    Network(String),

    /// The remote rejected the request, `message` is user-displayable
    #[error("Server error: {message}")]
    Server { message: String },

    #[error("Not Found")]
    NotFound,

    /// A pagination request is already in flight. Not a failure.
    #[error("Request already in flight")]
    ReentrancyRejected,

    /// The owning screen was closed before the result arrived
    #[error("Cancelled")]
    Cancelled,

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Index {index} out of range for feed of length {len}")]
    InvalidIndex { index: usize, len: usize },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Payload-free classification of a [`FeedError`], cheap to broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Server,
    NotFound,
    ReentrancyRejected,
    Cancelled,
    Unsupported,
    InvalidIndex,
    Storage,
    Decode,
}

impl FeedError {
    pub fn server(message: impl Into<String>) -> Self {
        FeedError::Server {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FeedError::Network(_) => ErrorKind::Network,
            FeedError::Server { .. } => ErrorKind::Server,
            FeedError::NotFound => ErrorKind::NotFound,
            FeedError::ReentrancyRejected => ErrorKind::ReentrancyRejected,
            FeedError::Cancelled => ErrorKind::Cancelled,
            FeedError::Unsupported(_) => ErrorKind::Unsupported,
            FeedError::InvalidIndex { .. } => ErrorKind::InvalidIndex,
            FeedError::Storage(_) => ErrorKind::Storage,
            FeedError::Decode(_) => ErrorKind::Decode,
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FeedError::Network(_) | FeedError::ReentrancyRejected | FeedError::Cancelled
        )
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FeedError::Decode(err.to_string())
        } else if err.status().map(|s| s.as_u16()) == Some(404) {
            FeedError::NotFound
        } else {
            FeedError::Network(err.to_string())
        }
    }
}

impl From<sqlx::Error> for FeedError {
    fn from(err: sqlx::Error) -> Self {
        FeedError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;

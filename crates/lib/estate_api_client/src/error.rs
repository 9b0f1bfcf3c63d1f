//! Client error types.

use reqwest::StatusCode;
use thiserror::Error;

/// Why a session refresh failed. Cloned to every caller waiting on the
/// same refresh.
#[derive(Debug, Clone, Error)]
pub enum RefreshFailure {
    #[error("refresh rejected ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("refresh request failed: {0}")]
    Transport(String),
}

/// Errors returned by [`crate::ApiClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error ({status}): {message}")]
    Status { status: StatusCode, message: String },

    #[error("Session expired: {0}")]
    SessionExpired(RefreshFailure),
}

impl ClientError {
    /// HTTP status of an API error response, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::SessionExpired(RefreshFailure::Rejected { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

//! Authentication and session logic.
//!
//! Provides password hashing, JWT management, and refresh-token hashing
//! shared by `estate_api` and the storage backends.

pub mod jwt;
pub mod password;
pub mod refresh_tokens;

use thiserror::Error;

use crate::store::StoreError;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Refresh token required")]
    RefreshRequired,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Refresh token expired, please log in again")]
    RefreshExpired,

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

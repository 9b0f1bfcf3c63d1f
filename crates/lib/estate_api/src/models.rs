//! API request and response bodies.

use estate_core::models::account::Account;
use estate_core::models::listing::Listing;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `GET /` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Missing fields deserialize as empty so the handler can answer 400 itself.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// `{user}` body of login and `/users/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: Account,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Envelope used by the `/users` collection routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateUserRequest {
    #[validate(length(min = 2, max = 50, message = "Username must be between 2 and 50 characters"))]
    pub user_name: String,
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    /// A URL or any other non-empty reference, such as an asset key.
    #[validate(length(min = 1, message = "Image cannot be empty"))]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRequest {
    #[validate(length(min = 2, max = 50, message = "Username must be between 2 and 50 characters"))]
    pub user_name: Option<String>,
    #[validate(email(message = "Please enter a valid email"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
    #[validate(length(min = 1, message = "Image cannot be empty"))]
    pub image: Option<String>,
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateListingRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(range(min = 0.0, message = "Price must be positive"))]
    pub price: f64,
    #[validate(url(message = "Invalid image URL"))]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateListingRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: Option<String>,
    #[validate(range(min = 0.0, message = "Price must be positive"))]
    pub price: Option<f64>,
    #[validate(url(message = "Invalid image URL"))]
    pub image: Option<String>,
}

/// `{message, listing}` body of listing mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingResponse {
    pub message: String,
    pub listing: Listing,
}

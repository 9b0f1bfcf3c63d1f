//! # estate_api_client
//!
//! HTTP client for the Estate API. Keeps the session cookies in its own jar
//! and transparently refreshes an expired access token.

pub mod client;
pub mod error;
pub mod refresh;

pub use client::{ApiClient, ListingDraft, NewUser, UserChanges};
pub use error::{ClientError, ClientResult, RefreshFailure};

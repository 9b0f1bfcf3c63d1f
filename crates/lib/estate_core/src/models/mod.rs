//! Domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! bodies in `estate_api::models`.

pub mod account;
pub mod auth;
pub mod listing;

//! Business logic invoked by the handlers.

pub mod auth;
pub mod cookies;
pub mod listings;
pub mod users;

//! # estate_core
//!
//! Core domain logic for Estate: accounts, listings, and the session
//! primitives (JWTs, bcrypt hashing, refresh-token records) shared by the
//! API server and its storage backends.

pub mod auth;
pub mod migrate;
pub mod models;
pub mod store;

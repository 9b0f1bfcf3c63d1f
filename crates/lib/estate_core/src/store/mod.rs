//! Storage abstraction for accounts, listings and refresh-token records.
//!
//! [`PgStore`] backs production; [`MemoryStore`] has the same semantics
//! (unique emails, cascading revocation on account delete) and backs tests
//! and database-less development runs.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::account::{Account, AccountUpdate, AccountWithPassword, NewAccount};
use crate::models::auth::RefreshTokenRecord;
use crate::models::listing::{Listing, ListingUpdate, NewListing};

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

const DUPLICATE_EMAIL: &str = "Email already registered";

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert an account. Fails with [`StoreError::Conflict`] on a taken email.
    async fn create_account(&self, new: NewAccount) -> StoreResult<Account>;

    /// Fetch an account and its password hash by (already normalized) email.
    async fn find_account_by_email(&self, email: &str)
    -> StoreResult<Option<AccountWithPassword>>;

    async fn get_account(&self, id: Uuid) -> StoreResult<Option<Account>>;

    async fn list_accounts(&self) -> StoreResult<Vec<Account>>;

    /// Apply a partial update, returning the updated account if it exists.
    async fn update_account(&self, id: Uuid, update: AccountUpdate)
    -> StoreResult<Option<Account>>;

    /// Delete an account and every refresh token it owns.
    async fn delete_account(&self, id: Uuid) -> StoreResult<Option<Account>>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn store_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<RefreshTokenRecord>;

    /// All records owned by an account, expired ones included.
    async fn refresh_tokens_for_account(&self, user_id: Uuid)
    -> StoreResult<Vec<RefreshTokenRecord>>;

    /// Delete one record. Returns whether it existed.
    async fn delete_refresh_token(&self, id: Uuid) -> StoreResult<bool>;

    /// Delete every record of an account, returning how many were removed.
    async fn delete_refresh_tokens_for_account(&self, user_id: Uuid) -> StoreResult<u64>;

    /// Delete an account's records with `expires_at <= now`.
    async fn delete_expired_refresh_tokens(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<u64>;
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn create_listing(&self, new: NewListing) -> StoreResult<Listing>;

    async fn get_listing(&self, id: Uuid) -> StoreResult<Option<Listing>>;

    /// All listings, newest first.
    async fn list_listings(&self) -> StoreResult<Vec<Listing>>;

    async fn update_listing(&self, id: Uuid, update: ListingUpdate)
    -> StoreResult<Option<Listing>>;

    async fn delete_listing(&self, id: Uuid) -> StoreResult<Option<Listing>>;
}

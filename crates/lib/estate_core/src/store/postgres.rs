//! PostgreSQL-backed store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    AccountStore, DUPLICATE_EMAIL, ListingStore, RefreshTokenStore, StoreError, StoreResult,
};
use crate::models::account::{Account, AccountUpdate, AccountWithPassword, NewAccount};
use crate::models::auth::RefreshTokenRecord;
use crate::models::listing::{Listing, ListingUpdate, NewListing};

/// `(id, user_name, email, password_hash, image, created_at, updated_at)`
type AccountRow = (
    Uuid,
    String,
    String,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

/// `(id, title, price, image, created_at, updated_at)`
type ListingRow = (Uuid, String, f64, Option<String>, DateTime<Utc>, DateTime<Utc>);

const ACCOUNT_COLUMNS: &str =
    "id, user_name, email, password_hash, image, created_at, updated_at";

const LISTING_COLUMNS: &str = "id, title, price, image, created_at, updated_at";

fn account_from_row(row: AccountRow) -> AccountWithPassword {
    let (id, user_name, email, password_hash, image, created_at, updated_at) = row;
    AccountWithPassword {
        account: Account {
            id,
            user_name,
            email,
            image,
            created_at,
            updated_at,
        },
        password_hash,
    }
}

fn listing_from_row(row: ListingRow) -> Listing {
    let (id, title, price, image, created_at, updated_at) = row;
    Listing {
        id,
        title,
        price,
        image,
        created_at,
        updated_at,
    }
}

/// Map a unique-constraint violation on `users.email` to a conflict.
fn email_conflict(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(DUPLICATE_EMAIL.into())
        }
        _ => StoreError::Database(e),
    }
}

/// Store over a PostgreSQL connection pool.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn create_account(&self, new: NewAccount) -> StoreResult<Account> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "INSERT INTO users (id, user_name, email, password_hash, image) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(&new.user_name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.image)
        .fetch_one(&self.pool)
        .await
        .map_err(email_conflict)?;
        Ok(account_from_row(row).account)
    }

    async fn find_account_by_email(
        &self,
        email: &str,
    ) -> StoreResult<Option<AccountWithPassword>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(account_from_row))
    }

    async fn get_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| account_from_row(r).account))
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| account_from_row(r).account)
            .collect())
    }

    async fn update_account(
        &self,
        id: Uuid,
        update: AccountUpdate,
    ) -> StoreResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "UPDATE users SET \
               user_name = COALESCE($2, user_name), \
               email = COALESCE($3, email), \
               password_hash = COALESCE($4, password_hash), \
               image = COALESCE($5, image), \
               updated_at = now() \
             WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id)
        .bind(&update.user_name)
        .bind(&update.email)
        .bind(&update.password_hash)
        .bind(&update.image)
        .fetch_optional(&self.pool)
        .await
        .map_err(email_conflict)?;
        Ok(row.map(|r| account_from_row(r).account))
    }

    async fn delete_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        // refresh_tokens.user_id cascades on delete.
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "DELETE FROM users WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| account_from_row(r).account))
    }
}

#[async_trait]
impl RefreshTokenStore for PgStore {
    async fn store_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<RefreshTokenRecord> {
        let (id, created_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at) \
             VALUES ($1, $2, $3, $4) RETURNING id, created_at",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(RefreshTokenRecord {
            id,
            user_id,
            token_hash: token_hash.to_string(),
            expires_at,
            created_at,
        })
    }

    async fn refresh_tokens_for_account(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Vec<RefreshTokenRecord>> {
        let rows = sqlx::query_as::<_, (Uuid, String, DateTime<Utc>, DateTime<Utc>)>(
            "SELECT id, token_hash, expires_at, created_at \
             FROM refresh_tokens WHERE user_id = $1 \
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, token_hash, expires_at, created_at)| RefreshTokenRecord {
                id,
                user_id,
                token_hash,
                expires_at,
                created_at,
            })
            .collect())
    }

    async fn delete_refresh_token(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_refresh_tokens_for_account(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_expired_refresh_tokens(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result =
            sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1 AND expires_at <= $2")
                .bind(user_id)
                .bind(now)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ListingStore for PgStore {
    async fn create_listing(&self, new: NewListing) -> StoreResult<Listing> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "INSERT INTO listings (id, title, price, image) \
             VALUES ($1, $2, $3, $4) RETURNING {LISTING_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(&new.title)
        .bind(new.price)
        .bind(&new.image)
        .fetch_one(&self.pool)
        .await?;
        Ok(listing_from_row(row))
    }

    async fn get_listing(&self, id: Uuid) -> StoreResult<Option<Listing>> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(listing_from_row))
    }

    async fn list_listings(&self) -> StoreResult<Vec<Listing>> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(listing_from_row).collect())
    }

    async fn update_listing(
        &self,
        id: Uuid,
        update: ListingUpdate,
    ) -> StoreResult<Option<Listing>> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "UPDATE listings SET \
               title = COALESCE($2, title), \
               price = COALESCE($3, price), \
               image = COALESCE($4, image), \
               updated_at = now() \
             WHERE id = $1 RETURNING {LISTING_COLUMNS}"
        ))
        .bind(id)
        .bind(&update.title)
        .bind(update.price)
        .bind(&update.image)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(listing_from_row))
    }

    async fn delete_listing(&self, id: Uuid) -> StoreResult<Option<Listing>> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "DELETE FROM listings WHERE id = $1 RETURNING {LISTING_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(listing_from_row))
    }
}

//! In-memory store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AccountStore, DUPLICATE_EMAIL, ListingStore, RefreshTokenStore, StoreError, StoreResult,
};
use crate::models::account::{Account, AccountUpdate, AccountWithPassword, NewAccount};
use crate::models::auth::RefreshTokenRecord;
use crate::models::listing::{Listing, ListingUpdate, NewListing};

/// Process-local store. Locks are always taken accounts → refresh tokens.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<Uuid, AccountWithPassword>>,
    refresh_tokens: RwLock<HashMap<Uuid, RefreshTokenRecord>>,
    listings: RwLock<HashMap<Uuid, Listing>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_account(&self, new: NewAccount) -> StoreResult<Account> {
        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|a| a.account.email == new.email) {
            return Err(StoreError::Conflict(DUPLICATE_EMAIL.into()));
        }
        let now = Utc::now();
        let account = Account {
            id: Uuid::now_v7(),
            user_name: new.user_name,
            email: new.email,
            image: new.image,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(
            account.id,
            AccountWithPassword {
                account: account.clone(),
                password_hash: new.password_hash,
            },
        );
        Ok(account)
    }

    async fn find_account_by_email(
        &self,
        email: &str,
    ) -> StoreResult<Option<AccountWithPassword>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.account.email == email).cloned())
    }

    async fn get_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&id).map(|a| a.account.clone()))
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let accounts = self.accounts.read().await;
        let mut list: Vec<Account> = accounts.values().map(|a| a.account.clone()).collect();
        list.sort_by_key(|a| a.created_at);
        Ok(list)
    }

    async fn update_account(
        &self,
        id: Uuid,
        update: AccountUpdate,
    ) -> StoreResult<Option<Account>> {
        let mut accounts = self.accounts.write().await;
        if let Some(email) = &update.email
            && accounts
                .values()
                .any(|a| a.account.id != id && &a.account.email == email)
        {
            return Err(StoreError::Conflict(DUPLICATE_EMAIL.into()));
        }
        let Some(entry) = accounts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(user_name) = update.user_name {
            entry.account.user_name = user_name;
        }
        if let Some(email) = update.email {
            entry.account.email = email;
        }
        if let Some(image) = update.image {
            entry.account.image = Some(image);
        }
        if let Some(hash) = update.password_hash {
            entry.password_hash = Some(hash);
        }
        entry.account.updated_at = Utc::now();
        Ok(Some(entry.account.clone()))
    }

    async fn delete_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let mut accounts = self.accounts.write().await;
        let removed = accounts.remove(&id);
        if removed.is_some() {
            self.refresh_tokens
                .write()
                .await
                .retain(|_, record| record.user_id != id);
        }
        Ok(removed.map(|a| a.account))
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryStore {
    async fn store_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<RefreshTokenRecord> {
        let accounts = self.accounts.read().await;
        if !accounts.contains_key(&user_id) {
            return Err(StoreError::NotFound(format!("account {user_id}")));
        }
        let record = RefreshTokenRecord {
            id: Uuid::now_v7(),
            user_id,
            token_hash: token_hash.to_string(),
            expires_at,
            created_at: Utc::now(),
        };
        self.refresh_tokens
            .write()
            .await
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn refresh_tokens_for_account(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Vec<RefreshTokenRecord>> {
        let tokens = self.refresh_tokens.read().await;
        let mut records: Vec<RefreshTokenRecord> = tokens
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn delete_refresh_token(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.refresh_tokens.write().await.remove(&id).is_some())
    }

    async fn delete_refresh_tokens_for_account(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut tokens = self.refresh_tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, record| record.user_id != user_id);
        Ok((before - tokens.len()) as u64)
    }

    async fn delete_expired_refresh_tokens(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut tokens = self.refresh_tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, record| record.user_id != user_id || !record.is_expired_at(now));
        Ok((before - tokens.len()) as u64)
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn create_listing(&self, new: NewListing) -> StoreResult<Listing> {
        let now = Utc::now();
        let listing = Listing {
            id: Uuid::now_v7(),
            title: new.title,
            price: new.price,
            image: new.image,
            created_at: now,
            updated_at: now,
        };
        self.listings
            .write()
            .await
            .insert(listing.id, listing.clone());
        Ok(listing)
    }

    async fn get_listing(&self, id: Uuid) -> StoreResult<Option<Listing>> {
        Ok(self.listings.read().await.get(&id).cloned())
    }

    async fn list_listings(&self) -> StoreResult<Vec<Listing>> {
        let listings = self.listings.read().await;
        let mut list: Vec<Listing> = listings.values().cloned().collect();
        // UUIDv7 ids break ties between listings created in the same instant.
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(list)
    }

    async fn update_listing(
        &self,
        id: Uuid,
        update: ListingUpdate,
    ) -> StoreResult<Option<Listing>> {
        let mut listings = self.listings.write().await;
        let Some(listing) = listings.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = update.title {
            listing.title = title;
        }
        if let Some(price) = update.price {
            listing.price = price;
        }
        if let Some(image) = update.image {
            listing.image = Some(image);
        }
        listing.updated_at = Utc::now();
        Ok(Some(listing.clone()))
    }

    async fn delete_listing(&self, id: Uuid) -> StoreResult<Option<Listing>> {
        Ok(self.listings.write().await.remove(&id))
    }
}

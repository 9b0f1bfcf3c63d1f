//! Account service: signup and profile management.

use estate_core::auth::password::hash_password;
use estate_core::models::account::{Account, AccountUpdate, NewAccount, normalize_email};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{CreateUserRequest, UpdateUserRequest};

const USER_NOT_FOUND: &str = "User not found";

/// Parse a user ID path segment.
pub fn parse_user_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::Validation("Invalid user ID".into()))
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

/// Create an account with a bcrypt-hashed password.
pub async fn create_user(state: &AppState, mut req: CreateUserRequest) -> AppResult<Account> {
    req.user_name = req.user_name.trim().to_string();
    req.email = normalize_email(&req.email);
    req.image = trimmed(req.image);
    req.validate()?;

    let password_hash = hash_password(&req.password, state.config.bcrypt_cost)?;
    let account = state
        .accounts
        .create_account(NewAccount {
            user_name: req.user_name,
            email: req.email,
            password_hash: Some(password_hash),
            image: req.image,
        })
        .await?;

    info!(account_id = %account.id, "account created");
    Ok(account)
}

pub async fn list_users(state: &AppState) -> AppResult<Vec<Account>> {
    Ok(state.accounts.list_accounts().await?)
}

pub async fn get_user(state: &AppState, id: Uuid) -> AppResult<Account> {
    state
        .accounts
        .get_account(id)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.into()))
}

/// Only the account itself may change or remove it.
fn ensure_self(actor: Uuid, id: Uuid) -> AppResult<()> {
    if actor == id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You can only modify your own account".into(),
        ))
    }
}

/// Apply a partial profile update. A new password is re-hashed.
pub async fn update_user(
    state: &AppState,
    actor: Uuid,
    id: Uuid,
    mut req: UpdateUserRequest,
) -> AppResult<Account> {
    ensure_self(actor, id)?;

    req.user_name = trimmed(req.user_name);
    req.email = req.email.as_deref().map(normalize_email);
    req.image = trimmed(req.image);
    req.validate()?;

    let password_hash = req
        .password
        .as_deref()
        .map(|pw| hash_password(pw, state.config.bcrypt_cost))
        .transpose()?;

    let update = AccountUpdate {
        user_name: req.user_name,
        email: req.email,
        password_hash,
        image: req.image,
    };

    let account = if update.is_empty() {
        state.accounts.get_account(id).await?
    } else {
        state.accounts.update_account(id, update).await?
    };
    account.ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.into()))
}

/// Delete an account and revoke all of its refresh tokens.
pub async fn delete_user(state: &AppState, actor: Uuid, id: Uuid) -> AppResult<Account> {
    ensure_self(actor, id)?;
    let account = state
        .accounts
        .delete_account(id)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.into()))?;
    let revoked = state
        .refresh_tokens
        .delete_refresh_tokens_for_account(id)
        .await?;
    info!(account_id = %account.id, revoked, "account deleted");
    Ok(account)
}

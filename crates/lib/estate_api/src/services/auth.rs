//! Authentication service: login, token issue, refresh and logout flows
//! delegating to `estate_core::auth`.

use chrono::{DateTime, Utc};
use estate_core::auth::AuthError;
use estate_core::auth::jwt::{
    generate_access_token, generate_refresh_token, refresh_token_subject, verify_access_token,
    verify_refresh_token,
};
use estate_core::auth::password::verify_password;
use estate_core::auth::refresh_tokens::{find_matching_record, hash_refresh_token};
use estate_core::models::account::{Account, normalize_email};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppResult;

/// Freshly minted access + refresh tokens.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: Account,
    pub tokens: TokenPair,
}

/// Delete an account's expired refresh records. Failures are logged only.
async fn purge_expired(state: &AppState, account_id: Uuid, now: DateTime<Utc>) {
    match state
        .refresh_tokens
        .delete_expired_refresh_tokens(account_id, now)
        .await
    {
        Ok(0) => {}
        Ok(purged) => debug!(account_id = %account_id, purged, "expired refresh tokens purged"),
        Err(e) => warn!(account_id = %account_id, "expired refresh token purge failed: {e}"),
    }
}

/// Mint an access/refresh pair and persist the hashed refresh token.
///
/// The account's expired records are purged first.
pub async fn issue(state: &AppState, account_id: Uuid) -> AppResult<TokenPair> {
    purge_expired(state, account_id, Utc::now()).await;

    let secret = state.config.jwt_secret.as_bytes();
    let access_token = generate_access_token(account_id, secret)?;
    let (refresh_token, expires_at) = generate_refresh_token(account_id, secret)?;
    let token_hash = hash_refresh_token(&refresh_token, state.config.bcrypt_cost)?;

    state
        .refresh_tokens
        .store_refresh_token(account_id, &token_hash, expires_at)
        .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Authenticate with email + password.
///
/// Unknown email, missing hash and wrong password all produce the same
/// `Invalid credentials` error.
pub async fn login(state: &AppState, email: &str, password: &str) -> AppResult<LoginOutcome> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AuthError::ValidationError("Email and password are required".into()).into());
    }

    let email = normalize_email(email);
    let found = state.accounts.find_account_by_email(&email).await?;

    let Some(found) = found else {
        debug!(email = %email, "login rejected: unknown email");
        return Err(AuthError::InvalidCredentials.into());
    };

    let Some(pw_hash) = found.password_hash.as_deref() else {
        debug!(email = %email, "login rejected: account has no password");
        return Err(AuthError::InvalidCredentials.into());
    };

    if !verify_password(password, pw_hash)? {
        debug!(email = %email, "login rejected: wrong password");
        return Err(AuthError::InvalidCredentials.into());
    }

    let tokens = issue(state, found.account.id).await?;
    info!(account_id = %found.account.id, "login succeeded");

    Ok(LoginOutcome {
        user: found.account,
        tokens,
    })
}

/// Resolve the account behind an access token.
pub fn authenticate(state: &AppState, access_token: Option<&str>) -> AppResult<Uuid> {
    let token = access_token.ok_or(AuthError::Unauthenticated)?;
    let claims = verify_access_token(token, state.config.jwt_secret.as_bytes())
        .ok_or(AuthError::InvalidToken)?;
    Ok(claims.sub)
}

/// Exchange a refresh token for a new token pair.
pub async fn refresh(state: &AppState, refresh_token: Option<&str>) -> AppResult<TokenPair> {
    refresh_at(state, refresh_token, Utc::now()).await
}

/// [`refresh`] evaluated at an explicit instant.
///
/// The presented token is single-use: its record is deleted and a new pair
/// is issued in its place.
pub async fn refresh_at(
    state: &AppState,
    refresh_token: Option<&str>,
    now: DateTime<Utc>,
) -> AppResult<TokenPair> {
    let token = refresh_token.ok_or(AuthError::RefreshRequired)?;
    let secret = state.config.jwt_secret.as_bytes();

    let Some(claims) = verify_refresh_token(token, secret) else {
        if let Some(account_id) = refresh_token_subject(token, secret) {
            debug!(account_id = %account_id, "refresh rejected: token expired");
            purge_expired(state, account_id, now).await;
        }
        return Err(AuthError::InvalidRefreshToken.into());
    };

    let records = state
        .refresh_tokens
        .refresh_tokens_for_account(claims.sub)
        .await?;

    let Some(record) = find_matching_record(&records, token) else {
        debug!(account_id = %claims.sub, "refresh rejected: no matching record");
        return Err(AuthError::InvalidRefreshToken.into());
    };

    if record.is_expired_at(now) {
        state.refresh_tokens.delete_refresh_token(record.id).await?;
        debug!(account_id = %claims.sub, "refresh rejected: record expired");
        return Err(AuthError::RefreshExpired.into());
    }

    // A concurrent refresh with the same token may have consumed it first.
    if !state.refresh_tokens.delete_refresh_token(record.id).await? {
        debug!(account_id = %claims.sub, "refresh rejected: record already consumed");
        return Err(AuthError::InvalidRefreshToken.into());
    }

    let tokens = issue(state, claims.sub).await?;
    debug!(account_id = %claims.sub, "refresh token rotated");
    Ok(tokens)
}

/// Revoke the record behind a refresh token. Never fails: problems are logged.
pub async fn logout(state: &AppState, refresh_token: Option<&str>) {
    let Some(token) = refresh_token else {
        return;
    };
    match revoke(state, token).await {
        Ok(true) => debug!("refresh token revoked"),
        Ok(false) => debug!("logout: refresh token already gone"),
        Err(e) => warn!("logout: refresh token revocation failed: {e}"),
    }
}

async fn revoke(state: &AppState, token: &str) -> AppResult<bool> {
    let secret = state.config.jwt_secret.as_bytes();
    let Some(claims) = verify_refresh_token(token, secret) else {
        if let Some(account_id) = refresh_token_subject(token, secret) {
            purge_expired(state, account_id, Utc::now()).await;
        }
        return Ok(false);
    };
    let records = state
        .refresh_tokens
        .refresh_tokens_for_account(claims.sub)
        .await?;
    match find_matching_record(&records, token) {
        Some(record) => Ok(state.refresh_tokens.delete_refresh_token(record.id).await?),
        None => Ok(false),
    }
}

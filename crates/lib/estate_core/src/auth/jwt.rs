//! JWT token generation and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::{TokenClaims, TokenKind};

/// Access token lifetime: 15 minutes.
pub const ACCESS_TOKEN_EXPIRY_SECS: i64 = 15 * 60;

/// Refresh token lifetime: 7 days.
pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 7;

fn sign(
    account_id: Uuid,
    kind: TokenKind,
    lifetime: Duration,
    secret: &[u8],
) -> Result<(String, DateTime<Utc>), AuthError> {
    let now = Utc::now();
    let expires_at = now + lifetime;
    let claims = TokenClaims {
        sub: account_id,
        kind,
        jti: Uuid::new_v4(),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))?;
    Ok((token, expires_at))
}

/// Generate a signed JWT access token (HS256, 15 min expiry).
pub fn generate_access_token(account_id: Uuid, secret: &[u8]) -> Result<String, AuthError> {
    sign(
        account_id,
        TokenKind::Access,
        Duration::seconds(ACCESS_TOKEN_EXPIRY_SECS),
        secret,
    )
    .map(|(token, _)| token)
}

/// Generate a signed JWT refresh token (HS256, 7 day expiry).
///
/// Returns the token together with the instant its persisted record expires.
pub fn generate_refresh_token(
    account_id: Uuid,
    secret: &[u8],
) -> Result<(String, DateTime<Utc>), AuthError> {
    sign(
        account_id,
        TokenKind::Refresh,
        Duration::days(REFRESH_TOKEN_EXPIRY_DAYS),
        secret,
    )
}

fn decode_claims(
    token: &str,
    kind: TokenKind,
    secret: &[u8],
    validate_exp: bool,
) -> Option<TokenClaims> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = validate_exp;
    validation.leeway = 0;
    if !validate_exp {
        validation.required_spec_claims.remove("exp");
    }
    decode::<TokenClaims>(token, &key, &validation)
        .ok()
        .map(|data| data.claims)
        .filter(|claims| claims.kind == kind)
}

/// Verify a JWT of the given kind, returning the claims on success.
///
/// Any failure (bad signature, malformed, expired, wrong kind) yields `None`.
pub fn verify_token(token: &str, kind: TokenKind, secret: &[u8]) -> Option<TokenClaims> {
    decode_claims(token, kind, secret, true)
}

/// Verify a JWT access token.
pub fn verify_access_token(token: &str, secret: &[u8]) -> Option<TokenClaims> {
    verify_token(token, TokenKind::Access, secret)
}

/// Verify a JWT refresh token (signature and expiry only; the persisted
/// record is checked separately).
pub fn verify_refresh_token(token: &str, secret: &[u8]) -> Option<TokenClaims> {
    verify_token(token, TokenKind::Refresh, secret)
}

/// Account behind a refresh token whose signature and kind check out,
/// whether or not it has expired. Used to clean up after stale sessions.
pub fn refresh_token_subject(token: &str, secret: &[u8]) -> Option<Uuid> {
    decode_claims(token, TokenKind::Refresh, secret, false).map(|claims| claims.sub)
}

//! Refresh token hashing and record matching.
//!
//! Records store `bcrypt(sha256_hex(token))`. bcrypt reads at most 72 bytes
//! and refresh JWTs for one account share a longer prefix, so the digest is
//! what gets salted and hashed.

use sha2::{Digest, Sha256};
use tracing::debug;

use super::AuthError;
use super::password::{hash_password, verify_password};
use crate::models::auth::RefreshTokenRecord;

/// SHA-256 digest of a refresh token, hex encoded.
fn digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash a refresh token for storage.
pub fn hash_refresh_token(token: &str, cost: u32) -> Result<String, AuthError> {
    hash_password(&digest(token), cost)
}

/// Check a presented refresh token against one stored hash.
pub fn refresh_token_matches(token: &str, token_hash: &str) -> bool {
    match verify_password(&digest(token), token_hash) {
        Ok(matched) => matched,
        Err(e) => {
            debug!("unreadable refresh token hash: {e}");
            false
        }
    }
}

/// Find the record whose hash matches the presented token.
///
/// Hashes are salted per record, so each one has to be verified in turn.
pub fn find_matching_record<'a>(
    records: &'a [RefreshTokenRecord],
    token: &str,
) -> Option<&'a RefreshTokenRecord> {
    records
        .iter()
        .find(|record| refresh_token_matches(token, &record.token_hash))
}

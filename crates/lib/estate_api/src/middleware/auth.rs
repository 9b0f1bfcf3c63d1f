//! Authentication middleware: access-token extraction and JWT verification.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;
use crate::services::auth::authenticate;
use crate::services::cookies::{ACCESS_COOKIE, cookie_value};

/// Stored in request extensions for downstream handlers.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Uuid);

/// Access token from the `accessToken` cookie, else from
/// `Authorization: Bearer <token>`.
fn access_token(request: &Request) -> Option<String> {
    let jar = CookieJar::from_headers(request.headers());
    if let Some(token) = cookie_value(&jar, ACCESS_COOKIE) {
        return Some(token.to_string());
    }
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Axum middleware: verifies the access token and injects
/// [`AuthenticatedUser`] into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = access_token(&request);
    let account_id = authenticate(&state, token.as_deref()).inspect_err(|e| {
        debug!(path = %request.uri().path(), "request rejected: {e}");
    })?;

    request.extensions_mut().insert(AuthenticatedUser(account_id));

    Ok(next.run(request).await)
}

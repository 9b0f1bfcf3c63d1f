//! Authentication request handlers.

use axum::Json;
use axum::extract::State;
use axum_extra::extract::WithRejection;
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{LoginRequest, MessageResponse, UserResponse};
use crate::services::auth::{self, TokenPair};
use crate::services::cookies::{
    REFRESH_COOKIE, access_cookie, clear_access_cookie, clear_refresh_cookie, cookie_value,
    refresh_cookie,
};

fn with_tokens(jar: CookieJar, tokens: &TokenPair, secure: bool) -> CookieJar {
    jar.add(access_cookie(&tokens.access_token, secure))
        .add(refresh_cookie(&tokens.refresh_token, secure))
}

/// `POST /auth/login`: authenticate with email + password; sets both cookies.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(body), _): WithRejection<Json<LoginRequest>, AppError>,
) -> AppResult<(CookieJar, Json<UserResponse>)> {
    let outcome = auth::login(&state, &body.email, &body.password).await?;
    let jar = with_tokens(jar, &outcome.tokens, state.config.is_production());
    Ok((jar, Json(UserResponse { user: outcome.user })))
}

/// `POST /auth/refresh`: exchange the refresh cookie for a rotated token pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<MessageResponse>)> {
    let tokens = auth::refresh(&state, cookie_value(&jar, REFRESH_COOKIE)).await?;
    let jar = with_tokens(jar, &tokens, state.config.is_production());
    Ok((jar, Json(MessageResponse::new("Token refreshed"))))
}

/// `POST /auth/logout`: revoke the refresh token (best effort) and clear
/// both cookies. Always succeeds.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    auth::logout(&state, cookie_value(&jar, REFRESH_COOKIE)).await;
    let secure = state.config.is_production();
    let jar = jar
        .add(clear_access_cookie(secure))
        .add(clear_refresh_cookie(secure));
    (jar, Json(MessageResponse::new("Logged out successfully")))
}

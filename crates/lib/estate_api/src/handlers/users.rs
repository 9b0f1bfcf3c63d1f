//! Account request handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use axum_extra::extract::WithRejection;
use estate_core::models::account::Account;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ApiResponse, CreateUserRequest, UpdateUserRequest, UserResponse};
use crate::services::users::{self, parse_user_id};

/// `GET /users/me`: the authenticated account.
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(account_id)): Extension<AuthenticatedUser>,
) -> AppResult<Json<UserResponse>> {
    let user = users::get_user(&state, account_id).await?;
    Ok(Json(UserResponse { user }))
}

/// `GET /users`
pub async fn list_users_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Account>>>> {
    let list = users::list_users(&state).await?;
    Ok(Json(ApiResponse::ok("Users retrieved successfully", list)))
}

/// `POST /users`: signup.
pub async fn create_user_handler(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<CreateUserRequest>, AppError>,
) -> AppResult<(StatusCode, Json<ApiResponse<Account>>)> {
    let user = users::create_user(&state, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("User created successfully", user)),
    ))
}

/// `GET /users/{id}`
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Account>>> {
    let user = users::get_user(&state, parse_user_id(&id)?).await?;
    Ok(Json(ApiResponse::ok("User retrieved successfully", user)))
}

/// `PUT /users/{id}`: requires authentication as that account.
pub async fn update_user_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(actor)): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<UpdateUserRequest>, AppError>,
) -> AppResult<Json<ApiResponse<Account>>> {
    let user = users::update_user(&state, actor, parse_user_id(&id)?, body).await?;
    Ok(Json(ApiResponse::ok("User updated successfully", user)))
}

/// `DELETE /users/{id}`: requires authentication as that account.
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(actor)): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Account>>, AppError> {
    let user = users::delete_user(&state, actor, parse_user_id(&id)?).await?;
    Ok(Json(ApiResponse::ok("User deleted successfully", user)))
}

//! # estate_api
//!
//! HTTP API library for Estate.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post, put};
use estate_core::store::{AccountStore, ListingStore, MemoryStore, PgStore, RefreshTokenStore};
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::ApiConfig;
use crate::handlers::{auth, health, listings, users};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<dyn AccountStore>,
    pub listings: Arc<dyn ListingStore>,
    pub refresh_tokens: Arc<dyn RefreshTokenStore>,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// State backed by a single store implementing every store trait.
    pub fn new<S>(store: Arc<S>, config: ApiConfig) -> Self
    where
        S: AccountStore + ListingStore + RefreshTokenStore + 'static,
    {
        Self {
            accounts: store.clone(),
            listings: store.clone(),
            refresh_tokens: store,
            config,
        }
    }

    /// PostgreSQL-backed state.
    pub fn postgres(pool: PgPool, config: ApiConfig) -> Self {
        Self::new(Arc::new(PgStore::new(pool)), config)
    }

    /// Process-local state; contents are lost on restart.
    pub fn in_memory(config: ApiConfig) -> Self {
        Self::new(Arc::new(MemoryStore::new()), config)
    }
}

/// Run embedded database migrations.
///
/// Delegates to `estate_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    estate_core::migrate::migrate(pool).await
}

/// Credentialed CORS: an explicit allow-list, or in development with no list
/// configured, the request origin is mirrored.
fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let origin = if config.cors_origins.is_empty() && !config.is_production() {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| {
                HeaderValue::from_str(o)
                    .inspect_err(|_| warn!(origin = %o, "ignoring invalid CORS origin"))
                    .ok()
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let auth_layer =
        axum::middleware::from_fn_with_state(state.clone(), middleware::auth::require_auth);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/", get(health::health_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route(
            "/users",
            get(users::list_users_handler).post(users::create_user_handler),
        )
        .route(
            "/users/{id}",
            get(users::get_user_handler).merge(
                put(users::update_user_handler)
                    .delete(users::delete_user_handler)
                    .route_layer(auth_layer.clone()),
            ),
        )
        .route(
            "/listings",
            get(listings::list_listings_handler).merge(
                post(listings::create_listing_handler).route_layer(auth_layer.clone()),
            ),
        )
        .route(
            "/listings/{id}",
            get(listings::get_listing_handler).merge(
                put(listings::update_listing_handler)
                    .delete(listings::delete_listing_handler)
                    .route_layer(auth_layer.clone()),
            ),
        );

    // Protected routes (require auth)
    let protected = Router::new()
        .route("/users/me", get(users::me_handler))
        .route_layer(auth_layer);

    Router::new()
        .merge(public)
        .merge(protected)
        .fallback(health::not_found_handler)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .with_state(state)
}

//! Integration test: build the router over the in-memory store and drive the
//! cookie session flow end to end.

use std::collections::HashMap;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use estate_api::{AppState, config::ApiConfig};
use estate_core::auth::password::hash_password;
use estate_core::models::account::NewAccount;
use serde_json::{Value, json};
use tower::ServiceExt;

struct Reply {
    status: StatusCode,
    cookies: HashMap<String, String>,
    body: Value,
}

impl Reply {
    /// `Cookie` header carrying every cookie this reply set.
    fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

async fn app() -> Router {
    let mut config = ApiConfig::development("integration-test-secret");
    config.bcrypt_cost = 4;
    let state = AppState::in_memory(config);
    state
        .accounts
        .create_account(NewAccount {
            user_name: "alice".into(),
            email: "a@b.com".into(),
            password_hash: Some(hash_password("secret1", 4).expect("hash")),
            image: None,
        })
        .await
        .expect("seed account");
    estate_api::router(state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Reply {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        req = req.header(header::COOKIE, cookie);
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => req.body(Body::empty()),
    }
    .expect("request");
    dispatch(app, req).await
}

/// POST a body verbatim, with an optional `Content-Type`.
async fn post_raw(
    app: &Router,
    uri: &str,
    cookie: Option<&str>,
    content_type: Option<&str>,
    body: &'static str,
) -> Reply {
    let mut req = Request::builder().method(Method::POST).uri(uri);
    if let Some(cookie) = cookie {
        req = req.header(header::COOKIE, cookie);
    }
    if let Some(content_type) = content_type {
        req = req.header(header::CONTENT_TYPE, content_type);
    }
    let req = req.body(Body::from(body)).expect("request");
    dispatch(app, req).await
}

async fn dispatch(app: &Router, req: Request<Body>) -> Reply {
    let resp = app.clone().oneshot(req).await.expect("response");
    let status = resp.status();
    let cookies = resp
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse JSON")
    };
    Reply {
        status,
        cookies,
        body,
    }
}

async fn login(app: &Router) -> Reply {
    let reply = send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({"email": "a@b.com", "password": "secret1"})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "login failed: {}", reply.body);
    reply
}

#[tokio::test]
async fn health_reports_running() {
    let app = app().await;
    let reply = send(&app, Method::GET, "/", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body["message"].is_string());
    assert!(reply.body["status"].is_string());
    assert!(reply.body["timestamp"].is_string());
}

#[tokio::test]
async fn login_sets_both_cookies_and_hides_password() {
    let app = app().await;
    let reply = login(&app).await;

    assert!(!reply.cookies["accessToken"].is_empty());
    assert!(!reply.cookies["refreshToken"].is_empty());
    assert_eq!(reply.body["user"]["email"], "a@b.com");
    assert_eq!(reply.body["user"]["userName"], "alice");
    assert!(reply.body["user"].get("password").is_none());
    assert!(reply.body["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = app().await;
    let reply = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({"email": "a@b.com", "password": "nope!!"})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "unauthorized");
    assert_eq!(reply.body["message"], "Invalid credentials");
    assert!(reply.cookies.is_empty());
}

#[tokio::test]
async fn login_without_fields_is_bad_request() {
    let app = app().await;
    let reply = send(&app, Method::POST, "/auth/login", None, Some(json!({}))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "Email and password are required");
}

fn assert_validation_error(reply: &Reply) {
    assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{}", reply.body);
    assert_eq!(reply.body["error"], "validation_error");
    assert!(reply.body["message"].is_string());
}

#[tokio::test]
async fn malformed_login_body_is_a_validation_error() {
    let app = app().await;
    let reply = post_raw(&app, "/auth/login", None, Some("application/json"), "{not json").await;
    assert_validation_error(&reply);
    assert!(reply.cookies.is_empty());
}

#[tokio::test]
async fn login_body_without_content_type_is_a_validation_error() {
    let app = app().await;
    let body = r#"{"email":"a@b.com","password":"secret1"}"#;
    let reply = post_raw(&app, "/auth/login", None, None, body).await;
    assert_validation_error(&reply);
    let reply = post_raw(&app, "/auth/login", None, Some("text/plain"), body).await;
    assert_validation_error(&reply);
}

#[tokio::test]
async fn mistyped_fields_are_a_validation_error() {
    let app = app().await;
    let reply = post_raw(
        &app,
        "/auth/login",
        None,
        Some("application/json"),
        r#"{"email":5,"password":"secret1"}"#,
    )
    .await;
    assert_validation_error(&reply);

    let session = login(&app).await.cookie_header();
    let reply = post_raw(
        &app,
        "/listings",
        Some(&session),
        Some("application/json"),
        r#"{"title":"Loft","price":"cheap"}"#,
    )
    .await;
    assert_validation_error(&reply);
    let reply = post_raw(&app, "/users", None, Some("application/json"), "[]").await;
    assert_validation_error(&reply);
}

#[tokio::test]
async fn refresh_without_cookie_is_rejected() {
    let app = app().await;
    let reply = send(&app, Method::POST, "/auth/refresh", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["message"], "Refresh token required");
}

#[tokio::test]
async fn refresh_rotates_cookies_and_retires_the_old_token() {
    let app = app().await;
    let session = login(&app).await;
    let old_cookie = session.cookie_header();

    let rotated = send(&app, Method::POST, "/auth/refresh", Some(&old_cookie), None).await;
    assert_eq!(rotated.status, StatusCode::OK);
    assert_eq!(rotated.body["message"], "Token refreshed");
    assert_ne!(rotated.cookies["refreshToken"], session.cookies["refreshToken"]);
    assert!(!rotated.cookies["accessToken"].is_empty());

    let me = send(
        &app,
        Method::GET,
        "/users/me",
        Some(&rotated.cookie_header()),
        None,
    )
    .await;
    assert_eq!(me.status, StatusCode::OK);

    let replay = send(&app, Method::POST, "/auth/refresh", Some(&old_cookie), None).await;
    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);
    assert_eq!(replay.body["message"], "Invalid refresh token");
}

#[tokio::test]
async fn logout_clears_cookies_and_revokes_refresh() {
    let app = app().await;
    let session = login(&app).await;
    let cookie = session.cookie_header();

    let first = send(&app, Method::POST, "/auth/logout", Some(&cookie), None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["message"], "Logged out successfully");
    assert_eq!(first.cookies["accessToken"], "");
    assert_eq!(first.cookies["refreshToken"], "");

    let second = send(&app, Method::POST, "/auth/logout", Some(&cookie), None).await;
    assert_eq!(second.status, StatusCode::OK);

    let refresh = send(&app, Method::POST, "/auth/refresh", Some(&cookie), None).await;
    assert_eq!(refresh.status, StatusCode::UNAUTHORIZED);
    assert_eq!(refresh.body["message"], "Invalid refresh token");
}

#[tokio::test]
async fn logout_without_session_still_succeeds() {
    let app = app().await;
    let reply = send(&app, Method::POST, "/auth/logout", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn me_requires_access_cookie_or_bearer() {
    let app = app().await;
    let anonymous = send(&app, Method::GET, "/users/me", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.body["message"], "Authentication required");

    let garbage = send(&app, Method::GET, "/users/me", Some("accessToken=garbage"), None).await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.body["message"], "Invalid or expired token");

    let session = login(&app).await;
    let me = send(
        &app,
        Method::GET,
        "/users/me",
        Some(&session.cookie_header()),
        None,
    )
    .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["email"], "a@b.com");

    let req = Request::builder()
        .uri("/users/me")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", session.cookies["accessToken"]),
        )
        .body(Body::empty())
        .expect("request");
    let resp = app.clone().oneshot(req).await.expect("response");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn refresh_token_is_not_an_access_token() {
    let app = app().await;
    let session = login(&app).await;
    let cookie = format!("accessToken={}", session.cookies["refreshToken"]);
    let reply = send(&app, Method::GET, "/users/me", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signup_then_login() {
    let app = app().await;
    let created = send(
        &app,
        Method::POST,
        "/users",
        None,
        Some(json!({"userName": "bob", "email": "Bob@Example.com", "password": "hunter22"})),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["success"], true);
    assert_eq!(created.body["data"]["email"], "bob@example.com");

    let duplicate = send(
        &app,
        Method::POST,
        "/users",
        None,
        Some(json!({"userName": "bob", "email": "bob@example.com", "password": "hunter22"})),
    )
    .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let login = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({"email": "bob@example.com", "password": "hunter22"})),
    )
    .await;
    assert_eq!(login.status, StatusCode::OK);
}

#[tokio::test]
async fn users_can_only_modify_themselves() {
    let app = app().await;
    let bob = send(
        &app,
        Method::POST,
        "/users",
        None,
        Some(json!({"userName": "bob", "email": "bob@example.com", "password": "hunter22"})),
    )
    .await;
    let bob_id = bob.body["data"]["id"].as_str().expect("id").to_string();

    let session = login(&app).await;
    let cookie = session.cookie_header();

    let anonymous = send(
        &app,
        Method::PUT,
        &format!("/users/{bob_id}"),
        None,
        Some(json!({"userName": "mallory"})),
    )
    .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let forbidden = send(
        &app,
        Method::DELETE,
        &format!("/users/{bob_id}"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let public = send(&app, Method::GET, &format!("/users/{bob_id}"), None, None).await;
    assert_eq!(public.status, StatusCode::OK);
    assert_eq!(public.body["data"]["userName"], "bob");

    let bad = send(&app, Method::GET, "/users/not-a-uuid", None, None).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad.body["message"], "Invalid user ID");
}

#[tokio::test]
async fn listing_lifecycle() {
    let app = app().await;
    let body = json!({"title": "Lake house", "price": 250000.0});

    let anonymous = send(&app, Method::POST, "/listings", None, Some(body.clone())).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let session = login(&app).await;
    let cookie = session.cookie_header();

    let created = send(&app, Method::POST, "/listings", Some(&cookie), Some(body)).await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.body["listing"]["id"]
        .as_str()
        .expect("id")
        .to_string();

    let list = send(&app, Method::GET, "/listings", None, None).await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.body.as_array().map(Vec::len), Some(1));

    let updated = send(
        &app,
        Method::PUT,
        &format!("/listings/{id}"),
        Some(&cookie),
        Some(json!({"price": 199000.0})),
    )
    .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["listing"]["price"], 199000.0);
    assert_eq!(updated.body["listing"]["title"], "Lake house");

    let negative = send(
        &app,
        Method::PUT,
        &format!("/listings/{id}"),
        Some(&cookie),
        Some(json!({"price": -1.0})),
    )
    .await;
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);

    let deleted = send(
        &app,
        Method::DELETE,
        &format!("/listings/{id}"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(deleted.status, StatusCode::OK);

    let gone = send(&app, Method::GET, &format!("/listings/{id}"), None, None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.body["message"], "Listing not found");

    let bad = send(&app, Method::GET, "/listings/xyz", None, None).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad.body["message"], "Invalid listing ID");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = app().await;
    let reply = send(&app, Method::GET, "/nope", None, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["error"], "not_found");
    assert_eq!(
        reply.body["message"],
        "The requested endpoint /nope does not exist"
    );
}

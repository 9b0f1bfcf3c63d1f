//! Cookie-session HTTP client for the Estate API.
//!
//! Every request goes through [`ApiClient::execute`]: a `401` on anything
//! other than the login or refresh endpoints triggers one coalesced refresh,
//! then the request is resubmitted once.

use std::sync::Arc;

use estate_core::models::account::Account;
use estate_core::models::listing::Listing;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{ClientError, ClientResult, RefreshFailure};
use crate::refresh::RefreshCoordinator;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const LOGOUT_PATH: &str = "/auth/logout";

type SessionExpiredHook = Arc<dyn Fn(&RefreshFailure) + Send + Sync>;

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct UserBody {
    user: Account,
}

/// `{success, message, data}` body of the `/users` routes.
#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ListingBody {
    listing: Listing,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

/// Listing fields sent on create; `None` fields are omitted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListingDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Signup fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub user_name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Profile fields sent on update; `None` fields are omitted.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Endpoints whose `401` is a final answer rather than a stale session.
fn retries_on_unauthorized(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    let path = path.trim_matches('/');
    [LOGIN_PATH, REFRESH_PATH]
        .iter()
        .all(|endpoint| path != endpoint.trim_start_matches('/'))
}

/// Message of an `{error, message}` body, else the raw text.
async fn error_message(response: Response) -> String {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.message)
        .unwrap_or(text)
}

async fn into_error(response: Response) -> ClientError {
    let status = response.status();
    ClientError::Status {
        status,
        message: error_message(response).await,
    }
}

async fn request_refresh(http: Client, url: Url) -> Result<(), RefreshFailure> {
    let response = http
        .post(url)
        .send()
        .await
        .map_err(|e| RefreshFailure::Transport(e.to_string()))?;
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    Err(RefreshFailure::Rejected {
        status,
        message: error_message(response).await,
    })
}

/// HTTP client holding the session cookies in its own jar.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
    refresh: Arc<RefreshCoordinator>,
    on_session_expired: Option<SessionExpiredHook>,
}

impl ApiClient {
    /// Client for the API rooted at `base_url`.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let http = Client::builder().cookie_store(true).build()?;
        Self::with_http_client(base_url, http)
    }

    /// Use a preconfigured `reqwest::Client`. It must have a cookie store for
    /// the session to persist across requests.
    pub fn with_http_client(base_url: &str, http: Client) -> ClientResult<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http,
            base,
            refresh: Arc::new(RefreshCoordinator::new()),
            on_session_expired: None,
        })
    }

    /// Called once per failed refresh, before the waiting requests fail with
    /// [`ClientError::SessionExpired`].
    pub fn with_session_expired_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RefreshFailure) + Send + Sync + 'static,
    {
        self.on_session_expired = Some(Arc::new(hook));
        self
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    async fn send_once(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> ClientResult<Response> {
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Refresh the session, joining a refresh already in flight.
    pub async fn refresh_session(&self) -> Result<(), RefreshFailure> {
        let http = self.http.clone();
        let url = self
            .url(REFRESH_PATH)
            .map_err(|e| RefreshFailure::Transport(e.to_string()))?;
        let hook = self.on_session_expired.clone();

        self.refresh
            .run(move || async move {
                debug!("refreshing session");
                let outcome = request_refresh(http, url).await;
                if let Err(failure) = &outcome {
                    warn!("session refresh failed: {failure}");
                    if let Some(hook) = &hook {
                        hook(failure);
                    }
                }
                outcome
            })
            .await
    }

    /// Send a request, refreshing the session and retrying once on `401`.
    ///
    /// The returned response may still carry an error status; the retried
    /// request is never refreshed again.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> ClientResult<Response> {
        let url = self.url(path)?;
        let response = self.send_once(method.clone(), url.clone(), body).await?;
        if response.status() != StatusCode::UNAUTHORIZED || !retries_on_unauthorized(path) {
            return Ok(response);
        }

        debug!(path, "access token rejected");
        self.refresh_session()
            .await
            .map_err(ClientError::SessionExpired)?;
        self.send_once(method, url, body).await
    }

    /// [`execute`](Self::execute) and decode a JSON success body.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> ClientResult<T> {
        let response = self.execute(method, path, body).await?;
        if !response.status().is_success() {
            return Err(into_error(response).await);
        }
        Ok(response.json().await?)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.request_json(Method::GET, path, None).await
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let body = serde_json::to_value(body)?;
        self.request_json(Method::POST, path, Some(&body)).await
    }

    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let body = serde_json::to_value(body)?;
        self.request_json(Method::PUT, path, Some(&body)).await
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.request_json(Method::DELETE, path, None).await
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    /// Log in; the server's cookies land in this client's jar.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Account> {
        let body: UserBody = self
            .post_json(LOGIN_PATH, &LoginBody { email, password })
            .await?;
        Ok(body.user)
    }

    pub async fn logout(&self) -> ClientResult<()> {
        let response = self.execute(Method::POST, LOGOUT_PATH, None).await?;
        if !response.status().is_success() {
            return Err(into_error(response).await);
        }
        Ok(())
    }

    /// The logged-in account.
    pub async fn me(&self) -> ClientResult<Account> {
        let body: UserBody = self.get_json("/users/me").await?;
        Ok(body.user)
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    /// Register an account. Does not log in.
    pub async fn signup(&self, user: &NewUser) -> ClientResult<Account> {
        let body: Envelope<Account> = self.post_json("/users", user).await?;
        Ok(body.data)
    }

    pub async fn list_users(&self) -> ClientResult<Vec<Account>> {
        let body: Envelope<Vec<Account>> = self.get_json("/users").await?;
        Ok(body.data)
    }

    pub async fn get_user(&self, id: Uuid) -> ClientResult<Account> {
        let body: Envelope<Account> = self.get_json(&format!("/users/{id}")).await?;
        Ok(body.data)
    }

    /// Update the logged-in account; the server rejects any other id.
    pub async fn update_user(&self, id: Uuid, changes: &UserChanges) -> ClientResult<Account> {
        let body: Envelope<Account> = self.put_json(&format!("/users/{id}"), changes).await?;
        Ok(body.data)
    }

    /// Delete the logged-in account, returning it as it was.
    pub async fn delete_user(&self, id: Uuid) -> ClientResult<Account> {
        let body: Envelope<Account> = self.delete_json(&format!("/users/{id}")).await?;
        Ok(body.data)
    }

    // -----------------------------------------------------------------------
    // Listings
    // -----------------------------------------------------------------------

    pub async fn list_listings(&self) -> ClientResult<Vec<Listing>> {
        self.get_json("/listings").await
    }

    pub async fn get_listing(&self, id: Uuid) -> ClientResult<Listing> {
        self.get_json(&format!("/listings/{id}")).await
    }

    pub async fn create_listing(&self, draft: &ListingDraft) -> ClientResult<Listing> {
        let body: ListingBody = self.post_json("/listings", draft).await?;
        Ok(body.listing)
    }

    pub async fn update_listing(&self, id: Uuid, changes: &ListingDraft) -> ClientResult<Listing> {
        let body: ListingBody = self.put_json(&format!("/listings/{id}"), changes).await?;
        Ok(body.listing)
    }

    pub async fn delete_listing(&self, id: Uuid) -> ClientResult<Listing> {
        let body: ListingBody = self.delete_json(&format!("/listings/{id}")).await?;
        Ok(body.listing)
    }
}

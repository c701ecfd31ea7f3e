//! Token-managed Helix client.
//!
//! The client owns the application access token: it is acquired lazily on
//! first use, reused until its bookkept expiry, and re-acquired at most
//! once per request when the API rejects it anyway (a stale-token race
//! local bookkeeping cannot see).

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{DataEnvelope, Stream, StreamSnapshot, TokenResponse, User};

/// Production OAuth2 base (credential grant endpoint).
const DEFAULT_AUTH_BASE: &str = "https://id.twitch.tv";
/// Production Helix API base.
const DEFAULT_API_BASE: &str = "https://api.twitch.tv";

/// Upper bound on any single outbound call so a hung request cannot stall
/// future poll cycles.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Seconds subtracted from the reported token lifetime when judging
/// expiry, absorbing clock skew against the id service.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// A cached application access token with its absolute expiry.
#[derive(Debug, Clone)]
struct AppToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl AppToken {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(EXPIRY_MARGIN_SECS) >= self.expires_at
    }
}

/// Outcome of a single authenticated attempt against the API.
enum Attempt<T> {
    Success(T),
    /// The API returned 401 despite local expiry bookkeeping.
    TokenRejected,
}

/// Twitch Helix API client with token lifecycle management.
pub struct HelixClient {
    client: Client,
    client_id: String,
    client_secret: String,
    auth_base: String,
    api_base: String,
    /// Cached token, replaced atomically on refresh. The lock is never
    /// held across an await point.
    token: Mutex<Option<AppToken>>,
}

impl HelixClient {
    /// Create a client against the production endpoints.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self::with_base_urls(client_id, client_secret, DEFAULT_AUTH_BASE, DEFAULT_API_BASE)
    }

    /// Create a client against custom endpoints (used by tests to point
    /// at an in-process fake server).
    pub fn with_base_urls(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        auth_base: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_base: auth_base.into(),
            api_base: api_base.into(),
            token: Mutex::new(None),
        }
    }

    /// Exchange the client id/secret for a fresh application token.
    ///
    /// A rejected exchange is an auth failure; no retry happens here.
    async fn fetch_token(&self) -> Result<AppToken> {
        let url = format!("{}/oauth2/token", self.auth_base);
        let response = self
            .client
            .post(&url)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "credential grant rejected");
            return Err(Error::Auth(format!(
                "credential grant rejected ({status}): {body}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        let expires_at = Utc::now() + chrono::Duration::seconds(token.expires_in);
        debug!(expires_at = %expires_at, "obtained app access token");

        Ok(AppToken {
            access_token: token.access_token,
            expires_at,
        })
    }

    /// Return the cached token, acquiring a fresh one if absent or past
    /// its bookkept expiry. Safe to call before every outbound request;
    /// repeated calls before expiry issue no further exchanges.
    async fn ensure_valid_token(&self) -> Result<String> {
        let now = Utc::now();
        if let Some(token) = self.token.lock().as_ref()
            && !token.is_expired(now)
        {
            return Ok(token.access_token.clone());
        }

        let fresh = self.fetch_token().await?;
        let access_token = fresh.access_token.clone();
        *self.token.lock() = Some(fresh);
        Ok(access_token)
    }

    fn invalidate_token(&self) {
        *self.token.lock() = None;
    }

    /// Issue one authenticated GET and classify the result.
    async fn attempt<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        token: &str,
    ) -> Result<Attempt<T>> {
        let url = format!("{}{}", self.api_base, path);
        let response = self
            .client
            .get(&url)
            .header("Client-Id", &self.client_id)
            .bearer_auth(token)
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Ok(Attempt::TokenRejected);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(Attempt::Success(response.json().await?))
    }

    /// Authenticated GET with a bounded token-refresh retry.
    ///
    /// Two attempts total: if the first is rejected with 401, the cached
    /// token is dropped, re-acquired once, and the request repeated. A
    /// second rejection propagates as an auth error.
    async fn request<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T> {
        let token = self.ensure_valid_token().await?;
        match self.attempt(path, params, &token).await? {
            Attempt::Success(value) => Ok(value),
            Attempt::TokenRejected => {
                debug!(path, "token rejected, re-acquiring and retrying once");
                self.invalidate_token();
                let token = self.ensure_valid_token().await?;
                match self.attempt(path, params, &token).await? {
                    Attempt::Success(value) => Ok(value),
                    Attempt::TokenRejected => {
                        Err(Error::Auth("token rejected after refresh".to_string()))
                    }
                }
            }
        }
    }

    /// Look up a user by login name. An unknown login is `Ok(None)`.
    pub async fn get_user(&self, login: &str) -> Result<Option<User>> {
        let envelope: DataEnvelope<User> =
            self.request("/helix/users", &[("login", login)]).await?;
        Ok(envelope.data.into_iter().next())
    }

    /// Look up the current live stream for a channel.
    ///
    /// Resolves the user first and short-circuits to `Ok(None)` when the
    /// login does not exist, without touching the streams endpoint. When
    /// live, the user's profile image is merged into the snapshot; the
    /// streams payload alone does not carry it.
    pub async fn get_stream(&self, login: &str) -> Result<Option<StreamSnapshot>> {
        let Some(user) = self.get_user(login).await? else {
            debug!(login, "user not found, skipping stream lookup");
            return Ok(None);
        };

        let envelope: DataEnvelope<Stream> = self
            .request("/helix/streams", &[("user_login", login)])
            .await?;

        let Some(stream) = envelope.data.into_iter().next() else {
            return Ok(None);
        };
        if !stream.is_live() {
            return Ok(None);
        }

        Ok(Some(StreamSnapshot::from_stream(
            stream,
            user.profile_image_url,
        )))
    }
}

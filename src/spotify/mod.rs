//! # Spotify Integration Module
//!
//! This module is the integration layer between spotback and the Spotify Web
//! API. It handles HTTP communication, authentication and the classification
//! of failed requests, and exposes every library collection as a
//! [`pager::PageSource`] so the backup pipeline never deals with raw HTTP.
//!
//! ## Architecture
//!
//! ```text
//! Backup Orchestrator
//!          ↓
//! Paginator (retry, rate limit, cancellation)
//!          ↓
//! SpotifyApi (bearer token, status classification)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//!          ↓
//! Spotify Web API
//! ```
//!
//! ## Core Modules
//!
//! - [`auth`] - OAuth 2.0 PKCE flow, token exchange and refresh
//! - [`pager`] - Cursor-following paginator, retry policy and shared
//!   rate-limit gate
//!
//! ## Error Classification
//!
//! Every response is mapped to a [`FetchError`] before it reaches the retry
//! loop:
//! - **429 Too Many Requests** - `RateLimited`, with the `Retry-After` header
//! - **401 / 403** - `Unauthorized`, fatal for the run
//! - **404** - `NotFound`, e.g. a playlist deleted while the backup runs
//! - **5xx and network errors** - `Transient`, retried with backoff
//! - **Other 4xx** - `Rejected`, not retried
//!
//! ## Endpoints
//!
//! - `GET /me` - The authenticated user
//! - `GET /me/tracks`, `/me/albums`, `/me/episodes`, `/me/shows` - Saved items
//! - `GET /me/following?type=artist` - Followed artists (nested under `artists`)
//! - `GET /me/playlists` - Owned and followed playlists
//! - `GET /playlists/{id}/tracks` - Playlist track listings
//!
//! ## Token Handling
//!
//! [`SpotifyApi`] asks its [`Credentials`] for a bearer token before every
//! request. Managed credentials refresh the token through the
//! [`TokenManager`] shortly before it expires, so a long backup keeps working
//! after the first hour.

pub mod auth;
pub mod pager;

use std::time::Duration;

use reqwest::{Client, StatusCode, header::RETRY_AFTER};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    error::{BackupError, FetchError},
    management::TokenManager,
    types::CurrentUser,
};

use pager::{Cursor, Page, PageSource, PagerContext, with_retry};

/// Source of the bearer token sent with every request.
pub enum Credentials {
    /// A fixed access token.
    Static(String),
    /// A persisted token that is refreshed when it expires.
    Managed(Mutex<TokenManager>),
}

impl Credentials {
    pub fn managed(token_mgr: TokenManager) -> Self {
        Credentials::Managed(Mutex::new(token_mgr))
    }

    async fn bearer(&self) -> String {
        match self {
            Credentials::Static(token) => token.clone(),
            Credentials::Managed(mgr) => mgr.lock().await.get_valid_token().await,
        }
    }
}

/// Authenticated client for the Spotify Web API.
pub struct SpotifyApi {
    http: Client,
    base_url: String,
    credentials: Credentials,
}

impl SpotifyApi {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        SpotifyApi {
            http: Client::new(),
            base_url: base_url.into(),
            credentials,
        }
    }

    /// Resolves an endpoint path against the API base URL.
    ///
    /// Absolute URLs (such as `next` links and playlist `href`s) are kept
    /// as they are.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Sends one GET request and classifies the outcome.
    pub async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let token = self.credentials.bearer().await;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(FetchError::RateLimited { retry_after });
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if status.is_server_error() {
            return Err(FetchError::Transient(format!("server error (HTTP {status})")));
        }
        if !status.is_success() {
            return Err(FetchError::Rejected {
                status: status.as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))
    }

    /// Loads the profile of the authenticated user.
    pub async fn current_user(&self, ctx: &PagerContext) -> Result<CurrentUser, BackupError> {
        let url = self.url("me");
        let cursor = Cursor::Next(url.clone());
        let body = with_retry(ctx, &cursor, || self.get_json(&url)).await?;

        serde_json::from_value::<CurrentUser>(body).map_err(|e| BackupError::FetchFailed {
            cursor,
            reason: format!("unexpected user profile: {e}"),
        })
    }

    /// A paged collection starting at `path` with the given page size.
    pub fn collection(&self, path: &str, limit: u32) -> Collection<'_> {
        let url = self.url(path);
        let separator = if url.contains('?') { '&' } else { '?' };
        Collection {
            api: self,
            first: format!("{url}{separator}limit={limit}"),
            envelope: None,
        }
    }
}

/// A paged endpoint of the Spotify API.
pub struct Collection<'a> {
    api: &'a SpotifyApi,
    first: String,
    envelope: Option<&'static str>,
}

impl Collection<'_> {
    /// Reads the paging object from under `key` instead of the body root.
    pub fn nested_in(mut self, key: &'static str) -> Self {
        self.envelope = Some(key);
        self
    }
}

impl PageSource for Collection<'_> {
    async fn fetch(&self, cursor: &Cursor) -> Result<Page, FetchError> {
        let url = match cursor {
            Cursor::First => self.first.as_str(),
            Cursor::Next(url) => url.as_str(),
        };
        let body = self.api.get_json(url).await?;
        Page::from_json(body, self.envelope)
    }
}

//! # Spotify Integration Module
//!
//! This module provides the interface to the Spotify Web API used by Sporlyze. It
//! implements the OAuth 2.0 authorization-code flow, retrieval of the user's
//! listening data and the few library mutations needed by the upload proxy. It
//! is the only place that talks HTTP to Spotify.
//!
//! ## Architecture
//!
//! ```text
//! HTTP handlers (api)
//!          ↓
//! SpotifyClient
//!     ├── Authentication (code exchange, refresh, profile validation)
//!     ├── Listening Data (top tracks/artists, recently played, audio features)
//!     └── Library Operations (playlists, search, liked songs)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//!          ↓
//! Spotify Web API
//! ```
//!
//! ## Core Modules
//!
//! - [`auth`] - authorize URL construction, token exchange and refresh, and
//!   token validation through the current-user profile endpoint
//! - [`tracks`] - top tracks, top artists, recently played, batched audio
//!   features and catalog search
//! - [`playlist`] - playlist listing with pagination, adding tracks to a
//!   playlist and saving tracks to the user's liked songs
//!
//! ## Authentication Strategy
//!
//! The backend never stores tokens. Every resource call receives the caller's
//! access token and sends it as `Authorization: Bearer <token>`. Token validity
//! is never checked locally: Spotify answering 401 is the only signal, and it is
//! surfaced to the caller as [`ApiError::Unauthorized`].
//!
//! The token endpoint is authenticated with HTTP basic auth built from the
//! client ID and client secret.
//!
//! ## Error Handling Philosophy
//!
//! - **401 Unauthorized** becomes [`ApiError::Unauthorized`]
//! - **Other non-2xx statuses** become [`ApiError::ExternalApi`] with the
//!   upstream status and Spotify's short error message (or the reason phrase)
//! - **Raw upstream bodies** are logged with [`crate::warning!`] and never
//!   forwarded to callers
//! - **No retries**: a failed call is reported immediately
//!
//! ## Configuration Integration
//!
//! Endpoints, client credentials, redirect URI and scopes all come from
//! [`Config`]. Pointing `api_url` and `token_url` at a local server is how the
//! integration tests exercise this module.

pub mod auth;
pub mod playlist;
pub mod tracks;

use std::fmt;

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{config::Config, error::ApiError, warning};

/// Maximum number of items Spotify returns per page on the listening endpoints.
pub const MAX_PAGE_LIMIT: u32 = 50;

/// Longest upstream error message forwarded to callers.
const MAX_DETAIL_LEN: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    ShortTerm,
    #[default]
    MediumTerm,
    LongTerm,
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        };
        f.write_str(value)
    }
}

/// Client for the Spotify accounts service and Web API.
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    http: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scope: String,
    auth_url: String,
    token_url: String,
    api_url: String,
}

impl SpotifyClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::new(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scope: config.scope.clone(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Limits a caller-provided page size to what Spotify accepts.
pub fn clamp_limit(limit: Option<u32>, default: u32) -> u32 {
    limit.unwrap_or(default).clamp(1, MAX_PAGE_LIMIT)
}

/// Maps non-success responses to [`ApiError`].
///
/// The raw body is logged; only Spotify's short error message travels on.
pub(crate) async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    warning!("Spotify API error ({}) on {}: {}", status, url, body);

    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized(
            "Spotify rejected the access token".to_string(),
        ));
    }

    Err(ApiError::ExternalApi {
        status: status.as_u16(),
        detail: upstream_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("upstream request failed")
                .to_string()
        }),
    })
}

/// Extracts the human readable part of a Spotify error body.
///
/// Web API errors look like `{"error": {"status": 400, "message": "..."}}`,
/// accounts service errors like `{"error": "invalid_grant", "error_description": "..."}`.
pub fn upstream_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    let message = json["error"]["message"]
        .as_str()
        .or_else(|| json["error_description"].as_str())
        .or_else(|| json["error"].as_str())?;

    let mut message: String = message.chars().take(MAX_DETAIL_LEN).collect();
    if message.trim().is_empty() {
        return None;
    }
    message.truncate(message.trim_end().len());
    Some(message)
}

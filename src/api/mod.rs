//! # API Module
//!
//! This module provides the HTTP endpoints of the Sporlyze backend. Handlers are
//! thin: they extract and validate request data, call into [`crate::spotify`],
//! [`crate::fetcher`], [`crate::session`] or [`crate::upload`], and serialize
//! the result. Every failure is an [`ApiError`] and renders as a structured JSON
//! error body.
//!
//! ## Endpoints
//!
//! ### Authentication
//!
//! - `GET /spotify/login` - [`login`] redirects to Spotify's consent page
//! - `GET /spotify/callback` - [`callback`] exchanges the code for tokens
//! - `POST /spotify/refresh` - [`refresh`] renews an access token
//! - `GET /auth/me` - [`me`] returns the validated user profile
//!
//! ### Listening Data
//!
//! - `GET /analysis/top-tracks`, `/analysis/top-artists`, `/analysis/recently-played`
//! - `GET /analysis/audio-features?ids=...`
//! - `GET /user/top-tracks`, `/user/recently-played` - tracks merged with features
//!
//! ### Recommendations
//!
//! - `POST /recommendations/train` - [`train`] fits the caller's model
//! - `GET /recommendations` - [`recommendations`] for one or more seed tracks
//! - `GET /recommendations/similar-tracks` - [`similar_tracks`]
//! - `GET /recommendations/{track_id}` - [`track_recommendations`]
//! - `DELETE /recommendations/model` - [`clear_model`]
//!
//! ### Upload
//!
//! - `GET /upload/playlists` - [`playlists`]
//! - `POST /upload/upload` - [`upload`] (multipart form)
//!
//! ### Monitoring
//!
//! - `GET /` - [`root`], `GET /health` - [`health`]
//!
//! ## Authentication
//!
//! Endpoints that only forward to Spotify take a [`BearerToken`]. Endpoints that
//! need to know who is calling (anything touching a recommendation model) take a
//! [`CurrentUser`], which validates the token against Spotify's profile endpoint
//! and keys the model store by the Spotify user id.

mod analysis;
mod auth;
mod health;
mod recommendations;
mod upload;

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use serde::de::DeserializeOwned;

use crate::{
    config::Config, error::ApiError, session::ModelStore, spotify::SpotifyClient,
    types::UserProfile,
};

pub use analysis::{
    audio_features, recently_played, top_artists, top_tracks, user_recently_played,
    user_top_tracks,
};
pub use auth::{callback, login, me, refresh};
pub use health::{health, root};
pub use recommendations::{
    clear_model, recommendations, similar_tracks, track_recommendations, train,
};
pub use upload::{MAX_UPLOAD_BYTES, playlists, upload};

/// Shared state of all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub spotify: SpotifyClient,
    pub models: ModelStore,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let spotify = SpotifyClient::new(&config);
        Self {
            config: Arc::new(config),
            spotify,
            models: ModelStore::new(),
        }
    }
}

/// Access token taken from an `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
            return Err(ApiError::Unauthorized(
                "No authorization header provided".to_string(),
            ));
        };

        let value = value.to_str().map_err(|_| {
            ApiError::Unauthorized("Invalid authorization header format".to_string())
        })?;

        match value.split_once(' ') {
            Some((scheme, token))
                if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() =>
            {
                Ok(BearerToken(token.trim().to_string()))
            }
            _ => Err(ApiError::Unauthorized(
                "Invalid authorization header format".to_string(),
            )),
        }
    }
}

/// A bearer token that Spotify accepted, with the profile it belongs to.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub token: String,
    pub profile: UserProfile,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let profile = match state.spotify.current_user(&token).await {
            Ok(profile) => profile,
            Err(ApiError::Unauthorized(_)) => {
                return Err(ApiError::Unauthorized(
                    "Could not validate credentials".to_string(),
                ));
            }
            Err(e) => return Err(e),
        };
        Ok(CurrentUser { token, profile })
    }
}

/// Parses an optional JSON body; an empty body yields `T::default()`.
pub(crate) fn parse_optional_json<T>(body: &Bytes) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::InvalidInput(format!("invalid JSON body: {}", e)))
}

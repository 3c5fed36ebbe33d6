//! Configuration management for the Sporlyze backend.
//!
//! This module handles loading and accessing configuration values from environment
//! variables and `.env` files. Configuration is read once at startup into a
//! [`Config`] value which is then shared with every request handler through the
//! application state.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. `.env` file in the working directory
//! 4. Application defaults (where applicable)

use std::{env, net::SocketAddr, path::PathBuf};

use thiserror::Error;

pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SERVER_ADDRESS: &str = "0.0.0.0:8000";
pub const DEFAULT_FRONTEND_ORIGIN: &str = "http://127.0.0.1:5173";

/// Scopes requested during login.
///
/// Covers profile, listening history and playlist reads, plus the playlist and
/// library writes needed by the upload proxy.
pub const DEFAULT_SCOPES: &[&str] = &[
    "user-read-private",
    "user-read-email",
    "user-read-recently-played",
    "user-top-read",
    "user-read-currently-playing",
    "user-read-playback-state",
    "playlist-read-private",
    "playlist-read-collaborative",
    "playlist-modify-public",
    "playlist-modify-private",
    "user-library-modify",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Runtime configuration of the backend.
///
/// Fields are public; a `Config` can be built without the process environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    pub scope: String,
    pub server_address: SocketAddr,
    pub frontend_origin: String,
    pub upload_dir: PathBuf,
}

impl Config {
    /// Builds the configuration from environment variables.
    ///
    /// # Required Variables
    ///
    /// - `SPOTIFY_CLIENT_ID` - client ID of the registered Spotify application
    /// - `SPOTIFY_CLIENT_SECRET` - client secret used for the token endpoint
    /// - `SPOTIFY_REDIRECT_URI` - callback URL registered with Spotify
    ///
    /// # Optional Variables
    ///
    /// - `SPOTIFY_API_AUTH_URL`, `SPOTIFY_API_TOKEN_URL`, `SPOTIFY_API_URL` -
    ///   Spotify endpoints, defaulting to the public ones
    /// - `SPOTIFY_API_AUTH_SCOPE` - space separated scopes, defaults to [`DEFAULT_SCOPES`]
    /// - `SERVER_ADDRESS` - bind address, defaults to `0.0.0.0:8000`
    /// - `FRONTEND_ORIGIN` - origin allowed by CORS
    /// - `UPLOAD_DIR` - directory for temporary upload files
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for an unset required variable and
    /// [`ConfigError::Invalid`] if `SERVER_ADDRESS` is not a socket address.
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_address = optional("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS);
        let server_address =
            server_address
                .parse::<SocketAddr>()
                .map_err(|e| ConfigError::Invalid {
                    name: "SERVER_ADDRESS",
                    reason: e.to_string(),
                })?;

        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_upload_dir());

        Ok(Self {
            client_id: required("SPOTIFY_CLIENT_ID")?,
            client_secret: required("SPOTIFY_CLIENT_SECRET")?,
            redirect_uri: required("SPOTIFY_REDIRECT_URI")?,
            auth_url: optional("SPOTIFY_API_AUTH_URL", DEFAULT_AUTH_URL),
            token_url: optional("SPOTIFY_API_TOKEN_URL", DEFAULT_TOKEN_URL),
            api_url: optional("SPOTIFY_API_URL", DEFAULT_API_URL),
            scope: optional("SPOTIFY_API_AUTH_SCOPE", &DEFAULT_SCOPES.join(" ")),
            server_address,
            frontend_origin: optional("FRONTEND_ORIGIN", DEFAULT_FRONTEND_ORIGIN),
            upload_dir,
        })
    }
}

/// Loads environment variables from `.env` files.
///
/// Looks for `sporlyze/.env` in the platform-specific local data directory
/// first and falls back to a `.env` in the current working directory. Neither
/// file is mandatory: variables may come straight from the process
/// environment, which always takes precedence over file values.
///
/// # Directory Structure
///
/// - Linux: `~/.local/share/sporlyze/.env`
/// - macOS: `~/Library/Application Support/sporlyze/.env`
/// - Windows: `%LOCALAPPDATA%/sporlyze/.env`
///
/// # Errors
///
/// Returns an error string if the data directory cannot be created or an
/// existing `.env` file cannot be parsed.
pub async fn load_env() -> Result<(), String> {
    let path = env_file_path();
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| format!("{}: {}", path.display(), e))?;
        return Ok(());
    }

    match dotenv::dotenv() {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

/// Returns the location of the `.env` file inside the local data directory.
pub fn env_file_path() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("sporlyze/.env");
    path
}

fn default_upload_dir() -> PathBuf {
    env::temp_dir().join("sporlyze-uploads")
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn optional(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

//! Sporlyze Library
//!
//! This library provides the building blocks of the Sporlyze backend: a thin
//! HTTP layer in front of the Spotify Web API that authenticates users,
//! collects their listening data, attaches audio features to tracks and
//! recommends similar tracks by clustering audio-feature vectors.
//!
//! # Modules
//!
//! - `api` - HTTP handlers and request extractors for the inbound API
//! - `config` - Configuration management and environment variables
//! - `error` - Error taxonomy and its HTTP representation
//! - `fetcher` - Batched audio-feature retrieval and track merging
//! - `recommend` - Feature scaling, k-means clustering and similarity ranking
//! - `server` - Router construction and the HTTP server loop
//! - `session` - Per-user storage of fitted recommendation models
//! - `spotify` - Spotify Web API client implementation
//! - `types` - Data structures and type definitions
//! - `upload` - Upload proxy that matches files to catalog tracks
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```
//! use sporlyze::{config, server};
//!
//! #[tokio::main]
//! async fn main() -> sporlyze::Res<()> {
//!     config::load_env().await?;
//!     let config = config::Config::from_env()?;
//!     server::start_api_server(config).await
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod recommend;
pub mod server;
pub mod session;
pub mod spotify;
pub mod types;
pub mod upload;
pub mod utils;

/// A convenient Result type alias for top-level plumbing that may fail.
///
/// Used where errors of unrelated kinds meet (configuration, socket binding,
/// serving) and only need to be reported, not matched on. Request handling
/// uses the typed [`error::ApiError`] instead.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// Used for request-level information such as which upstream calls are made
/// and how many records came back.
///
/// # Example
///
/// ```
/// info!("Listening on {}", addr);
/// info!("Fetched {} top tracks", tracks.len());
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Model trained for user {}", user_id);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only meant for fatal startup failures in the binary. Request handlers must
/// never call it; they return an [`error::ApiError`] instead.
///
/// # Example
///
/// ```
/// error!("Cannot load configuration. Err: {}", e);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Used for recoverable problems: skipped feature batches, failed upload
/// steps, upstream errors that are reported to the caller.
///
/// # Example
///
/// ```
/// warning!("Feature batch {} failed: {}", index, e);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}

//! Spotify Library Backup Library
//!
//! This library exports a Spotify library (liked tracks, saved albums, followed
//! artists, playlists and podcasts) into a fixed tree of CSV files and can
//! upload the finished tree to an object store.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints for the local OAuth callback server
//! - `backup` - Backup orchestration, normalization, playlist fan-out and CSV output
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `error` - Error taxonomy shared by the backup pipeline
//! - `management` - Token persistence and refresh
//! - `server` - Local HTTP server for OAuth callbacks
//! - `spotify` - Spotify Web API client and paginator
//! - `types` - Data structures and type definitions
//! - `upload` - Object store upload of a finished backup tree
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```
//! use spotback::{config, cli};
//!
//! #[tokio::main]
//! async fn main() -> spotback::Res<()> {
//!     config::load_env().await?;
//!     // Use CLI functions...
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod server;
pub mod spotify;
pub mod types;
pub mod upload;
pub mod utils;

/// A convenient Result type alias for operations that may fail.
///
/// Used by the authentication flow and the CLI layer, where errors are only
/// reported to the user. The backup pipeline itself returns
/// [`error::BackupError`].
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Loading liked tracks...");
/// info!("Found {} playlists", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only the CLI layer uses this macro. Library code returns errors so that a
/// failing section never takes the whole backup down with it.
///
/// # Example
///
/// ```
/// error!("Failed to load token. Please run spotback auth");
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
/// # Example
///
/// ```
/// warning!("Playlist {} is no longer available, skipping", name);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}

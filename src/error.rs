//! Error types for the backup pipeline.

use std::{io, path::PathBuf, sync::Arc, time::Duration};

use thiserror::Error;

use crate::spotify::pager::Cursor;

/// Main error type for all backup operations.
#[derive(Debug, Clone, Error)]
pub enum BackupError {
    /// Spotify rejected the credentials. Fatal for the whole run.
    #[error("Spotify rejected the access token (HTTP {status}). Please run spotback auth")]
    Auth { status: u16 },

    /// A page could not be fetched after all retries.
    #[error("Fetch failed at {cursor}: {reason}")]
    FetchFailed { cursor: Cursor, reason: String },

    /// The resource no longer exists (e.g. a playlist deleted mid-run).
    #[error("Resource unavailable at {cursor}")]
    Unavailable { cursor: Cursor },

    /// A CSV file could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    /// An object of the backup tree could not be uploaded.
    #[error("Upload failed for {key}: {reason}")]
    Upload { key: String, reason: String },

    /// The run was interrupted by the user.
    #[error("Backup cancelled")]
    Cancelled,

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BackupError {
    /// Returns true for errors that must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BackupError::Auth { .. })
    }

    /// Returns true for errors that must stop the current section even when
    /// they happen while processing a single playlist.
    pub fn stops_section(&self) -> bool {
        matches!(self, BackupError::Auth { .. } | BackupError::Cancelled)
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BackupError::Write {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

/// Transport-level classification of a failed API request.
///
/// Produced by the HTTP client and consumed by the paginator's retry loop,
/// which turns it into a [`BackupError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// HTTP 429 with the optional `Retry-After` interval.
    #[error("rate limited{}", wait_suffix(.retry_after))]
    RateLimited { retry_after: Option<Duration> },
    /// HTTP 401 or 403.
    #[error("unauthorized (HTTP {status})")]
    Unauthorized { status: u16 },
    /// HTTP 404.
    #[error("not found")]
    NotFound,
    /// Any other 4xx, not worth retrying.
    #[error("request rejected (HTTP {status})")]
    Rejected { status: u16 },
    /// Network failure or 5xx.
    #[error("{0}")]
    Transient(String),
    /// The body was not the expected JSON shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

fn wait_suffix(retry_after: &Option<Duration>) -> String {
    retry_after
        .map(|wait| format!(" for {}s", wait.as_secs()))
        .unwrap_or_default()
}

//! # CLI Module
//!
//! User-facing commands. Each command loads what it needs (token, config),
//! calls into the library and reports the outcome with the colored output
//! macros. This is the only layer that exits the process on errors.
//!
//! ## Commands
//!
//! - [`auth`] - Authorize with Spotify through the OAuth 2.0 PKCE flow
//! - [`backup`] - Export the library into a CSV tree, optionally uploading it
//! - [`upload`] - Upload an existing backup tree to an object store
//!
//! ## Usage
//!
//! ```bash
//! spotback auth
//! spotback backup --output ~/spotify-backup
//! spotback backup --bucket backups --prefix spotify/2026-10-19
//! spotback upload --bucket backups --output ~/spotify-backup
//! ```

mod auth;
mod backup;
mod upload;

pub use auth::auth;
pub use backup::{BackupArgs, backup};
pub use upload::{UploadArgs, upload};

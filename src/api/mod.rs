//! # API Module
//!
//! HTTP endpoints of the short-lived local server that receives Spotify's
//! OAuth redirect during `spotback auth`.
//!
//! ## Endpoints
//!
//! - [`callback`] - Completes the PKCE flow by exchanging the authorization
//!   code for an access token and handing it to the waiting auth command.
//! - [`health`] - Reports status and version, handy to check that the
//!   redirect URI points at the right address.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use spotback::api::{callback, health};
//!
//! let app = Router::new()
//!     .route("/callback", get(callback))
//!     .route("/health", get(health));
//! ```

mod callback;
mod health;

pub use callback::callback;
pub use health::health;

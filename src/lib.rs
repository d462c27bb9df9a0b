//! Session-cookie authentication.
//!
//! Validates a browser session against a remote service by presenting a
//! stored session cookie, honoring a courtesy wait before each request, and
//! persisting rotated cookies back to where they came from.
//!
//! # Architecture
//!
//! - [`cookie`] - Opaque, redacted cookie value plus Netscape file import
//! - [`store`] - [`CookieStore`] trait and its memory/static/file/encrypted variants
//! - [`config`] - Validated [`SessionConfig`] and the JSON settings file
//! - [`context`] - Cancellation and deadline scope for a call
//! - [`check`] - The remote session check ([`SessionCheck`], [`HttpSessionCheck`])
//! - [`auth`] - The [`Authenticator`] state machine and retry policy
//!
//! # Example
//!
//! ```no_run
//! use session_auth::{AuthContext, Authenticator, HttpSessionCheck, MemoryCookieStore, SessionConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig::builder()
//!     .cookie_store_owned(MemoryCookieStore::new("__client=..."))
//!     .build()?;
//! let check = HttpSessionCheck::new("https://clerk.example.com/v1/client")?;
//! let authenticator = Authenticator::new(config, check);
//! authenticator.auth(&AuthContext::new()).await?;
//! # Ok(())
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod check;
pub mod config;
pub mod context;
pub mod cookie;
pub mod store;
mod user_agent;

// Re-export commonly used types
pub use auth::{AuthError, AuthErrorKind, AuthResult, AuthState, Authenticator};
pub use check::{CheckError, CheckOutcome, HttpSessionCheck, SessionCheck};
pub use config::{ConfigError, SessionConfig, SessionConfigBuilder, SessionSettings};
pub use context::{AuthContext, Interrupted};
pub use cookie::Cookie;
pub use store::{
    CookieStore, EncryptedFileCookieStore, FileCookieStore, MemoryCookieStore, RotationPolicy,
    StaticCookieStore, StoreError,
};

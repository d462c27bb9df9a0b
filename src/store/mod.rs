//! Pluggable persistence for the session cookie.
//!
//! A [`CookieStore`] only holds the current credential; it owns no knowledge
//! of what the cookie means. Several authenticators may share one store, so
//! every implementation is `Send + Sync` and makes each individual operation
//! atomic.
//!
//! Provided variants:
//! - [`MemoryCookieStore`] - process lifetime only
//! - [`FileCookieStore`] - one cookie per file, stored verbatim
//! - [`EncryptedFileCookieStore`] - encrypted at rest, key from env or keychain
//! - [`StaticCookieStore`] - fixed cookie with an explicit [`RotationPolicy`]

mod encrypted;
mod file;
mod memory;
mod static_store;

use std::error::Error as StdError;

use async_trait::async_trait;

use crate::context::{AuthContext, Interrupted};
use crate::cookie::Cookie;

pub use encrypted::{EncryptedFileCookieStore, EncryptionError, MASTER_KEY_ENV, default_encrypted_path};
pub use file::FileCookieStore;
pub use memory::MemoryCookieStore;
pub use static_store::{RotationPolicy, StaticCookieStore};

/// Errors returned by cookie store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store holds no cookie.
    #[error("{store} cookie store holds no cookie")]
    Empty {
        /// Store variant name.
        store: &'static str,
    },

    /// The backing medium could not be read or written.
    #[error("{store} cookie store unavailable: {source}")]
    Unavailable {
        /// Store variant name.
        store: &'static str,
        /// The underlying failure.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The store does not accept replacement cookies.
    #[error("{store} cookie store is read-only")]
    ReadOnly {
        /// Store variant name.
        store: &'static str,
    },

    /// The caller context ended before the store resolved.
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

impl StoreError {
    /// Creates an unavailable error wrapping the backing failure.
    pub fn unavailable(
        store: &'static str,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self::Unavailable {
            store,
            source: source.into(),
        }
    }
}

/// Holder of the current session cookie.
///
/// Implementations must honor `ctx`: when the context ends before the cookie
/// is resolved, return [`StoreError::Interrupted`].
#[async_trait]
pub trait CookieStore: Send + Sync {
    /// Returns the current credential.
    ///
    /// # Errors
    ///
    /// [`StoreError::Empty`] when no cookie is held, [`StoreError::Unavailable`]
    /// when the backing medium cannot be read.
    async fn get_cookie(&self, ctx: &AuthContext) -> Result<Cookie, StoreError>;

    /// Persists a replacement credential after the remote service rotated it.
    ///
    /// # Errors
    ///
    /// [`StoreError::ReadOnly`] for stores rejecting rotation,
    /// [`StoreError::Unavailable`] when the write fails.
    async fn set_cookie(&self, ctx: &AuthContext, cookie: Cookie) -> Result<(), StoreError>;

    /// Short variant name used in logs and errors.
    fn name(&self) -> &'static str {
        "custom"
    }
}

/// Rejects blank cookies so every store reports them as [`StoreError::Empty`].
fn non_blank(store: &'static str, cookie: Cookie) -> Result<Cookie, StoreError> {
    if cookie.is_blank() {
        Err(StoreError::Empty { store })
    } else {
        Ok(cookie)
    }
}

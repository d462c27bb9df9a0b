//! In-memory cookie store.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tracing::debug;

use super::{CookieStore, StoreError, non_blank};
use crate::context::AuthContext;
use crate::cookie::Cookie;

const STORE_NAME: &str = "memory";

/// Process-lifetime cookie holder.
///
/// The lock is synchronous and never held across an `.await`.
#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    cookie: RwLock<Option<Cookie>>,
}

impl MemoryCookieStore {
    /// Creates a store holding `cookie`.
    #[must_use]
    pub fn new(cookie: impl Into<Cookie>) -> Self {
        Self {
            cookie: RwLock::new(Some(cookie.into())),
        }
    }

    /// Creates a store with no cookie; `get_cookie` fails until one is set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Discards the held cookie. Returns true if one was held.
    pub fn clear(&self) -> bool {
        self.cookie
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }
}

#[async_trait]
impl CookieStore for MemoryCookieStore {
    async fn get_cookie(&self, ctx: &AuthContext) -> Result<Cookie, StoreError> {
        if let Some(interrupted) = ctx.err() {
            return Err(interrupted.into());
        }
        let held = self
            .cookie
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        held.ok_or(StoreError::Empty { store: STORE_NAME })
            .and_then(|cookie| non_blank(STORE_NAME, cookie))
    }

    async fn set_cookie(&self, ctx: &AuthContext, cookie: Cookie) -> Result<(), StoreError> {
        if let Some(interrupted) = ctx.err() {
            return Err(interrupted.into());
        }
        debug!(pairs = cookie.pair_count(), "replacing in-memory cookie");
        *self.cookie.write().unwrap_or_else(PoisonError::into_inner) = Some(cookie);
        Ok(())
    }

    fn name(&self) -> &'static str {
        STORE_NAME
    }
}

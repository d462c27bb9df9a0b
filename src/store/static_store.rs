//! Fixed, read-only cookie store.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{CookieStore, StoreError, non_blank};
use crate::context::AuthContext;
use crate::cookie::Cookie;

const STORE_NAME: &str = "static";

/// What a [`StaticCookieStore`] does when asked to persist a rotated cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationPolicy {
    /// Accept and discard the rotation, logging at debug level.
    Ignore,
    /// Accept and discard the rotation, logging a warning.
    Warn,
    /// Fail the write with [`StoreError::ReadOnly`].
    #[default]
    Reject,
}

/// A cookie supplied once at construction and never replaced.
///
/// The held cookie never changes; [`RotationPolicy`] only decides how a
/// rotation attempt is reported. A discarded rotation does not survive past
/// the current call, so the next `get_cookie` returns the original value.
#[derive(Debug, Clone)]
pub struct StaticCookieStore {
    cookie: Cookie,
    policy: RotationPolicy,
}

impl StaticCookieStore {
    /// Creates a store that rejects rotation.
    #[must_use]
    pub fn new(cookie: impl Into<Cookie>) -> Self {
        Self::with_policy(cookie, RotationPolicy::default())
    }

    /// Creates a store with an explicit rotation policy.
    #[must_use]
    pub fn with_policy(cookie: impl Into<Cookie>, policy: RotationPolicy) -> Self {
        Self {
            cookie: cookie.into(),
            policy,
        }
    }

    /// The configured rotation policy.
    #[must_use]
    pub fn policy(&self) -> RotationPolicy {
        self.policy
    }
}

#[async_trait]
impl CookieStore for StaticCookieStore {
    async fn get_cookie(&self, ctx: &AuthContext) -> Result<Cookie, StoreError> {
        if let Some(interrupted) = ctx.err() {
            return Err(interrupted.into());
        }
        non_blank(STORE_NAME, self.cookie.clone())
    }

    async fn set_cookie(&self, _ctx: &AuthContext, cookie: Cookie) -> Result<(), StoreError> {
        match self.policy {
            RotationPolicy::Ignore => {
                debug!(pairs = cookie.pair_count(), "static store ignoring rotated cookie");
                Ok(())
            }
            RotationPolicy::Warn => {
                warn!(
                    pairs = cookie.pair_count(),
                    "static store discarding rotated cookie; rotation will not survive this process"
                );
                Ok(())
            }
            RotationPolicy::Reject => Err(StoreError::ReadOnly { store: STORE_NAME }),
        }
    }

    fn name(&self) -> &'static str {
        STORE_NAME
    }
}

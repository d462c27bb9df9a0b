//! The remote session check.
//!
//! The target service is an opaque endpoint: it accepts the cookie as a
//! request header and answers with a validity signal, possibly rotating the
//! cookie. [`SessionCheck`] is the seam the authenticator calls through;
//! [`HttpSessionCheck`] is the reqwest-backed default.
//!
//! # Example
//!
//! ```no_run
//! use session_auth::check::{HttpSessionCheck, SessionCheck};
//! use session_auth::Cookie;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let check = HttpSessionCheck::new("https://clerk.example.com/v1/client")?
//!     .require_json_pointer("/response/last_active_session_id");
//! let outcome = check.check(&Cookie::new("__client=...")).await?;
//! println!("valid: {}", outcome.is_valid());
//! # Ok(())
//! # }
//! ```

pub mod constants;
mod error;
mod http;

use async_trait::async_trait;

use crate::cookie::Cookie;

pub use error::CheckError;
pub use http::{HttpSessionCheck, LOGIN_PATTERNS};

/// What the remote endpoint said about the presented cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The session is valid; `rotated` carries a replacement cookie if the
    /// service rotated session tokens.
    Valid {
        /// The replacement cookie, if any.
        rotated: Option<Cookie>,
    },
    /// The service rejected the session.
    Unauthenticated {
        /// HTTP status of the rejecting response.
        status: u16,
        /// Why the response was classified as unauthenticated.
        reason: String,
    },
}

impl CheckOutcome {
    /// A valid session with no rotation.
    #[must_use]
    pub fn valid() -> Self {
        Self::Valid { rotated: None }
    }

    /// A valid session that rotated to `cookie`.
    #[must_use]
    pub fn rotated(cookie: impl Into<Cookie>) -> Self {
        Self::Valid {
            rotated: Some(cookie.into()),
        }
    }

    /// A rejected session.
    #[must_use]
    pub fn unauthenticated(status: u16, reason: impl Into<String>) -> Self {
        Self::Unauthenticated {
            status,
            reason: reason.into(),
        }
    }

    /// Returns true for [`CheckOutcome::Valid`].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

/// One round trip to the remote endpoint carrying the cookie as a credential.
///
/// Implementations must not retry internally; retry policy belongs to the
/// authenticator. Dropping the returned future must abort the request.
#[async_trait]
pub trait SessionCheck: Send + Sync {
    /// Presents `cookie` to the remote endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError`] for transport-level failures. A rejected session
    /// is not an error; it is [`CheckOutcome::Unauthenticated`].
    async fn check(&self, cookie: &Cookie) -> Result<CheckOutcome, CheckError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_constructors() {
        assert_eq!(CheckOutcome::valid(), CheckOutcome::Valid { rotated: None });
        assert!(CheckOutcome::rotated("a=2").is_valid());
        assert!(!CheckOutcome::unauthenticated(401, "HTTP 401").is_valid());
    }

    #[test]
    fn test_outcome_debug_does_not_leak_rotated_cookie() {
        let debug = format!("{:?}", CheckOutcome::rotated("__client=rotated-secret"));
        assert!(!debug.contains("rotated-secret"));
    }
}

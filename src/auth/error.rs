//! Error taxonomy for authentication calls.

use thiserror::Error;

use crate::check::CheckError;
use crate::config::ConfigError;
use crate::context::Interrupted;
use crate::store::StoreError;

/// Coarse classification of an [`AuthError`], stable for matching by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// Construction-time validation failed.
    InvalidConfig,
    /// No cookie could be obtained from the store.
    CredentialUnavailable,
    /// The remote rejected the session.
    Unauthenticated,
    /// Network or IO failure talking to the remote.
    TransportError,
    /// The caller canceled the context.
    Canceled,
    /// The context deadline passed.
    DeadlineExceeded,
}

/// Terminal failure of an authentication call.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Construction-time validation failed. Never retried.
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    /// The cookie store could not produce a cookie. The store error is kept
    /// verbatim as the source.
    #[error("credential unavailable: {source}")]
    CredentialUnavailable {
        /// The store failure.
        #[source]
        source: StoreError,
    },

    /// The remote rejected the session; a fresh cookie must be obtained out-of-band.
    #[error("[AUTH] session rejected (HTTP {status}): {reason}\n  Suggestion: capture a fresh session cookie from the browser.")]
    Unauthenticated {
        /// HTTP status of the rejecting response.
        status: u16,
        /// Why the response was classified as a rejection.
        reason: String,
    },

    /// Transport failure after `attempts` tries.
    #[error("transport error after {attempts} attempt(s): {source}")]
    Transport {
        /// Attempts made, including the first.
        attempts: u32,
        /// The last transport failure.
        #[source]
        source: CheckError,
    },

    /// The caller canceled the context.
    #[error("authentication canceled")]
    Canceled,

    /// The context deadline passed.
    #[error("authentication deadline exceeded")]
    DeadlineExceeded,
}

impl AuthError {
    /// Returns the coarse kind of this error.
    #[must_use]
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            Self::InvalidConfig(_) => AuthErrorKind::InvalidConfig,
            Self::CredentialUnavailable { .. } => AuthErrorKind::CredentialUnavailable,
            Self::Unauthenticated { .. } => AuthErrorKind::Unauthenticated,
            Self::Transport { .. } => AuthErrorKind::TransportError,
            Self::Canceled => AuthErrorKind::Canceled,
            Self::DeadlineExceeded => AuthErrorKind::DeadlineExceeded,
        }
    }

    /// The store failure behind a [`AuthError::CredentialUnavailable`].
    #[must_use]
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::CredentialUnavailable { source } => Some(source),
            _ => None,
        }
    }

    /// Maps a store failure, turning context interruptions into their own kinds.
    pub(crate) fn from_store(error: StoreError) -> Self {
        match error {
            StoreError::Interrupted(interrupted) => interrupted.into(),
            other => Self::CredentialUnavailable { source: other },
        }
    }
}

impl From<Interrupted> for AuthError {
    fn from(interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::Canceled => Self::Canceled,
            Interrupted::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

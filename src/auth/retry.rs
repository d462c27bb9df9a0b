//! Retry decisions for failed session checks.
//!
//! A failed check is classified into a [`FailureType`]; the [`RetryPolicy`]
//! then decides whether another attempt is allowed. Only transient transport
//! failures are retried, and the delay between attempts is the configured
//! courtesy wait, without backoff or jitter.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use session_auth::auth::{FailureType, RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::new(2, Duration::from_millis(500));
//! match policy.should_retry(FailureType::Transient, 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

use crate::check::CheckError;

/// Classification of a failed session check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: timeout, connection refused, 5xx, 408, 429.
    Transient,

    /// Failure that will not succeed regardless of retries.
    ///
    /// Examples: TLS/certificate errors, unexpected 4xx, malformed body.
    Permanent,

    /// The remote rejected the session.
    Unauthenticated,
}

/// Decision on whether to retry a failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before the next attempt.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// How many extra attempts a transient failure earns, and the delay between them.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after the first (0 = no retry).
    max_retries: u32,

    /// Delay before each retry.
    delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_retries` extra attempts spaced by `delay`.
    #[must_use]
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Returns the total number of attempts allowed, including the first.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed.
    #[instrument(level = "debug", skip(self), fields(max_retries = self.max_retries))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        match failure_type {
            FailureType::Permanent => {
                return RetryDecision::DoNotRetry {
                    reason: "permanent failure - retry would not help".to_string(),
                };
            }
            FailureType::Unauthenticated => {
                return RetryDecision::DoNotRetry {
                    reason: "session rejected - retry with the same cookie would not help"
                        .to_string(),
                };
            }
            FailureType::Transient => {}
        }

        if attempt >= self.max_attempts() {
            debug!(attempt, max = self.max_attempts(), "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts()),
            };
        }

        RetryDecision::Retry {
            delay: self.delay,
            attempt: attempt + 1,
        }
    }
}

/// Classifies a check error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | Timeout | Transient |
/// | Network (TLS/certificate) | Permanent |
/// | Network (other) | Transient |
/// | HTTP 408, 429, 5xx | Transient |
/// | HTTP other | Permanent |
/// | Invalid body, cookie header, URL, client build | Permanent |
/// | Custom | as reported |
#[must_use]
pub fn classify_check_error(error: &CheckError) -> FailureType {
    match error {
        CheckError::Timeout { .. } => FailureType::Transient,
        CheckError::Network { source, .. } => {
            if is_tls_error(source) {
                FailureType::Permanent
            } else {
                FailureType::Transient
            }
        }
        CheckError::HttpStatus { status, .. } => classify_http_status(*status),
        CheckError::Custom { transient, .. } => {
            if *transient {
                FailureType::Transient
            } else {
                FailureType::Permanent
            }
        }
        CheckError::InvalidBody { .. }
        | CheckError::InvalidCookieHeader
        | CheckError::InvalidUrl { .. }
        | CheckError::Client(_) => FailureType::Permanent,
    }
}

fn classify_http_status(status: u16) -> FailureType {
    match status {
        408 | 429 => FailureType::Transient,
        401 | 403 => FailureType::Unauthenticated,
        500..=599 => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}

fn is_tls_error(error: &reqwest::Error) -> bool {
    let error_string = error.to_string().to_lowercase();
    error_string.contains("certificate")
        || error_string.contains("tls")
        || error_string.contains("ssl")
        || error_string.contains("handshake")
}

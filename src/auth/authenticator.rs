//! The authenticator: fetch cookie, wait, check, persist rotation.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, instrument, warn};

use super::error::AuthError;
use super::retry::{FailureType, RetryDecision, RetryPolicy, classify_check_error};
use super::state::{AuthState, StateMachine};
use crate::check::{CheckError, CheckOutcome, SessionCheck};
use crate::config::SessionConfig;
use crate::context::AuthContext;
use crate::cookie::Cookie;

/// Successful result of one authentication call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    /// Always true on the success path.
    pub authenticated: bool,
    /// The cookie that replaced the stored one, if the remote rotated it.
    pub rotated_cookie: Option<Cookie>,
    /// Remote check attempts made, including the first.
    pub attempts: u32,
}

/// Authenticates a session by presenting the stored cookie to a remote check.
///
/// The authenticator holds no per-call state; one instance can serve any
/// number of concurrent calls. Each call runs its own
/// `Idle -> Authenticating -> {Authenticated, Failed}` machine.
pub struct Authenticator {
    config: SessionConfig,
    check: Arc<dyn SessionCheck>,
    retry: RetryPolicy,
    last_state: Mutex<AuthState>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("config", &self.config)
            .field("last_state", &self.last_state())
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// Creates an authenticator over `check`.
    pub fn new(config: SessionConfig, check: impl SessionCheck + 'static) -> Self {
        Self::with_shared_check(config, Arc::new(check))
    }

    /// Creates an authenticator over a shared check.
    #[must_use]
    pub fn with_shared_check(config: SessionConfig, check: Arc<dyn SessionCheck>) -> Self {
        let retry = RetryPolicy::new(config.max_retries(), config.wait());
        Self {
            config,
            check,
            retry,
            last_state: Mutex::new(AuthState::Idle),
        }
    }

    /// The configuration this authenticator was built with.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Terminal state of the most recently finished call, or `Idle` before any.
    #[must_use]
    pub fn last_state(&self) -> AuthState {
        *self.last_state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Authenticates and reports only success or failure.
    ///
    /// # Errors
    ///
    /// See [`Authenticator::authenticate`].
    pub async fn auth(&self, ctx: &AuthContext) -> Result<(), AuthError> {
        self.authenticate(ctx).await.map(|_| ())
    }

    /// Authenticates the session held by the configured cookie store.
    ///
    /// Waits the configured courtesy delay before each remote check, persists
    /// a rotated cookie on success, and leaves the store untouched otherwise.
    /// A failure to persist a rotation is logged and does not fail the call.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Canceled`] / [`AuthError::DeadlineExceeded`] if `ctx` ends
    ///   first (checked before any work).
    /// - [`AuthError::CredentialUnavailable`] if the store yields no cookie.
    /// - [`AuthError::Unauthenticated`] if the remote rejects the session.
    /// - [`AuthError::Transport`] after retries are exhausted or on a permanent
    ///   transport failure.
    #[instrument(skip_all, fields(store = self.config.cookie_store().name()))]
    pub async fn authenticate(&self, ctx: &AuthContext) -> Result<AuthResult, AuthError> {
        let mut machine = StateMachine::new(self.config.debug());
        let result = self.run(&mut machine, ctx).await;

        match &result {
            Ok(_) => machine.advance(AuthState::Authenticated),
            Err(error) => {
                debug!(kind = ?error.kind(), "authentication failed");
                machine.advance(AuthState::Failed);
            }
        }
        *self
            .last_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = machine.state();

        result
    }

    async fn run(
        &self,
        machine: &mut StateMachine,
        ctx: &AuthContext,
    ) -> Result<AuthResult, AuthError> {
        if let Some(interrupted) = ctx.err() {
            return Err(interrupted.into());
        }
        machine.advance(AuthState::Authenticating);
        if let Some(deadline) = ctx.deadline() {
            debug!(
                remaining = ?deadline.saturating_duration_since(tokio::time::Instant::now()),
                "call has a deadline"
            );
        }

        let store = self.config.cookie_store();
        let cookie = ctx
            .run(store.get_cookie(ctx))
            .await?
            .map_err(AuthError::from_store)?;
        debug!(
            pairs = cookie.pair_count(),
            names = ?cookie.names(),
            "loaded session cookie"
        );

        let mut attempt = 0;
        let mut delay = self.config.wait();
        loop {
            attempt += 1;
            if !delay.is_zero() {
                debug!(?delay, attempt, "waiting before session check");
            }
            ctx.sleep(delay).await?;

            match ctx.run(self.check.check(&cookie)).await? {
                Ok(CheckOutcome::Valid { rotated }) => {
                    if let Some(rotated) = &rotated {
                        self.persist_rotation(ctx, rotated.clone()).await;
                    }
                    return Ok(AuthResult {
                        authenticated: true,
                        rotated_cookie: rotated,
                        attempts: attempt,
                    });
                }
                Ok(CheckOutcome::Unauthenticated { status, reason }) => {
                    return Err(AuthError::Unauthenticated { status, reason });
                }
                Err(error) => {
                    let failure_type = classify_check_error(&error);
                    if let CheckError::HttpStatus { status, .. } = &error
                        && failure_type == FailureType::Unauthenticated
                    {
                        return Err(AuthError::Unauthenticated {
                            status: *status,
                            reason: format!("HTTP {status}"),
                        });
                    }
                    match self.retry.should_retry(failure_type, attempt) {
                        RetryDecision::Retry {
                            delay: next_delay,
                            attempt: next_attempt,
                        } => {
                            info!(
                                attempt = next_attempt,
                                max = self.retry.max_attempts(),
                                error = %error,
                                "retrying session check"
                            );
                            delay = next_delay;
                        }
                        RetryDecision::DoNotRetry { reason } => {
                            debug!(%reason, attempt, "not retrying session check");
                            return Err(AuthError::Transport {
                                attempts: attempt,
                                source: error,
                            });
                        }
                    }
                }
            }
        }
    }

    async fn persist_rotation(&self, ctx: &AuthContext, cookie: Cookie) {
        let store = self.config.cookie_store();
        let error = match ctx.run(store.set_cookie(ctx, cookie)).await {
            Ok(Ok(())) => {
                debug!(store = store.name(), "persisted rotated session cookie");
                return;
            }
            Ok(Err(error)) => error.to_string(),
            Err(interrupted) => interrupted.to_string(),
        };

        if self.config.debug() {
            warn!(store = store.name(), %error, "failed to persist rotated session cookie");
        } else {
            debug!(store = store.name(), %error, "failed to persist rotated session cookie");
        }
    }
}

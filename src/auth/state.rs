//! Per-call authentication state machine.
//!
//! `Idle -> Authenticating -> {Authenticated, Failed}`. A machine lives for
//! exactly one call; only the cookie in the store outlives it.

use std::fmt;

use tokio::time::Instant;
use tracing::{info, trace};

/// State of one authentication call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Not started.
    Idle,
    /// Cookie fetched or being fetched, remote check in progress.
    Authenticating,
    /// The remote accepted the session.
    Authenticated,
    /// The call ended with an error.
    Failed,
}

impl AuthState {
    /// Returns true for `Authenticated` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Authenticated | Self::Failed)
    }

    fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Authenticating | Self::Failed)
                | (Self::Authenticating, Self::Authenticated | Self::Failed)
        )
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks the state of one call and emits transition diagnostics.
///
/// With `verbose` set transitions are logged at info level, otherwise at trace.
#[derive(Debug)]
pub(crate) struct StateMachine {
    state: AuthState,
    started: Instant,
    verbose: bool,
}

impl StateMachine {
    pub(crate) fn new(verbose: bool) -> Self {
        Self {
            state: AuthState::Idle,
            started: Instant::now(),
            verbose,
        }
    }

    pub(crate) fn state(&self) -> AuthState {
        self.state
    }

    /// Moves to `next`. Illegal transitions are ignored and logged.
    pub(crate) fn advance(&mut self, next: AuthState) {
        if !self.state.allows(next) {
            tracing::warn!(from = %self.state, to = %next, "ignoring illegal auth state transition");
            return;
        }

        #[allow(clippy::cast_possible_truncation)]
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        if self.verbose {
            info!(from = %self.state, to = %next, elapsed_ms, "auth state transition");
        } else {
            trace!(from = %self.state, to = %next, elapsed_ms, "auth state transition");
        }
        self.state = next;
    }
}

//! Caller context: cancellation plus an optional deadline.
//!
//! Every suspension point of an authentication call (the courtesy wait, the
//! store calls, the remote check) races against the context, so a canceled
//! context or an expired deadline aborts the pending future immediately.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a context ended before the guarded operation finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interrupted {
    /// The cancellation token was triggered.
    #[error("operation canceled")]
    Canceled,
    /// The context deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation and deadline scope passed to every authentication call.
///
/// Cloning is cheap and clones share the same cancellation token.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl AuthContext {
    /// Creates a context with no deadline and a fresh cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context driven by an existing cancellation token.
    #[must_use]
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Returns a copy of this context that also ends at `deadline`.
    ///
    /// An earlier existing deadline is kept.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Returns a copy of this context that ends `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Cancels this context and every clone of it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The deadline, if one is set.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns why the context has ended, or `None` while it is still live.
    ///
    /// Cancellation wins over an expired deadline.
    #[must_use]
    pub fn err(&self) -> Option<Interrupted> {
        if self.token.is_cancelled() {
            return Some(Interrupted::Canceled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Some(Interrupted::DeadlineExceeded),
            _ => None,
        }
    }

    /// Drives `future` to completion unless the context ends first.
    ///
    /// When the context ends, `future` is dropped, which aborts any in-flight
    /// request it owns.
    ///
    /// # Errors
    ///
    /// Returns [`Interrupted`] if the context is canceled or its deadline passes.
    pub async fn run<F>(&self, future: F) -> Result<F::Output, Interrupted>
    where
        F: Future,
    {
        if let Some(interrupted) = self.err() {
            return Err(interrupted);
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(Interrupted::Canceled),
            () = deadline => Err(Interrupted::DeadlineExceeded),
            output = future => Ok(output),
        }
    }

    /// Sleeps for `duration` unless the context ends first.
    ///
    /// # Errors
    ///
    /// Returns [`Interrupted`] if the context ends during the sleep.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        if duration.is_zero() {
            return self.err().map_or(Ok(()), Err);
        }
        self.run(tokio::time::sleep(duration)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_live_context_runs_future() {
        let ctx = AuthContext::new();
        assert_eq!(ctx.err(), None);
        assert_eq!(ctx.run(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn test_canceled_context_skips_future() {
        let ctx = AuthContext::new();
        ctx.cancel();
        let mut polled = false;
        let result = ctx.run(async { polled = true }).await;
        assert_eq!(result, Err(Interrupted::Canceled));
        assert!(!polled, "future must not be polled");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_interrupts_sleep() {
        let ctx = AuthContext::new().with_timeout(Duration::from_millis(50));
        let started = Instant::now();
        let result = ctx.sleep(Duration::from_secs(60)).await;
        assert_eq!(result, Err(Interrupted::DeadlineExceeded));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_pending_future() {
        let ctx = AuthContext::new();
        let canceler = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceler.cancel();
        });
        let result = ctx.run(std::future::pending::<()>()).await;
        assert_eq!(result, Err(Interrupted::Canceled));
    }

    #[tokio::test]
    async fn test_external_token_cancels_context() {
        let shutdown = CancellationToken::new();
        let ctx = AuthContext::with_token(shutdown.clone());
        assert_eq!(ctx.err(), None);
        shutdown.cancel();
        assert_eq!(ctx.err(), Some(Interrupted::Canceled));
        assert_eq!(ctx.sleep(Duration::from_secs(5)).await, Err(Interrupted::Canceled));
    }

    #[tokio::test]
    async fn test_with_deadline_keeps_earlier_deadline() {
        let now = Instant::now();
        let ctx = AuthContext::new()
            .with_deadline(now + Duration::from_secs(1))
            .with_deadline(now + Duration::from_secs(10));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_zero_sleep_on_live_context_is_ok() {
        let ctx = AuthContext::new();
        assert_eq!(ctx.sleep(Duration::ZERO).await, Ok(()));
    }
}

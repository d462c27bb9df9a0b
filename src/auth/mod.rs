//! Session authentication.
//!
//! [`Authenticator`] ties the pieces together: it reads the cookie from the
//! configured store, waits the courtesy delay, asks the [`SessionCheck`]
//! whether the session is valid, retries transient failures, and writes a
//! rotated cookie back to the store.
//!
//! [`SessionCheck`]: crate::check::SessionCheck

mod authenticator;
mod error;
mod retry;
mod state;

pub use authenticator::{AuthResult, Authenticator};
pub use error::{AuthError, AuthErrorKind};
pub use retry::{FailureType, RetryDecision, RetryPolicy, classify_check_error};
pub use state::AuthState;

//! Session policy: the immutable configuration an [`Authenticator`] is built from.
//!
//! [`SessionConfig`] is constructed through [`SessionConfigBuilder`], which
//! validates the courtesy wait and requires a cookie store. [`SessionSettings`]
//! is the serde-facing file form used by the binary.
//!
//! [`Authenticator`]: crate::Authenticator

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::store::CookieStore;

/// Default courtesy delay before each authentication attempt.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(1);

/// Default number of extra attempts for transient failures.
pub const DEFAULT_MAX_RETRIES: u32 = 0;

/// Upper bound accepted for `max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Construction-time validation failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The wait interval is negative.
    #[error("invalid config: wait must be >= 0, got {millis}ms")]
    NegativeWait {
        /// The rejected value in milliseconds.
        millis: i64,
    },

    /// The wait interval is not a finite, representable duration.
    #[error("invalid config: wait of {secs}s is not a valid duration")]
    InvalidWait {
        /// The rejected value in seconds.
        secs: f64,
    },

    /// No cookie store was supplied.
    #[error("invalid config: a cookie store is required")]
    MissingCookieStore,

    /// `max_retries` is above [`MAX_RETRIES_LIMIT`].
    #[error("invalid config: max_retries must be at most {MAX_RETRIES_LIMIT}, got {value}")]
    TooManyRetries {
        /// The rejected value.
        value: u32,
    },

    /// A settings file could not be read.
    #[error("cannot read settings file {path}: {source}")]
    Read {
        /// The settings file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A settings file is not valid JSON for [`SessionSettings`].
    #[error("cannot parse settings file {path}: {source}")]
    Parse {
        /// The settings file path.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Validated, immutable session policy.
#[derive(Clone)]
pub struct SessionConfig {
    wait: Duration,
    debug: bool,
    cookie_store: Arc<dyn CookieStore>,
    max_retries: u32,
}

impl SessionConfig {
    /// Starts a builder with default wait and no retries.
    #[must_use]
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Courtesy delay before each attempt, also used between retries.
    #[must_use]
    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Whether verbose diagnostics are enabled.
    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// The injected cookie store.
    #[must_use]
    pub fn cookie_store(&self) -> &Arc<dyn CookieStore> {
        &self.cookie_store
    }

    /// Extra attempts allowed after a transient failure.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("wait", &self.wait)
            .field("debug", &self.debug)
            .field("cookie_store", &self.cookie_store.name())
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
enum WaitInput {
    Exact(Duration),
    Millis(i64),
    Secs(f64),
}

/// Builder for [`SessionConfig`].
#[derive(Default)]
pub struct SessionConfigBuilder {
    wait: Option<WaitInput>,
    debug: bool,
    cookie_store: Option<Arc<dyn CookieStore>>,
    max_retries: Option<u32>,
}

impl SessionConfigBuilder {
    /// Sets the courtesy wait.
    #[must_use]
    pub fn wait(mut self, wait: Duration) -> Self {
        self.wait = Some(WaitInput::Exact(wait));
        self
    }

    /// Sets the courtesy wait from signed milliseconds; negative fails `build`.
    #[must_use]
    pub fn wait_millis(mut self, millis: i64) -> Self {
        self.wait = Some(WaitInput::Millis(millis));
        self
    }

    /// Sets the courtesy wait from fractional seconds; negative or non-finite fails `build`.
    #[must_use]
    pub fn wait_secs_f64(mut self, secs: f64) -> Self {
        self.wait = Some(WaitInput::Secs(secs));
        self
    }

    /// Enables verbose diagnostics.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the cookie store.
    #[must_use]
    pub fn cookie_store(mut self, store: Arc<dyn CookieStore>) -> Self {
        self.cookie_store = Some(store);
        self
    }

    /// Sets the cookie store from an owned implementation.
    #[must_use]
    pub fn cookie_store_owned(self, store: impl CookieStore + 'static) -> Self {
        self.cookie_store(Arc::new(store))
    }

    /// Sets the number of extra attempts for transient failures.
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Validates and freezes the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the wait is negative or not finite, when no
    /// cookie store is set, or when `max_retries` exceeds [`MAX_RETRIES_LIMIT`].
    pub fn build(self) -> Result<SessionConfig, ConfigError> {
        let wait = match self.wait {
            None => DEFAULT_WAIT,
            Some(WaitInput::Exact(wait)) => wait,
            Some(WaitInput::Millis(millis)) => {
                let millis =
                    u64::try_from(millis).map_err(|_| ConfigError::NegativeWait { millis })?;
                Duration::from_millis(millis)
            }
            Some(WaitInput::Secs(secs)) => {
                if secs < 0.0 {
                    #[allow(clippy::cast_possible_truncation)]
                    let millis = (secs * 1000.0) as i64;
                    return Err(ConfigError::NegativeWait { millis });
                }
                Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidWait { secs })?
            }
        };

        let cookie_store = self.cookie_store.ok_or(ConfigError::MissingCookieStore)?;

        let max_retries = self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES);
        if max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::TooManyRetries { value: max_retries });
        }

        Ok(SessionConfig {
            wait,
            debug: self.debug,
            cookie_store,
            max_retries,
        })
    }
}

/// File-backed settings for the binary.
///
/// All fields are optional; unset fields fall back to builder defaults or CLI flags.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSettings {
    /// Endpoint used for the session check.
    pub check_url: Option<String>,
    /// Courtesy wait in milliseconds (negative is rejected at build time).
    pub wait_ms: Option<i64>,
    /// Verbose diagnostics.
    pub debug: Option<bool>,
    /// Extra attempts for transient failures.
    pub max_retries: Option<u32>,
    /// Plain cookie file for a [`FileCookieStore`](crate::store::FileCookieStore).
    pub cookie_file: Option<PathBuf>,
    /// JSON pointer that must be present in the check response body.
    pub session_pointer: Option<String>,
    /// HTTP connect timeout for the check.
    pub connect_timeout_secs: Option<u64>,
    /// HTTP read timeout for the check.
    pub read_timeout_secs: Option<u64>,
}

impl SessionSettings {
    /// Loads settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses settings from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns the JSON error for malformed input or unknown fields.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    /// Applies the policy fields of these settings to a builder.
    #[must_use]
    pub fn apply(&self, mut builder: SessionConfigBuilder) -> SessionConfigBuilder {
        if let Some(wait_ms) = self.wait_ms {
            builder = builder.wait_millis(wait_ms);
        }
        if let Some(debug) = self.debug {
            builder = builder.debug(debug);
        }
        if let Some(max_retries) = self.max_retries {
            builder = builder.max_retries(max_retries);
        }
        builder
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryCookieStore;

    fn store() -> Arc<dyn CookieStore> {
        Arc::new(MemoryCookieStore::new("a=1"))
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::builder().cookie_store(store()).build().unwrap();
        assert_eq!(config.wait(), DEFAULT_WAIT);
        assert!(!config.debug());
        assert_eq!(config.max_retries(), 0);
    }

    #[test]
    fn test_zero_wait_is_valid() {
        let config = SessionConfig::builder()
            .wait_millis(0)
            .cookie_store(store())
            .build()
            .unwrap();
        assert_eq!(config.wait(), Duration::ZERO);
    }

    #[test]
    fn test_negative_wait_millis_is_invalid() {
        let result = SessionConfig::builder()
            .wait_millis(-1)
            .cookie_store(store())
            .build();
        assert!(matches!(result, Err(ConfigError::NegativeWait { millis: -1 })));
    }

    #[test]
    fn test_negative_wait_secs_is_invalid() {
        let result = SessionConfig::builder()
            .wait_secs_f64(-0.5)
            .cookie_store(store())
            .build();
        assert!(matches!(result, Err(ConfigError::NegativeWait { millis: -500 })));
    }

    #[test]
    fn test_nan_wait_is_invalid() {
        let result = SessionConfig::builder()
            .wait_secs_f64(f64::NAN)
            .cookie_store(store())
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidWait { .. })));
    }

    #[test]
    fn test_missing_store_is_invalid() {
        let result = SessionConfig::builder().wait(Duration::ZERO).build();
        assert!(matches!(result, Err(ConfigError::MissingCookieStore)));
    }

    #[test]
    fn test_retry_limit_enforced() {
        let result = SessionConfig::builder()
            .cookie_store(store())
            .max_retries(MAX_RETRIES_LIMIT + 1)
            .build();
        assert!(matches!(result, Err(ConfigError::TooManyRetries { .. })));
    }

    #[test]
    fn test_debug_output_names_store_only() {
        let config = SessionConfig::builder()
            .cookie_store_owned(MemoryCookieStore::new("secret=value"))
            .build()
            .unwrap();
        let debug = format!("{config:?}");
        assert!(debug.contains("memory"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_settings_from_json_and_apply() {
        let settings = SessionSettings::from_json(
            r#"{"check_url": "https://example.com/v1/client", "wait_ms": 250, "debug": true, "max_retries": 2}"#,
        )
        .unwrap();
        let config = settings
            .apply(SessionConfig::builder().cookie_store(store()))
            .build()
            .unwrap();
        assert_eq!(config.wait(), Duration::from_millis(250));
        assert!(config.debug());
        assert_eq!(config.max_retries(), 2);
    }

    #[test]
    fn test_settings_negative_wait_surfaces_at_build() {
        let settings = SessionSettings::from_json(r#"{"wait_ms": -10}"#).unwrap();
        let result = settings
            .apply(SessionConfig::builder().cookie_store(store()))
            .build();
        assert!(matches!(result, Err(ConfigError::NegativeWait { millis: -10 })));
    }

    #[test]
    fn test_settings_reject_unknown_fields() {
        assert!(SessionSettings::from_json(r#"{"cookie": "a=1"}"#).is_err());
    }

    #[test]
    fn test_settings_load_missing_file() {
        let result = SessionSettings::load(Path::new("/nonexistent/session-auth.json"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}

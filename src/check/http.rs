//! reqwest-backed session check.
//!
//! Sends one GET with the cookie as the `Cookie` header and classifies the
//! response. Redirects are not followed so a bounce to a login page is
//! visible as such.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, COOKIE, HeaderValue, LOCATION, SET_COOKIE};
use reqwest::{Client, StatusCode, redirect};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::{CheckError, CheckOutcome, SessionCheck};
use crate::cookie::Cookie;
use crate::user_agent;

/// Path fragments indicating a login/SSO redirect.
pub const LOGIN_PATTERNS: &[&str] = &[
    "/login",
    "/signin",
    "/sign-in",
    "/sign_in",
    "/auth/",
    "/sso",
    "/saml",
    "/oauth",
    "/openid",
];

/// Session check against an HTTP(S) endpoint.
///
/// Create once and reuse; the inner client pools connections.
#[derive(Debug, Clone)]
pub struct HttpSessionCheck {
    client: Client,
    url: Url,
    session_pointer: Option<String>,
}

impl HttpSessionCheck {
    /// Creates a check with default timeouts (10s connect, 30s read).
    ///
    /// # Errors
    ///
    /// Returns [`CheckError::InvalidUrl`] for a malformed or non-HTTP URL, or
    /// [`CheckError::Client`] if the client cannot be built.
    pub fn new(url: &str) -> Result<Self, CheckError> {
        Self::with_timeouts(url, CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a check with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Same as [`HttpSessionCheck::new`].
    pub fn with_timeouts(
        url: &str,
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, CheckError> {
        let parsed = Url::parse(url).map_err(|_| CheckError::InvalidUrl {
            url: url.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CheckError::InvalidUrl {
                url: url.to_string(),
            });
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .redirect(redirect::Policy::none())
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(CheckError::Client)?;

        Ok(Self {
            client,
            url: parsed,
            session_pointer: None,
        })
    }

    /// Requires a successful response body to be JSON with a non-empty value
    /// at `pointer` (RFC 6901, e.g. `/response/last_active_session_id`).
    #[must_use]
    pub fn require_json_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.session_pointer = Some(pointer.into());
        self
    }

    /// The endpoint this check calls.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn classify_success(
        &self,
        response: reqwest::Response,
        rotated: Option<Cookie>,
    ) -> Result<CheckOutcome, CheckError> {
        let Some(pointer) = self.session_pointer.as_deref() else {
            return Ok(CheckOutcome::Valid { rotated });
        };

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| map_send_error(self.url.as_str(), e))?;
        let json: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| CheckError::invalid_body(self.url.as_str(), e.to_string()))?;

        if has_session_value(&json, pointer) {
            Ok(CheckOutcome::Valid { rotated })
        } else {
            debug!(pointer, "session field missing from check response");
            Ok(CheckOutcome::unauthenticated(
                status,
                format!("no active session at {pointer}"),
            ))
        }
    }
}

#[async_trait]
impl SessionCheck for HttpSessionCheck {
    #[instrument(level = "debug", skip(self, cookie), fields(url = %self.url))]
    async fn check(&self, cookie: &Cookie) -> Result<CheckOutcome, CheckError> {
        let header =
            HeaderValue::from_str(cookie.expose()).map_err(|_| CheckError::InvalidCookieHeader)?;

        let response = self
            .client
            .get(self.url.clone())
            .header(COOKIE, header)
            .header(ACCEPT, "application/json, text/html;q=0.9, */*;q=0.8")
            .send()
            .await
            .map_err(|e| map_send_error(self.url.as_str(), e))?;

        let status = response.status();
        debug!(status = status.as_u16(), "session check response");

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Ok(CheckOutcome::unauthenticated(
                status.as_u16(),
                format!("HTTP {}", status.as_u16()),
            ));
        }

        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if is_login_location(&self.url, location) {
                debug!(location, "redirected to login");
                return Ok(CheckOutcome::unauthenticated(
                    status.as_u16(),
                    "redirected to login",
                ));
            }
            return Err(CheckError::http_status(self.url.as_str(), status.as_u16()));
        }

        if !status.is_success() {
            return Err(CheckError::http_status(self.url.as_str(), status.as_u16()));
        }

        let rotated = cookie.apply_set_cookies(
            response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );
        if let Some(rotated) = &rotated {
            debug!(pairs = rotated.pair_count(), "response rotated session cookie");
        }

        self.classify_success(response, rotated).await
    }
}

fn map_send_error(url: &str, error: reqwest::Error) -> CheckError {
    if error.is_timeout() {
        CheckError::timeout(url)
    } else {
        CheckError::network(url, error)
    }
}

/// Returns true if a redirect target looks like a login/SSO page.
///
/// Only the path of the resolved target is matched, so a `next=/login`
/// query parameter on an ordinary page does not count.
fn is_login_location(base: &Url, location: &str) -> bool {
    if location.is_empty() {
        return false;
    }
    let Ok(target) = base.join(location) else {
        return false;
    };
    let path = target.path().to_ascii_lowercase();
    LOGIN_PATTERNS.iter().any(|pattern| path.contains(pattern))
}

fn has_session_value(json: &serde_json::Value, pointer: &str) -> bool {
    match json.pointer(pointer) {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_new_rejects_malformed_url() {
        assert!(matches!(
            HttpSessionCheck::new("not a url"),
            Err(CheckError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_new_rejects_non_http_scheme() {
        assert!(matches!(
            HttpSessionCheck::new("ftp://example.com/session"),
            Err(CheckError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_new_accepts_https_url() {
        let check = HttpSessionCheck::new("https://clerk.example.com/v1/client").unwrap();
        assert_eq!(check.url().host_str(), Some("clerk.example.com"));
    }

    #[test]
    fn test_login_location_detection() {
        let base = Url::parse("https://example.com/v1/client").unwrap();
        assert!(is_login_location(&base, "https://example.com/Sign-In?next=/"));
        assert!(is_login_location(&base, "/login"));
        assert!(is_login_location(&base, "https://idp.example.edu/sso/start"));
        assert!(is_login_location(&base, "/auth/callback"));
        assert!(!is_login_location(&base, "https://example.com/dashboard"));
        assert!(!is_login_location(&base, ""));
    }

    #[test]
    fn test_login_pattern_outside_path_is_ignored() {
        let base = Url::parse("https://example.com/v1/client").unwrap();
        assert!(!is_login_location(&base, "/dashboard?next=/login"));
        assert!(!is_login_location(&base, "https://example.com/home#/signin"));
        assert!(!is_login_location(&base, "https://login.example.com/home"));
        assert!(is_login_location(&base, "LOGIN?next=/home"));
    }

    #[test]
    fn test_session_value_detection() {
        let body = json!({"response": {"last_active_session_id": "sess_1", "empty": "", "none": null}});
        assert!(has_session_value(&body, "/response/last_active_session_id"));
        assert!(!has_session_value(&body, "/response/empty"));
        assert!(!has_session_value(&body, "/response/none"));
        assert!(!has_session_value(&body, "/response/missing"));
        assert!(has_session_value(&body, "/response"));
    }

    #[tokio::test]
    async fn test_invalid_header_bytes_rejected_before_sending() {
        let check = HttpSessionCheck::new("http://127.0.0.1:9/never").unwrap();
        let result = check.check(&Cookie::new("a=1\nInjected: yes")).await;
        assert!(matches!(result, Err(CheckError::InvalidCookieHeader)));
    }
}

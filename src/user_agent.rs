//! User-Agent string for session check requests.

/// Project URL for User-Agent identification (RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/nicksrandall/session-auth";

/// Default User-Agent for session checks (identifies the tool and version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("session-auth/{version} (+{PROJECT_UA_URL})")
}

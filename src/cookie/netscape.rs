//! Netscape cookie file import.
//!
//! Parses the Netscape HTTP cookie file format (7 TAB-separated fields per line)
//! that browser extensions export, and flattens the entries matching one host
//! into a single session [`Cookie`].

use std::fmt;
use std::io::BufRead;

use tracing::{debug, instrument, warn};

use super::Cookie;

/// A single parsed line from a Netscape-format cookie file.
///
/// The value field is redacted in Debug output.
#[derive(Clone)]
pub struct NetscapeCookie {
    /// The domain the cookie belongs to (e.g., `.suno.com`).
    pub domain: String,
    /// Whether subdomains should match.
    pub tailmatch: bool,
    /// The URL path scope for the cookie.
    pub path: String,
    /// Whether the cookie should only be sent over HTTPS.
    pub secure: bool,
    /// Unix timestamp for expiry (0 = session cookie).
    pub expires: u64,
    /// Cookie name.
    pub name: String,
    value: String,
}

impl NetscapeCookie {
    /// Creates a new cookie entry.
    #[must_use]
    pub fn new(
        domain: String,
        tailmatch: bool,
        path: String,
        secure: bool,
        expires: u64,
        name: String,
        value: String,
    ) -> Self {
        Self {
            domain,
            tailmatch,
            path,
            secure,
            expires,
            name,
            value,
        }
    }

    /// Returns the cookie value. Sensitive.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns true when this entry applies to `host`.
    #[must_use]
    pub fn matches_host(&self, host: &str) -> bool {
        let domain = self.domain.trim_start_matches('.').to_ascii_lowercase();
        let host = host.to_ascii_lowercase();
        if host == domain {
            return true;
        }
        let subdomains_allowed = self.tailmatch || self.domain.starts_with('.');
        subdomains_allowed && host.ends_with(&format!(".{domain}"))
    }

    /// Returns true when the entry has an expiry at or before `now_unix`.
    #[must_use]
    pub fn is_expired(&self, now_unix: u64) -> bool {
        self.expires != 0 && self.expires <= now_unix
    }
}

impl fmt::Debug for NetscapeCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetscapeCookie")
            .field("domain", &self.domain)
            .field("tailmatch", &self.tailmatch)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("expires", &self.expires)
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Errors that can occur while parsing a cookie file.
#[derive(Debug, thiserror::Error)]
pub enum NetscapeError {
    /// A line in the cookie file has an invalid format.
    #[error("line {line_number}: {reason} (got: {content})")]
    InvalidLine {
        /// 1-based line number in the cookie file.
        line_number: usize,
        /// The offending line content with the value redacted.
        content: String,
        /// Description of what was wrong.
        reason: String,
    },

    /// I/O error reading the cookie file.
    #[error("failed to read cookie file: {0}")]
    Io(#[from] std::io::Error),

    /// No valid cookies found in a non-empty file.
    #[error("no valid cookies found in file ({malformed_count} lines failed to parse)")]
    NoCookiesFound {
        /// Number of malformed lines encountered.
        malformed_count: usize,
    },
}

/// Parsed cookies plus warnings for skipped lines.
#[derive(Debug)]
pub struct ParseResult {
    /// Successfully parsed cookies.
    pub cookies: Vec<NetscapeCookie>,
    /// Warnings for malformed lines (line number and reason).
    pub warnings: Vec<(usize, String)>,
}

/// Parses a Netscape-format cookie file from a buffered reader.
///
/// Lines starting with `#` and blank lines are skipped, except the
/// `#HttpOnly_` prefix curl and browsers use to mark HTTP-only entries.
///
/// # Errors
///
/// Returns [`NetscapeError::Io`] on read failure, or
/// [`NetscapeError::NoCookiesFound`] when a non-empty file yields zero valid
/// cookies. Individual malformed lines are collected as warnings.
#[instrument(level = "debug", skip(reader))]
pub fn parse_netscape_cookies(reader: impl BufRead) -> Result<ParseResult, NetscapeError> {
    let mut cookies = Vec::new();
    let mut warnings = Vec::new();
    let mut data_lines = 0;

    for (idx, line_result) in reader.lines().enumerate() {
        let line_number = idx + 1;
        let line = line_result?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        let line = match line.strip_prefix("#HttpOnly_") {
            Some(rest) => rest,
            None if line.starts_with('#') => continue,
            None => line,
        };

        data_lines += 1;
        match parse_cookie_line(line, line_number) {
            Ok(cookie) => {
                debug!(line = line_number, domain = %cookie.domain, name = %cookie.name, "parsed cookie");
                cookies.push(cookie);
            }
            Err(e) => {
                warn!(line = line_number, reason = %e, "skipping malformed cookie line");
                warnings.push((line_number, e.to_string()));
            }
        }
    }

    if cookies.is_empty() && data_lines > 0 {
        return Err(NetscapeError::NoCookiesFound {
            malformed_count: warnings.len(),
        });
    }

    Ok(ParseResult { cookies, warnings })
}

/// Flattens the unexpired entries matching `host` into one session cookie.
///
/// Returns `None` when no entry applies.
#[must_use]
pub fn cookie_for_host(cookies: &[NetscapeCookie], host: &str, now_unix: u64) -> Option<Cookie> {
    let pairs: Vec<(&str, &str)> = cookies
        .iter()
        .filter(|cookie| cookie.matches_host(host) && !cookie.is_expired(now_unix))
        .map(|cookie| (cookie.name.as_str(), cookie.value()))
        .collect();

    if pairs.is_empty() {
        return None;
    }
    debug!(host, pairs = pairs.len(), "flattened netscape cookies for host");
    Some(Cookie::from_pairs(pairs))
}

fn parse_cookie_line(line: &str, line_number: usize) -> Result<NetscapeCookie, NetscapeError> {
    let fields: Vec<&str> = line.split('\t').collect();
    let invalid = |reason: String| NetscapeError::InvalidLine {
        line_number,
        content: redact_line_for_error(line),
        reason,
    };

    if fields.len() != 7 {
        return Err(invalid(format!(
            "expected 7 TAB-separated fields, found {}",
            fields.len()
        )));
    }

    let tailmatch = parse_bool_field(fields[1]).ok_or_else(|| {
        invalid(format!("tailmatch field must be TRUE or FALSE, got '{}'", fields[1]))
    })?;
    let secure = parse_bool_field(fields[3]).ok_or_else(|| {
        invalid(format!("secure field must be TRUE or FALSE, got '{}'", fields[3]))
    })?;
    let expires = fields[4].parse::<u64>().map_err(|_| {
        invalid(format!(
            "expires field must be a non-negative integer, got '{}'",
            fields[4]
        ))
    })?;

    if fields[0].is_empty() {
        return Err(invalid("domain field is empty".to_string()));
    }
    if fields[5].is_empty() {
        return Err(invalid("cookie name field is empty".to_string()));
    }

    Ok(NetscapeCookie::new(
        fields[0].to_string(),
        tailmatch,
        fields[2].to_string(),
        secure,
        expires,
        fields[5].to_string(),
        fields[6].to_string(),
    ))
}

fn parse_bool_field(value: &str) -> Option<bool> {
    match value {
        "TRUE" => Some(true),
        "FALSE" => Some(false),
        _ => None,
    }
}

/// Redacts a line for safe error messages.
///
/// Well-formed lines keep the first six fields. Anything else keeps only the
/// leading token, and only when it cannot be a `name=value` pair.
fn redact_line_for_error(line: &str) -> String {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() >= 7 {
        let mut redacted = fields[..6].join("\t");
        redacted.push_str("\t[REDACTED]");
        return redacted;
    }

    let mut tokens = line.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(first), None) if !first.contains('=') => first.to_string(),
        (Some(first), Some(_)) if !first.contains('=') => format!("{first} [REDACTED]"),
        _ => "[REDACTED]".to_string(),
    }
}

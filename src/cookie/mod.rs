//! The opaque session cookie and `Set-Cookie` rotation handling.
//!
//! A [`Cookie`] is the raw value of a `Cookie` request header: one or more
//! `name=value` pairs joined by `; `. The authenticator never interprets the
//! pairs beyond what is needed to apply a rotation sent by the remote service.

mod netscape;

use std::fmt;

pub use netscape::{NetscapeCookie, NetscapeError, ParseResult, cookie_for_host, parse_netscape_cookies};

/// Separator used when joining cookie pairs into a header value.
const PAIR_SEPARATOR: &str = "; ";

/// An opaque session credential usable as a `Cookie` header value.
///
/// The value is a bearer credential. `Debug` output is redacted and there is
/// no `Display` impl; use [`Cookie::expose`] only where the raw
/// value is sent over the wire or persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Cookie(String);

impl Cookie {
    /// Wraps a raw cookie header value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Builds a cookie from `(name, value)` pairs.
    #[must_use]
    pub fn from_pairs<N, V>(pairs: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: AsRef<str>,
        V: AsRef<str>,
    {
        let joined = pairs
            .into_iter()
            .map(|(name, value)| format!("{}={}", name.as_ref(), value.as_ref()))
            .collect::<Vec<_>>()
            .join(PAIR_SEPARATOR);
        Self(joined)
    }

    /// Returns the raw header value.
    ///
    /// Cookie values are sensitive, avoid logging the return value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns true when the cookie carries no pairs at all.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.segments().next().is_none()
    }

    /// Number of `name=value` segments in the cookie.
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.segments().count()
    }

    /// Cookie names in header order. Names are not secret, values are.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.segments().map(segment_name).collect()
    }

    /// Applies `Set-Cookie` header values to this cookie.
    ///
    /// Pairs are replaced by name, new names are appended, and a pair is
    /// dropped when the update carries an empty value or `Max-Age<=0`.
    /// Returns `None` when the headers leave the pair set unchanged.
    #[must_use]
    pub fn apply_set_cookies<'a>(&self, headers: impl IntoIterator<Item = &'a str>) -> Option<Cookie> {
        let original: Vec<&str> = self.segments().collect();
        let mut merged: Vec<String> = original.iter().map(|s| (*s).to_string()).collect();

        for header in headers {
            let Some(update) = SetCookie::parse(header) else {
                continue;
            };
            let position = merged.iter().position(|s| segment_name(s) == update.name);
            if update.removes() {
                if let Some(index) = position {
                    merged.remove(index);
                }
                continue;
            }

            let segment = format!("{}={}", update.name, update.value);
            match position {
                Some(index) => merged[index] = segment,
                None => merged.push(segment),
            }
        }

        if merged.iter().map(String::as_str).eq(original.iter().copied()) {
            return None;
        }
        Some(Self(merged.join(PAIR_SEPARATOR)))
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(';').map(str::trim).filter(|s| !s.is_empty())
    }
}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cookie")
            .field("pairs", &self.pair_count())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl From<String> for Cookie {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Cookie {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

fn segment_name(segment: &str) -> &str {
    segment
        .split_once('=')
        .map_or(segment, |(name, _)| name)
        .trim()
}

/// The parts of a `Set-Cookie` header the rotation logic cares about.
struct SetCookie<'a> {
    name: &'a str,
    value: &'a str,
    expired: bool,
}

impl<'a> SetCookie<'a> {
    fn parse(header: &'a str) -> Option<Self> {
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let expired = parts.any(|attribute| {
            attribute
                .split_once('=')
                .filter(|(key, _)| key.trim().eq_ignore_ascii_case("max-age"))
                .and_then(|(_, age)| age.trim().parse::<i64>().ok())
                .is_some_and(|age| age <= 0)
        });

        Some(Self {
            name,
            value: value.trim().trim_matches('"'),
            expired,
        })
    }

    fn removes(&self) -> bool {
        self.expired || self.value.is_empty()
    }
}

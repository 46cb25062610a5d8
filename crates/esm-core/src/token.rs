//! Bearer session types.

use std::fmt;

use chrono::{DateTime, Utc};

/// A bearer token returned by the login endpoint.
///
/// # Security
///
/// - Never logged or displayed in Debug output
/// - Treat as opaque; do not parse or inspect
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Extract a token from a raw `Authorization` header value.
    ///
    /// Strips an optional case-insensitive `Bearer ` prefix and surrounding
    /// whitespace. Returns `None` when nothing is left.
    pub fn from_header_value(raw: &str) -> Option<Self> {
        let raw = raw.trim_start();
        let token = match raw.get(..6) {
            Some(prefix)
                if prefix.eq_ignore_ascii_case("bearer")
                    && raw[6..].starts_with(char::is_whitespace) =>
            {
                raw[6..].trim()
            }
            _ => raw.trim(),
        };

        if token.is_empty() {
            None
        } else {
            Some(Self(token.to_string()))
        }
    }

    /// Returns the token value for use in authorization headers.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BearerToken").field(&"[REDACTED]").finish()
    }
}

/// An authenticated bearer session.
///
/// Created once per operation batch from a login call and discarded after
/// it. Never persisted.
#[derive(Debug, Clone)]
pub struct Session {
    token: BearerToken,
    obtained_at: DateTime<Utc>,
}

impl Session {
    /// Wrap a freshly obtained token.
    pub fn new(token: BearerToken) -> Self {
        Self {
            token,
            obtained_at: Utc::now(),
        }
    }

    /// Returns the bearer token.
    pub fn token(&self) -> &BearerToken {
        &self.token
    }

    /// Returns when the token was obtained.
    pub fn obtained_at(&self) -> DateTime<Utc> {
        self.obtained_at
    }
}

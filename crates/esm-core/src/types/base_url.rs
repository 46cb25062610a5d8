//! Instance base URL type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{Error, ValidationError};

/// Path prefix of every REST endpoint.
const API_PREFIX: [&str; 3] = ["rest-api", "itsm", "v1"];

/// A normalised ESM instance URL.
///
/// Normalisation strips a trailing slash and prefixes `https://` when the
/// input carries no scheme, so `acme.efectecloud.com/` and
/// `https://acme.efectecloud.com` name the same instance.
///
/// # Example
///
/// ```
/// use esm_core::BaseUrl;
///
/// let base = BaseUrl::new("acme.efectecloud.com/").unwrap();
/// assert_eq!(base.as_str(), "https://acme.efectecloud.com");
/// assert_eq!(
///     base.endpoint(&["users", "login"]).as_str(),
///     "https://acme.efectecloud.com/rest-api/itsm/v1/users/login"
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BaseUrl {
    url: Url,
    normalized: String,
}

impl BaseUrl {
    /// Create a new base URL from user input, normalising it.
    ///
    /// # Errors
    ///
    /// Returns an error if the result is not an absolute http(s) URL with a host.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let original = s.as_ref();
        let trimmed = original.trim();
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);

        if trimmed.is_empty() {
            return Err(Self::invalid(original, "cannot be empty"));
        }

        let normalized = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let url = Url::parse(&normalized).map_err(|e| Self::invalid(original, &e.to_string()))?;

        let scheme = url.scheme();
        if scheme != "https" && scheme != "http" {
            return Err(Self::invalid(original, "must use http or https"));
        }

        if url.host_str().is_none() {
            return Err(Self::invalid(original, "must have a host"));
        }

        if url.query().is_some() || url.fragment().is_some() {
            return Err(Self::invalid(original, "must not carry a query or fragment"));
        }

        Ok(Self { url, normalized })
    }

    /// Returns the REST endpoint URL under `/rest-api/itsm/v1/` for the given
    /// path segments. Segments are percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(API_PREFIX).extend(segments);
        }
        url
    }

    /// Returns the normalised base URL as a string.
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// Returns the host string.
    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    fn invalid(value: &str, reason: &str) -> Error {
        ValidationError::BaseUrl {
            value: value.to_string(),
            reason: reason.to_string(),
        }
        .into()
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

impl FromStr for BaseUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for BaseUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.normalized)
    }
}

impl<'de> Deserialize<'de> for BaseUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BaseUrl::new(&s).map_err(serde::de::Error::custom)
    }
}

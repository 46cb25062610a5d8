//! Identifier types for templates, DataCards and attributes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, ValidationError};

fn validate(kind: &'static str, s: &str) -> Result<(), Error> {
    let reason = if s.trim().is_empty() {
        "cannot be empty"
    } else if s.contains('/') {
        "cannot contain '/'"
    } else if s.trim() != s {
        "cannot have leading or trailing whitespace"
    } else {
        return Ok(());
    };

    Err(ValidationError::Identifier {
        kind,
        value: s.to_string(),
        reason: reason.to_string(),
    }
    .into())
}

/// A template code such as `Incidents` or `ServiceRequests`.
///
/// # Example
///
/// ```
/// use esm_core::TemplateCode;
///
/// let template = TemplateCode::new("Incidents").unwrap();
/// assert_eq!(template.as_str(), "Incidents");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TemplateCode(String);

impl TemplateCode {
    /// Create a new template code, validating the format.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        validate("template code", &s)?;
        Ok(Self(s))
    }

    /// Returns the template code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The identifier of a single DataCard.
///
/// The API hands identifiers out as strings, but they are numeric in
/// practice and double as the `filterId` pagination cursor.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataCardId(String);

impl DataCardId {
    /// Create a new DataCard id, validating the format.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        validate("DataCard id", &s)?;
        Ok(Self(s))
    }

    /// Returns the id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the id as a `filterId` cursor value, if it is numeric.
    pub fn filter_id(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

/// The code of an attribute declared on a template.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AttributeCode(String);

impl AttributeCode {
    /// Create a new attribute code, validating the format.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        validate("attribute code", &s)?;
        Ok(Self(s))
    }

    /// Returns the attribute code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_conversions {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = Error;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_conversions!(TemplateCode);
string_conversions!(DataCardId);
string_conversions!(AttributeCode);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_template_code() {
        let template = TemplateCode::new("ServiceRequests").unwrap();
        assert_eq!(template.to_string(), "ServiceRequests");
    }

    #[test]
    fn rejects_empty_and_slashes() {
        assert!(TemplateCode::new("").is_err());
        assert!(TemplateCode::new("   ").is_err());
        assert!(DataCardId::new("12/34").is_err());
        assert!(AttributeCode::new(" subject").is_err());
    }

    #[test]
    fn numeric_filter_id() {
        assert_eq!(DataCardId::new("4711").unwrap().filter_id(), Some(4711));
        assert_eq!(DataCardId::new("INC-1").unwrap().filter_id(), None);
    }

    #[test]
    fn serde_roundtrip_validates() {
        let id: DataCardId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(id.as_str(), "42");
        assert!(serde_json::from_str::<TemplateCode>("\"\"").is_err());
    }
}

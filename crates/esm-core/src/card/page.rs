//! Page request and response types for the listing endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::record::DataCard;
use crate::error::{Error, ValidationError};
use crate::types::TemplateCode;

/// Largest page the listing endpoint returns.
pub const MAX_PAGE_SIZE: usize = 200;

/// Which DataCards a listing returns, by their hidden flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    All,
    #[default]
    Visible,
    Hidden,
}

impl Visibility {
    /// Returns the filter clause selecting this visibility, if any.
    pub fn clause(&self) -> Option<&'static str> {
        match self {
            Visibility::All => None,
            Visibility::Visible => Some("hidden = 0"),
            Visibility::Hidden => Some("hidden = 1"),
        }
    }

    /// Combine a user filter with this visibility's clause.
    pub fn apply(&self, filter: Option<&str>) -> Option<String> {
        let filter = filter.map(str::trim).filter(|f| !f.is_empty());
        match (filter, self.clause()) {
            (Some(filter), Some(clause)) => Some(format!("{} and {}", filter, clause)),
            (Some(filter), None) => Some(filter.to_string()),
            (None, Some(clause)) => Some(clause.to_string()),
            (None, None) => None,
        }
    }

    /// Returns true if a DataCard with the given hidden flag matches.
    pub fn matches(&self, hidden: bool) -> bool {
        match self {
            Visibility::All => true,
            Visibility::Visible => !hidden,
            Visibility::Hidden => hidden,
        }
    }

    /// Returns the visibility name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::All => "all",
            Visibility::Visible => "visible",
            Visibility::Hidden => "hidden",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Visibility::All),
            "visible" => Ok(Visibility::Visible),
            "hidden" => Ok(Visibility::Hidden),
            other => Err(ValidationError::Other {
                message: format!("unknown visibility '{}' (expected all, visible or hidden)", other),
            }
            .into()),
        }
    }
}

/// Parameters of one listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Query-language filter expression.
    pub filter: Option<String>,
    /// Restrict to one folder.
    pub folder_code: Option<String>,
    /// Comma-separated attribute codes to return.
    pub selected_attributes: Option<String>,
    /// Records wanted from this page; clamped to `1..=MAX_PAGE_SIZE` on the wire.
    pub limit: usize,
    /// Return records after this DataCard id.
    pub filter_id: Option<u64>,
    /// Ask for full DataCards.
    pub data_cards: bool,
    /// Sort expression such as `created desc`.
    pub sort: Option<String>,
}

impl PageRequest {
    /// Returns the limit actually sent to the API.
    pub fn wire_limit(&self) -> usize {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }
}

/// Per-record annotation describing the listing a record came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageAnnotation {
    /// Total matching records reported by the server.
    pub count: u64,
    /// The limit the caller asked for.
    pub limit: usize,
    /// The server's link to the following page, empty when there is none.
    pub next_link: String,
}

/// One page of DataCards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<DataCard>,
    pub total_count: u64,
    pub next_link: String,
}

/// Template metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub code: TemplateCode,
    /// Declared attribute code to its metadata.
    pub attributes: Map<String, Value>,
}

impl Template {
    /// Returns the declared attribute codes.
    pub fn attribute_codes(&self) -> Vec<String> {
        self.attributes.keys().cloned().collect()
    }

    /// Returns true if the template declares the attribute.
    pub fn has_attribute(&self, code: &str) -> bool {
        self.attributes.contains_key(code)
    }
}

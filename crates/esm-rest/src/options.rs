//! Options of the ad-hoc DataCard operations.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use esm_core::error::ValidationError;
use esm_core::{DataCardId, Error, PageRequest, Visibility};

/// Default number of records returned by list and search.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Sort direction of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("asc"),
            SortDirection::Desc => f.write_str("desc"),
        }
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(ValidationError::Other {
                message: format!("unknown sort order '{}' (expected asc or desc)", other),
            }
            .into()),
        }
    }
}

/// Sort order of a listing, sent as `"{field} {asc|desc}"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction)
    }
}

/// Options of list and search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    /// Filter expression; for search this is the query.
    pub filter: Option<String>,
    pub folder_code: Option<String>,
    /// Comma-separated attribute codes.
    pub selected_attributes: Option<String>,
    pub visibility: Visibility,
    /// Records to return in total.
    pub limit: usize,
    /// Ask for full DataCards.
    pub data_cards: bool,
    pub sort: Option<Sort>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            filter: None,
            folder_code: None,
            selected_attributes: None,
            visibility: Visibility::default(),
            limit: DEFAULT_LIST_LIMIT,
            data_cards: false,
            sort: None,
        }
    }
}

impl ListOptions {
    /// Build the base page request. The pager fills in `limit` and `filter_id`.
    pub fn page_request(&self) -> PageRequest {
        PageRequest {
            filter: self.visibility.apply(self.filter.as_deref()),
            folder_code: self.folder_code.clone().filter(|f| !f.is_empty()),
            selected_attributes: self
                .selected_attributes
                .clone()
                .filter(|s| !s.trim().is_empty()),
            limit: self.limit,
            filter_id: None,
            data_cards: self.data_cards,
            sort: self.sort.as_ref().map(Sort::to_string),
        }
    }
}

/// Options of create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Folder of the DataCard. Required by create.
    pub folder_code: Option<String>,
    pub create_empty_references: bool,
    /// Return the full DataCard instead of its id.
    pub return_full_data_card: bool,
}

/// Checks made before a delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Only delete a DataCard with this visibility.
    pub visibility: Visibility,
    /// Only delete a DataCard in this folder.
    pub folder_code: Option<String>,
}

impl DeleteOptions {
    /// Returns true if the DataCard must be fetched before deleting.
    pub fn needs_precheck(&self) -> bool {
        self.visibility != Visibility::All || self.folder_code.is_some()
    }
}

/// Result of a successful delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub success: bool,
    pub data_card_id: DataCardId,
}

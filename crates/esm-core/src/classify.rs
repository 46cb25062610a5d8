//! Operation-aware classification of remote failures.
//!
//! Transports return every non-success response as a
//! [`ProtocolError`]. Callers know which operation they were performing and
//! turn it into a domain error with [`classify`]. Statuses an operation
//! family has no rule for stay as [`Error::Protocol`].

use crate::error::{ConflictKind, Error, ProtocolError, RateLimit};

/// Groups of operations sharing one status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationFamily {
    /// Incremental listing on the polling path.
    Poll,
    /// Capped listing.
    List,
    /// Capped listing with a filter expression.
    Search,
    /// Template metadata lookup.
    Template,
    /// Creation of a DataCard.
    Create,
    /// Update of a DataCard.
    Update,
    /// Fetch of a single DataCard.
    Get,
    /// Removal of a DataCard.
    Delete,
    /// Attribute-level reads and writes.
    Attribute,
    /// File upload or download on an attribute.
    File,
}

/// The context a failure is classified in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    family: OperationFamily,
    template: String,
    data_card: Option<String>,
    attribute: Option<String>,
    filter_supplied: bool,
}

impl Operation {
    /// Describe an operation of `family` against `template`.
    pub fn new(family: OperationFamily, template: impl Into<String>) -> Self {
        Self {
            family,
            template: template.into(),
            data_card: None,
            attribute: None,
            filter_supplied: false,
        }
    }

    /// Name the DataCard the operation targets.
    pub fn data_card(mut self, id: impl Into<String>) -> Self {
        self.data_card = Some(id.into());
        self
    }

    /// Name the attribute the operation targets.
    pub fn attribute(mut self, code: impl Into<String>) -> Self {
        self.attribute = Some(code.into());
        self
    }

    /// Record whether the caller supplied a filter expression.
    pub fn filter_supplied(mut self, supplied: bool) -> Self {
        self.filter_supplied = supplied;
        self
    }

    /// Returns the operation family.
    pub fn family(&self) -> OperationFamily {
        self.family
    }

    fn template_entity(&self) -> String {
        format!("template '{}'", self.template)
    }

    fn data_card_entity(&self) -> String {
        match self.data_card {
            Some(ref id) => format!("DataCard '{}' in template '{}'", id, self.template),
            None => self.template_entity(),
        }
    }

    fn attribute_entity(&self) -> String {
        match self.attribute {
            Some(ref code) => format!("attribute '{}' of {}", code, self.data_card_entity()),
            None => self.data_card_entity(),
        }
    }
}

/// Map a remote failure to the error taxonomy.
pub fn classify(op: &Operation, err: ProtocolError) -> Error {
    use OperationFamily::*;

    let remote_message = || {
        err.message
            .clone()
            .filter(|message| !message.trim().is_empty())
    };

    match (op.family, err.status) {
        (_, 429) => Error::RateLimited(rate_limit(op, &err)),

        (Poll, 400) if op.filter_supplied => Error::InvalidRequest {
            message: "invalid filter syntax; quote values with single quotes and use \
                      field names such as $created$ or $status$"
                .to_string(),
        },
        (Search | Attribute | File, 400) => Error::InvalidRequest {
            message: remote_message().unwrap_or_else(|| "the request was rejected".to_string()),
        },
        (Create | Update, 400) => Error::InvalidRequest {
            message: remote_message()
                .unwrap_or_else(|| "please check the field values and types".to_string()),
        },

        (Get | Delete | Attribute | File, 403) => Error::Forbidden {
            message: remote_message().unwrap_or_else(|| {
                format!("permission denied for {}", op.attribute_entity())
            }),
        },

        (Poll | List | Search | Template, 404) => Error::NotFound {
            entity: op.template_entity(),
        },
        (Create | Update, 404) => Error::NotFound {
            entity: format!("DataCard or {}", op.template_entity()),
        },
        (Get | Delete, 404) => Error::NotFound {
            entity: op.data_card_entity(),
        },
        (Attribute | File, 404) => Error::NotFound {
            entity: op.attribute_entity(),
        },

        (Create | Update | Attribute | File, 409) => Error::Conflict {
            kind: ConflictKind::Locked,
        },
        (Delete, 409) => Error::Conflict {
            kind: ConflictKind::AlreadyDeleted,
        },

        _ => Error::Protocol(err),
    }
}

/// Only the polling path reports the server's wait duration and timestamp.
fn rate_limit(op: &Operation, err: &ProtocolError) -> RateLimit {
    if op.family != OperationFamily::Poll {
        return RateLimit::default();
    }
    RateLimit {
        wait_seconds: err.message.as_deref().and_then(first_number),
        url: err.url.clone(),
        timestamp: err.timestamp.clone(),
    }
}

fn first_number(message: &str) -> Option<u64> {
    let digits: String = message
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

impl Error {
    /// Classify this error for `op`. Only unclassified remote failures change.
    pub fn classify(self, op: &Operation) -> Error {
        match self {
            Error::Protocol(err) => classify(op, err),
            other => other,
        }
    }
}

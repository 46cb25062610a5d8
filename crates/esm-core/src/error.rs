//! Error types for ESM operations.
//!
//! This module provides a unified error type whose variants form a closed
//! taxonomy: the classified remote outcomes (not found, rate limited,
//! conflict, ...), client-side validation failures, and two carriers for
//! everything else (transport failures and unclassified remote responses).

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// The unified error type for ESM operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (connection, TLS, body decoding).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Login went through but no usable bearer token came back.
    #[error("authentication error: {0}")]
    Authentication(#[from] AuthError),

    /// A template, DataCard or attribute does not exist.
    #[error("not found: {entity}")]
    NotFound { entity: String },

    /// The remote API throttled the request.
    #[error("rate limited: {0}")]
    RateLimited(RateLimit),

    /// The remote API rejected the request as malformed.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// The DataCard is locked or already removed.
    #[error("conflict: {kind}")]
    Conflict { kind: ConflictKind },

    /// The authenticated user lacks permission.
    #[error("forbidden: {message}")]
    Forbidden { message: String },

    /// A selected attribute does not exist on the template.
    #[error(
        "invalid attribute selection for template '{template}': unknown [{}]; available [{}]",
        .unknown.join(", "),
        .available.join(", ")
    )]
    InvalidAttributeSelection {
        template: String,
        unknown: Vec<String>,
        available: Vec<String>,
    },

    /// Client-side input validation failed before any mutating call.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A non-success response no classification rule matched.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl Error {
    /// Returns true when a continue-on-failure batch may turn this error
    /// into a per-item error record instead of aborting.
    ///
    /// A missing bearer token invalidates every later call of the batch.
    pub fn is_per_item(&self) -> bool {
        !matches!(self, Error::Authentication(_))
    }

    /// Returns the HTTP status behind this error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::NotFound { .. } => Some(404),
            Error::RateLimited(_) => Some(429),
            Error::InvalidRequest { .. } => Some(400),
            Error::Conflict { .. } => Some(409),
            Error::Forbidden { .. } => Some(403),
            Error::Protocol(err) => Some(err.status),
            _ => None,
        }
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Response body could not be decoded.
    #[error("could not decode response body: {message}")]
    Decode { message: String },

    /// Local file or stream I/O failed during a transfer.
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Decode {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io {
            message: err.to_string(),
        }
    }
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The login response had no usable `Authorization` header.
    ///
    /// Carries every header the server returned so the failure can be
    /// diagnosed without re-running the login.
    #[error("no token found in Authorization header (response headers: {})", format_headers(.headers))]
    MissingToken { headers: BTreeMap<String, String> },
}

fn format_headers(headers: &BTreeMap<String, String>) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Details of a throttled request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimit {
    /// Seconds the server asked the caller to wait.
    pub wait_seconds: Option<u64>,
    /// URL the server reported for the throttled call.
    pub url: Option<String>,
    /// Timestamp the server reported for the throttled call.
    pub timestamp: Option<String>,
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.wait_seconds {
            Some(secs) => write!(f, "please wait {} seconds before retrying", secs)?,
            None => write!(f, "please wait before making more requests")?,
        }
        if let Some(ref url) = self.url {
            write!(f, " (url: {})", url)?;
        }
        if let Some(ref timestamp) = self.timestamp {
            write!(f, " (timestamp: {})", timestamp)?;
        }
        Ok(())
    }
}

/// Why a DataCard could not be changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Another process holds the lock on the DataCard.
    Locked,
    /// The DataCard is already in the trashcan.
    AlreadyDeleted,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::Locked => write!(f, "DataCard is locked by another process"),
            ConflictKind::AlreadyDeleted => write!(f, "DataCard has already been removed"),
        }
    }
}

/// A non-success response from the ESM REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Error message from the server.
    pub message: Option<String>,
    /// URL reported by the server.
    pub url: Option<String>,
    /// Timestamp reported by the server.
    pub timestamp: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a protocol error carrying only a status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            message: None,
            url: None,
            timestamp: None,
        }
    }

    /// Attach the server message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The instance URL could not be normalised.
    #[error("invalid base URL '{value}': {reason}")]
    BaseUrl { value: String, reason: String },

    /// An identifier (template code, DataCard id, attribute code) is unusable.
    #[error("invalid {kind} '{value}': {reason}")]
    Identifier {
        kind: &'static str,
        value: String,
        reason: String,
    },

    /// A composite field value lacks one of its `|`-separated parts.
    #[error("field '{field}' of type {field_type} expects 'a|b', got '{value}'")]
    MalformedCompositeValue {
        field: String,
        field_type: &'static str,
        value: String,
    },

    /// Creating a DataCard needs a folder code.
    #[error("a folder code is required to create a DataCard")]
    MissingFolderCode,

    /// The DataCard's visibility does not match the requested one.
    #[error("DataCard visibility ({actual}) does not match filter ({expected})")]
    VisibilityMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// The DataCard lives in a different folder than requested.
    #[error("DataCard folder code ({actual}) does not match filter ({expected})")]
    FolderMismatch { expected: String, actual: String },

    /// Generic invalid input.
    #[error("{message}")]
    Other { message: String },
}

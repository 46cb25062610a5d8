//! esm-core - Domain types and the incremental polling engine for the
//! Efecte ESM REST API.
//!
//! This crate performs no I/O. Network access goes through the
//! [`DataCardSource`] trait, implemented by `esm-rest`.
//!
//! # Overview
//!
//! - [`card`]: DataCards, typed attribute values and their wire codec
//! - [`cursor`]: the persisted [`PollCursor`] and its dedup window
//! - [`pager`]: capped and incremental pagination strategies
//! - [`poll`]: one poll cycle over a source and a cursor
//! - [`classify`]: operation-aware mapping of remote failures

pub mod card;
pub mod classify;
pub mod credentials;
pub mod cursor;
pub mod error;
pub mod pager;
pub mod poll;
pub mod source;
pub mod token;
pub mod types;

pub use card::{
    AttributeValue, DataCard, FieldSpec, FieldType, MAX_PAGE_SIZE, Page, PageAnnotation,
    PageRequest, Template, Visibility,
};
pub use classify::{Operation, OperationFamily};
pub use credentials::Credentials;
pub use cursor::{DedupWindow, PollCursor, WINDOW_CAPACITY};
pub use error::{
    AuthError, ConflictKind, Error, ProtocolError, RateLimit, TransportError, ValidationError,
};
pub use pager::{CappedPager, IncrementalPager, Pager};
pub use poll::{PollConfig, PollOutcome, poll_cycle};
pub use source::DataCardSource;
pub use token::{BearerToken, Session};
pub use types::{AttributeCode, BaseUrl, DataCardId, TemplateCode};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

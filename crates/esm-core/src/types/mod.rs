//! Core ESM types.
//!
//! These types enforce API invariants at construction time,
//! ensuring invalid states are unrepresentable.

mod base_url;
mod ids;

pub use base_url::BaseUrl;
pub use ids::{AttributeCode, DataCardId, TemplateCode};

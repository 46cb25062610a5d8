//! The read seam between the polling engine and the network.

use async_trait::async_trait;

use crate::Result;
use crate::card::{Page, PageRequest, Template};
use crate::types::TemplateCode;

/// Something that can list DataCards page by page.
///
/// Implementations return remote failures unclassified (as
/// [`Error::Protocol`](crate::Error::Protocol)); callers classify them for
/// the operation they are performing.
#[async_trait]
pub trait DataCardSource: Send + Sync {
    /// Fetch one page of DataCards.
    async fn fetch_page(&self, template: &TemplateCode, request: &PageRequest) -> Result<Page>;

    /// Fetch the template's metadata, including its declared attributes.
    async fn fetch_template(&self, template: &TemplateCode) -> Result<Template>;
}

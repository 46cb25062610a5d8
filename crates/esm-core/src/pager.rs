//! Cursor pagination strategies.
//!
//! The listing endpoint pages by "last seen id" (`filterId`) rather than by
//! offset. Two strategies drive it:
//!
//! - [`CappedPager`] collects up to a requested number of records starting
//!   from the beginning, for one-shot list and search operations.
//! - [`IncrementalPager`] resumes from a persisted cursor and collects only
//!   records the dedup window has not seen, for the polling path.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::Result;
use crate::card::{DataCard, MAX_PAGE_SIZE, PageAnnotation, PageRequest};
use crate::cursor::DedupWindow;
use crate::source::DataCardSource;
use crate::types::TemplateCode;

/// A pagination strategy over a [`DataCardSource`].
#[async_trait]
pub trait Pager: Send {
    /// Fetch pages until the strategy's stop condition holds.
    ///
    /// `request` supplies filter, folder and attribute selection; the pager
    /// owns `limit` and `filter_id`.
    async fn collect(
        &mut self,
        source: &dyn DataCardSource,
        template: &TemplateCode,
        request: &PageRequest,
    ) -> Result<Vec<DataCard>>;

    /// Returns the number of pages fetched by the last `collect`.
    fn pages_fetched(&self) -> usize;
}

/// Collects up to `limit` records, `MAX_PAGE_SIZE` per request.
#[derive(Debug, Clone)]
pub struct CappedPager {
    limit: usize,
    annotate: bool,
    pages: usize,
}

impl CappedPager {
    /// Create a pager that stops after `limit` records.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            annotate: false,
            pages: 0,
        }
    }

    /// Attach a [`PageAnnotation`] from the last fetched page to every record.
    pub fn with_annotations(mut self) -> Self {
        self.annotate = true;
        self
    }
}

#[async_trait]
impl Pager for CappedPager {
    async fn collect(
        &mut self,
        source: &dyn DataCardSource,
        template: &TemplateCode,
        request: &PageRequest,
    ) -> Result<Vec<DataCard>> {
        self.pages = 0;
        let mut records: Vec<DataCard> = Vec::new();
        if self.limit == 0 {
            return Ok(records);
        }

        let mut request = request.clone();
        let mut total_count = 0;
        let mut next_link = String::new();

        loop {
            let page_limit = (self.limit - records.len()).min(MAX_PAGE_SIZE);
            request.limit = page_limit;

            let page = source.fetch_page(template, &request).await?;
            self.pages += 1;

            let fetched = page.records.len();
            let next_cursor = page.records.last().map(DataCard::filter_id);
            if page.total_count > 0 {
                total_count = page.total_count;
            }
            next_link = page.next_link;
            records.extend(page.records);

            debug!(
                page = self.pages,
                fetched,
                accumulated = records.len(),
                "Fetched capped page"
            );

            if fetched < page_limit || records.len() >= self.limit {
                break;
            }

            match next_cursor.flatten() {
                Some(filter_id) => request.filter_id = Some(filter_id),
                None => {
                    warn!(template = %template, "Last record has no numeric id; stopping pagination");
                    break;
                }
            }
        }

        records.truncate(self.limit);

        if self.annotate {
            let annotation = PageAnnotation {
                count: total_count,
                limit: self.limit,
                next_link,
            };
            for record in &mut records {
                record.meta = Some(annotation.clone());
            }
        }

        Ok(records)
    }

    fn pages_fetched(&self) -> usize {
        self.pages
    }
}

/// Collects up to `wanted` records the dedup window has not seen, resuming
/// after a persisted `filterId`.
///
/// The pager does not touch persisted state. After a successful `collect`,
/// [`last_filter_id`](Self::last_filter_id) is the cursor to store.
#[derive(Debug)]
pub struct IncrementalPager<'a> {
    window: &'a DedupWindow,
    wanted: usize,
    last_filter_id: u64,
    pages: usize,
}

impl<'a> IncrementalPager<'a> {
    /// Create a pager resuming after `start_filter_id`.
    pub fn new(window: &'a DedupWindow, start_filter_id: u64, wanted: usize) -> Self {
        Self {
            window,
            wanted,
            last_filter_id: start_filter_id,
            pages: 0,
        }
    }

    /// Returns the cursor reached so far. Never below the start cursor.
    pub fn last_filter_id(&self) -> u64 {
        self.last_filter_id
    }

    fn advance(&mut self, filter_id: u64) {
        self.last_filter_id = self.last_filter_id.max(filter_id);
    }
}

#[async_trait]
impl Pager for IncrementalPager<'_> {
    async fn collect(
        &mut self,
        source: &dyn DataCardSource,
        template: &TemplateCode,
        request: &PageRequest,
    ) -> Result<Vec<DataCard>> {
        self.pages = 0;
        let mut fresh: Vec<DataCard> = Vec::new();
        if self.wanted == 0 {
            return Ok(fresh);
        }

        let mut request = request.clone();
        request.limit = MAX_PAGE_SIZE;

        while fresh.len() < self.wanted {
            request.filter_id = Some(self.last_filter_id);

            let page = source.fetch_page(template, &request).await?;
            self.pages += 1;

            let fetched = page.records.len();
            if fetched == 0 {
                break;
            }

            // The cursor always moves to the end of the fetched page, even
            // when new records past the target are dropped below.
            let advance_to = page.records.last().and_then(DataCard::filter_id);
            let mut candidates = self.window.filter_new(page.records);
            candidates.truncate(self.wanted - fresh.len());

            debug!(
                page = self.pages,
                fetched,
                new = candidates.len(),
                "Fetched incremental page"
            );
            fresh.extend(candidates);

            match advance_to {
                Some(filter_id) => self.advance(filter_id),
                None => {
                    warn!(template = %template, "Cannot advance cursor past a record without numeric id; stopping pagination");
                    break;
                }
            }

            if fetched < MAX_PAGE_SIZE {
                break;
            }
        }

        Ok(fresh)
    }

    fn pages_fetched(&self) -> usize {
        self.pages
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::card::{Page, Template};
    use crate::error::{Error, ProtocolError};
    use crate::types::DataCardId;
    use std::sync::Mutex;

    /// In-memory source serving records with ascending numeric ids.
    pub(crate) struct FakeSource {
        pub ids: Vec<u64>,
        pub requests: Mutex<Vec<PageRequest>>,
        pub fail_on_page: Option<usize>,
        pub attributes: Vec<&'static str>,
    }

    impl FakeSource {
        pub fn with_ids(ids: impl IntoIterator<Item = u64>) -> Self {
            Self {
                ids: ids.into_iter().collect(),
                requests: Mutex::new(Vec::new()),
                fail_on_page: None,
                attributes: vec!["subject", "status"],
            }
        }

        pub fn requests(&self) -> Vec<PageRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    pub(crate) fn card(id: u64) -> DataCard {
        DataCard {
            id: Some(DataCardId::new(id.to_string()).unwrap()),
            ..Default::default()
        }
    }

    #[async_trait]
    impl DataCardSource for FakeSource {
        async fn fetch_page(
            &self,
            _template: &TemplateCode,
            request: &PageRequest,
        ) -> crate::Result<Page> {
            let page_number = {
                let mut requests = self.requests.lock().unwrap();
                requests.push(request.clone());
                requests.len()
            };
            if self.fail_on_page == Some(page_number) {
                return Err(Error::Protocol(ProtocolError::new(429)));
            }

            let after = request.filter_id.unwrap_or(0);
            let records: Vec<DataCard> = self
                .ids
                .iter()
                .filter(|id| **id > after)
                .take(request.wire_limit())
                .map(|id| card(*id))
                .collect();

            Ok(Page {
                records,
                total_count: self.ids.len() as u64,
                next_link: format!("next-after-{}", after),
            })
        }

        async fn fetch_template(&self, template: &TemplateCode) -> crate::Result<Template> {
            let attributes = self
                .attributes
                .iter()
                .map(|name| (name.to_string(), serde_json::json!({})))
                .collect();
            Ok(Template {
                code: template.clone(),
                attributes,
            })
        }
    }

    fn template() -> TemplateCode {
        TemplateCode::new("Incidents").unwrap()
    }

    #[tokio::test]
    async fn capped_stops_on_short_page() {
        let source = FakeSource::with_ids(1..=250);
        let mut pager = CappedPager::new(250);

        let records = pager
            .collect(&source, &template(), &PageRequest::default())
            .await
            .unwrap();

        assert_eq!(records.len(), 250);
        assert_eq!(pager.pages_fetched(), 2);

        let requests = source.requests();
        assert_eq!(requests[0].limit, 200);
        assert_eq!(requests[0].filter_id, None);
        assert_eq!(requests[1].limit, 50);
        assert_eq!(requests[1].filter_id, Some(200));
    }

    #[tokio::test]
    async fn capped_stops_when_source_exhausted() {
        let source = FakeSource::with_ids(1..=230);
        let mut pager = CappedPager::new(1000);

        let records = pager
            .collect(&source, &template(), &PageRequest::default())
            .await
            .unwrap();

        assert_eq!(records.len(), 230);
        assert_eq!(pager.pages_fetched(), 2);
    }

    #[tokio::test]
    async fn capped_zero_limit_fetches_nothing() {
        let source = FakeSource::with_ids(1..=10);
        let mut pager = CappedPager::new(0);

        let records = pager
            .collect(&source, &template(), &PageRequest::default())
            .await
            .unwrap();

        assert!(records.is_empty());
        assert!(source.requests().is_empty());
    }

    #[tokio::test]
    async fn capped_annotates_from_last_page() {
        let source = FakeSource::with_ids(1..=300);
        let mut pager = CappedPager::new(300).with_annotations();

        let records = pager
            .collect(&source, &template(), &PageRequest::default())
            .await
            .unwrap();

        for record in &records {
            let meta = record.meta.as_ref().unwrap();
            assert_eq!(meta.count, 300);
            assert_eq!(meta.limit, 300);
            assert_eq!(meta.next_link, "next-after-200");
        }
    }

    /// Serves full pages whose last record has no id.
    struct AnonymousTail;

    #[async_trait]
    impl DataCardSource for AnonymousTail {
        async fn fetch_page(
            &self,
            _template: &TemplateCode,
            request: &PageRequest,
        ) -> crate::Result<Page> {
            let mut records: Vec<DataCard> = (1..request.wire_limit() as u64).map(card).collect();
            records.push(DataCard::default());
            Ok(Page {
                records,
                ..Default::default()
            })
        }

        async fn fetch_template(&self, template: &TemplateCode) -> crate::Result<Template> {
            Ok(Template {
                code: template.clone(),
                attributes: Default::default(),
            })
        }
    }

    #[tokio::test]
    async fn capped_stops_when_cursor_cannot_advance() {
        let mut pager = CappedPager::new(1000);
        let records = pager
            .collect(&AnonymousTail, &template(), &PageRequest::default())
            .await
            .unwrap();

        assert_eq!(records.len(), 200);
        assert_eq!(pager.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn incremental_stops_when_cursor_cannot_advance() {
        let window = DedupWindow::new();
        let mut pager = IncrementalPager::new(&window, 0, 1000);
        let records = pager
            .collect(&AnonymousTail, &template(), &PageRequest::default())
            .await
            .unwrap();

        assert_eq!(records.len(), 200);
        assert_eq!(pager.pages_fetched(), 1);
        assert_eq!(pager.last_filter_id(), 0);
    }

    #[tokio::test]
    async fn incremental_resumes_from_cursor() {
        let source = FakeSource::with_ids(1..=500);
        let window = DedupWindow::new();
        let mut pager = IncrementalPager::new(&window, 300, 1000);

        let records = pager
            .collect(&source, &template(), &PageRequest::default())
            .await
            .unwrap();

        assert_eq!(records.len(), 200);
        assert_eq!(records[0].filter_id(), Some(301));
        assert_eq!(pager.last_filter_id(), 500);

        let requests = source.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].filter_id, Some(300));
        assert_eq!(requests[1].filter_id, Some(500));
        assert!(requests.iter().all(|r| r.limit == MAX_PAGE_SIZE));
    }

    #[tokio::test]
    async fn incremental_advances_over_pages_without_new_records() {
        let source = FakeSource::with_ids(1..=450);
        let mut window = DedupWindow::new();
        window.commit(&(1..=200).map(card).collect::<Vec<_>>());
        let mut pager = IncrementalPager::new(&window, 0, 300);

        let records = pager
            .collect(&source, &template(), &PageRequest::default())
            .await
            .unwrap();

        assert_eq!(records.len(), 250);
        assert_eq!(records[0].filter_id(), Some(201));
        assert_eq!(pager.last_filter_id(), 450);
        assert_eq!(pager.pages_fetched(), 3);
    }

    #[tokio::test]
    async fn incremental_cursor_ends_at_final_page_last_id() {
        let source = FakeSource::with_ids(1..=1000);
        let window = DedupWindow::new();
        let mut pager = IncrementalPager::new(&window, 0, 250);

        let records = pager
            .collect(&source, &template(), &PageRequest::default())
            .await
            .unwrap();

        assert_eq!(records.len(), 250);
        assert_eq!(records.last().and_then(DataCard::filter_id), Some(250));
        assert_eq!(pager.pages_fetched(), 2);
        assert_eq!(pager.last_filter_id(), 400);
    }
}

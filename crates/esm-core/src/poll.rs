//! The poll cycle.
//!
//! One cycle validates the attribute selection, picks a pagination
//! strategy from the requested limit, filters out already-emitted records,
//! and commits what it emits to the caller's [`PollCursor`]. The cursor is
//! only modified when the cycle succeeds.

use tracing::{debug, info, instrument};

use crate::Result;
use crate::card::{DataCard, MAX_PAGE_SIZE, PageRequest};
use crate::classify::{Operation, OperationFamily};
use crate::cursor::PollCursor;
use crate::error::Error;
use crate::pager::{CappedPager, IncrementalPager, Pager};
use crate::source::DataCardSource;
use crate::types::TemplateCode;

/// Records requested per cycle when the caller does not say.
pub const DEFAULT_POLL_LIMIT: usize = 50;

/// What one poll trigger watches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Template to poll.
    pub template: TemplateCode,
    /// Optional filter expression.
    pub filter: Option<String>,
    /// Optional comma-separated attribute selection.
    pub selected_attributes: Option<String>,
    /// Records wanted per cycle.
    pub limit: usize,
}

impl PollConfig {
    /// Poll `template` with the default limit.
    pub fn new(template: TemplateCode) -> Self {
        Self {
            template,
            filter: None,
            selected_attributes: None,
            limit: DEFAULT_POLL_LIMIT,
        }
    }

    fn operation(&self) -> Operation {
        Operation::new(OperationFamily::Poll, self.template.as_str())
            .filter_supplied(self.filter.as_deref().is_some_and(|f| !f.trim().is_empty()))
    }
}

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Nothing new since the last cycle.
    NoNewData,
    /// Records not emitted before, in source order.
    Records(Vec<DataCard>),
}

impl PollOutcome {
    /// Returns the emitted records, empty for [`PollOutcome::NoNewData`].
    pub fn into_records(self) -> Vec<DataCard> {
        match self {
            PollOutcome::NoNewData => Vec::new(),
            PollOutcome::Records(records) => records,
        }
    }
}

/// Split a comma-separated attribute selection into trimmed names.
pub fn parse_selection(selection: &str) -> Vec<String> {
    selection
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Check a selection against the template's declared attributes.
///
/// Returns the normalised selection (`a,b`), or `None` when it is empty.
pub async fn validate_selection(
    source: &dyn DataCardSource,
    template: &TemplateCode,
    selection: &str,
) -> Result<Option<String>> {
    let selected = parse_selection(selection);
    if selected.is_empty() {
        return Ok(None);
    }

    let op = Operation::new(OperationFamily::Template, template.as_str());
    let metadata = source
        .fetch_template(template)
        .await
        .map_err(|e| e.classify(&op))?;

    let unknown: Vec<String> = selected
        .iter()
        .filter(|name| !metadata.has_attribute(name))
        .cloned()
        .collect();

    if !unknown.is_empty() {
        return Err(Error::InvalidAttributeSelection {
            template: template.to_string(),
            unknown,
            available: metadata.attribute_codes(),
        });
    }

    Ok(Some(selected.join(",")))
}

/// Run one poll cycle against `source`, reading and updating `cursor`.
#[instrument(skip_all, fields(template = %config.template, limit = config.limit))]
pub async fn poll_cycle(
    source: &dyn DataCardSource,
    config: &PollConfig,
    cursor: &mut PollCursor,
) -> Result<PollOutcome> {
    let op = config.operation();

    let selected_attributes = match config.selected_attributes.as_deref() {
        Some(selection) => validate_selection(source, &config.template, selection).await?,
        None => None,
    };

    let request = PageRequest {
        filter: config.filter.clone().filter(|f| !f.trim().is_empty()),
        selected_attributes,
        ..Default::default()
    };

    let emitted = if config.limit <= MAX_PAGE_SIZE {
        let mut pager = CappedPager::new(config.limit);
        let fetched = pager
            .collect(source, &config.template, &request)
            .await
            .map_err(|e| e.classify(&op))?;
        debug!(fetched = fetched.len(), "Fetched single page");
        cursor.window().filter_new(fetched)
    } else {
        let mut pager =
            IncrementalPager::new(cursor.window(), cursor.last_filter_id(), config.limit);
        let fresh = pager
            .collect(source, &config.template, &request)
            .await
            .map_err(|e| e.classify(&op))?;
        let reached = pager.last_filter_id();
        debug!(
            pages = pager.pages_fetched(),
            last_filter_id = reached,
            "Finished incremental fetch"
        );
        cursor.advance(reached);
        fresh
    };

    if emitted.is_empty() {
        info!("No new data");
        return Ok(PollOutcome::NoNewData);
    }

    let committed = cursor.commit(&emitted);
    info!(
        emitted = emitted.len(),
        committed,
        last_filter_id = cursor.last_filter_id(),
        "Poll cycle emitted records"
    );

    Ok(PollOutcome::Records(emitted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pager::tests::{FakeSource, card};

    fn config(limit: usize) -> PollConfig {
        PollConfig {
            limit,
            ..PollConfig::new(TemplateCode::new("Incidents").unwrap())
        }
    }

    #[tokio::test]
    async fn empty_source_yields_no_new_data_without_mutation() {
        let source = FakeSource::with_ids([]);
        let mut cursor = PollCursor::new();

        let outcome = poll_cycle(&source, &config(50), &mut cursor).await.unwrap();

        assert_eq!(outcome, PollOutcome::NoNewData);
        assert_eq!(cursor, PollCursor::new());
        assert_eq!(source.requests().len(), 1);
    }

    #[tokio::test]
    async fn small_limit_emits_once_then_reports_no_new_data() {
        let source = FakeSource::with_ids(1..=10);
        let mut cursor = PollCursor::new();

        let first = poll_cycle(&source, &config(50), &mut cursor).await.unwrap();
        assert_eq!(first.into_records().len(), 10);
        assert_eq!(cursor.window().len(), 10);

        let version = cursor.version();
        let second = poll_cycle(&source, &config(50), &mut cursor).await.unwrap();
        assert_eq!(second, PollOutcome::NoNewData);
        assert_eq!(cursor.version(), version);
    }

    #[tokio::test]
    async fn small_limit_sends_one_capped_request() {
        let source = FakeSource::with_ids(1..=500);
        let mut cursor = PollCursor::new();

        let outcome = poll_cycle(&source, &config(200), &mut cursor).await.unwrap();

        assert_eq!(outcome.into_records().len(), 200);
        let requests = source.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].limit, 200);
        assert_eq!(requests[0].filter_id, None);
    }

    #[tokio::test]
    async fn large_limit_pages_from_cursor_and_commits_once() {
        let source = FakeSource::with_ids(1..=450);
        let mut cursor = PollCursor::new();

        let outcome = poll_cycle(&source, &config(1000), &mut cursor).await.unwrap();

        let records = outcome.into_records();
        assert_eq!(records.len(), 450);
        assert_eq!(cursor.last_filter_id(), 450);
        assert_eq!(cursor.window().len(), 450);

        let requests = source.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].filter_id, Some(0));
        assert_eq!(requests[1].filter_id, Some(200));
        assert_eq!(requests[2].filter_id, Some(400));
    }

    #[tokio::test]
    async fn large_limit_resumes_in_next_cycle() {
        let source = FakeSource::with_ids(1..=1000);
        let mut cursor = PollCursor::new();

        let first = poll_cycle(&source, &config(300), &mut cursor).await.unwrap();
        assert_eq!(first.into_records().len(), 300);
        assert_eq!(cursor.last_filter_id(), 400);

        let second = poll_cycle(&source, &config(300), &mut cursor).await.unwrap();
        let records = second.into_records();
        assert_eq!(records.first().and_then(DataCard::filter_id), Some(401));
        assert_eq!(cursor.last_filter_id(), 800);
    }

    #[tokio::test]
    async fn cursor_matches_final_page_when_target_met_mid_page() {
        let source = FakeSource::with_ids(1..=1000);
        let mut cursor = PollCursor::new();

        let records = poll_cycle(&source, &config(250), &mut cursor)
            .await
            .unwrap()
            .into_records();

        assert_eq!(records.len(), 250);
        assert_eq!(source.requests().len(), 2);
        assert_eq!(cursor.last_filter_id(), 400);
        assert_eq!(cursor.window().len(), 250);
    }

    #[tokio::test]
    async fn failure_mid_cycle_leaves_cursor_untouched() {
        let mut source = FakeSource::with_ids(1..=1000);
        source.fail_on_page = Some(2);
        let mut cursor = PollCursor::new();
        cursor.commit(&[card(5000)]);
        let before = cursor.clone();

        let err = poll_cycle(&source, &config(500), &mut cursor)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RateLimited(_)));
        assert_eq!(cursor, before);
    }

    #[tokio::test]
    async fn unknown_attribute_fails_before_listing() {
        let source = FakeSource::with_ids(1..=10);
        let mut cursor = PollCursor::new();
        let config = PollConfig {
            selected_attributes: Some("subject, priorty".to_string()),
            ..config(50)
        };

        let err = poll_cycle(&source, &config, &mut cursor).await.unwrap_err();

        match err {
            Error::InvalidAttributeSelection {
                unknown, available, ..
            } => {
                assert_eq!(unknown, vec!["priorty".to_string()]);
                assert!(available.contains(&"subject".to_string()));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(source.requests().is_empty());
    }

    #[tokio::test]
    async fn valid_selection_is_normalised_into_request() {
        let source = FakeSource::with_ids(1..=3);
        let mut cursor = PollCursor::new();
        let config = PollConfig {
            selected_attributes: Some(" subject ,status,".to_string()),
            ..config(50)
        };

        poll_cycle(&source, &config, &mut cursor).await.unwrap();

        let requests = source.requests();
        assert_eq!(
            requests[0].selected_attributes.as_deref(),
            Some("subject,status")
        );
    }

    #[test]
    fn selection_parsing_drops_blanks() {
        assert_eq!(parse_selection(" a, ,b ,"), vec!["a", "b"]);
        assert!(parse_selection(" , ").is_empty());
    }
}

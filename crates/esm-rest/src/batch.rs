//! Item-by-item batch execution and bulk import.
//!
//! Items run strictly in order. Under [`BatchPolicy::ContinueOnFailure`] a
//! failed item becomes an [`ErrorRecord`] and the batch moves on; otherwise
//! the batch stops at the first failure and hands back what it already
//! produced. Authentication failures always stop the batch.

use std::fmt;
use std::future::Future;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use esm_core::{Error, FieldSpec, TemplateCode};

use crate::options::WriteOptions;
use crate::session::EsmSession;

/// What to do when an item fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPolicy {
    #[default]
    StopOnFailure,
    ContinueOnFailure,
}

/// A failed item under [`BatchPolicy::ContinueOnFailure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub error: String,
    pub item_index: usize,
}

/// Outcome of one batch item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ItemOutcome<T> {
    Success(T),
    Failed(ErrorRecord),
}

impl<T> ItemOutcome<T> {
    /// Returns true for a failed item.
    pub fn is_failed(&self) -> bool {
        matches!(self, ItemOutcome::Failed(_))
    }
}

/// A batch stopped by a failing item.
#[derive(Debug)]
pub struct BatchAborted<T> {
    /// Outcomes of the items before the failing one.
    pub completed: Vec<ItemOutcome<T>>,
    pub item_index: usize,
    pub error: Error,
}

impl<T> fmt::Display for BatchAborted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch stopped at item {} after {} completed: {}",
            self.item_index,
            self.completed.len(),
            self.error
        )
    }
}

impl<T: fmt::Debug> std::error::Error for BatchAborted<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Run `op` over `items` in order.
pub async fn run_batch<I, T, F, Fut>(
    items: I,
    policy: BatchPolicy,
    mut op: F,
) -> Result<Vec<ItemOutcome<T>>, BatchAborted<T>>
where
    I: IntoIterator,
    F: FnMut(usize, I::Item) -> Fut,
    Fut: Future<Output = esm_core::Result<T>>,
{
    let mut outcomes = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        match op(index, item).await {
            Ok(value) => outcomes.push(ItemOutcome::Success(value)),
            Err(error)
                if policy == BatchPolicy::ContinueOnFailure && error.is_per_item() =>
            {
                warn!(item_index = index, %error, "Item failed; continuing");
                outcomes.push(ItemOutcome::Failed(ErrorRecord {
                    error: error.to_string(),
                    item_index: index,
                }));
            }
            Err(error) => {
                warn!(item_index = index, %error, "Item failed; stopping batch");
                return Err(BatchAborted {
                    completed: outcomes,
                    item_index: index,
                    error,
                });
            }
        }
    }

    Ok(outcomes)
}

/// Create one DataCard per row of fields.
pub async fn import(
    session: &EsmSession,
    template: &TemplateCode,
    rows: Vec<Vec<FieldSpec>>,
    options: &WriteOptions,
    policy: BatchPolicy,
) -> Result<Vec<ItemOutcome<Value>>, BatchAborted<Value>> {
    let total = rows.len();
    info!(%template, total, "Importing DataCards");

    let outcomes = run_batch(rows, policy, |_, fields| async move {
        session.create(template, &fields, options).await
    })
    .await?;

    let failed = outcomes.iter().filter(|o| o.is_failed()).count();
    info!(%template, created = total - failed, failed, "Import finished");
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use esm_core::error::AuthError;
    use std::collections::BTreeMap;

    fn fail_odd(index: usize, item: u32) -> impl Future<Output = esm_core::Result<u32>> {
        async move {
            if index % 2 == 1 {
                Err(Error::NotFound {
                    entity: format!("item {}", item),
                })
            } else {
                Ok(item * 10)
            }
        }
    }

    #[tokio::test]
    async fn continue_turns_failures_into_records() {
        let outcomes = run_batch(vec![1, 2, 3], BatchPolicy::ContinueOnFailure, fail_odd)
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0], ItemOutcome::Success(10));
        match &outcomes[1] {
            ItemOutcome::Failed(record) => {
                assert_eq!(record.item_index, 1);
                assert!(record.error.contains("item 2"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(outcomes[2], ItemOutcome::Success(30));
    }

    #[tokio::test]
    async fn stop_keeps_prior_results() {
        let aborted = run_batch(vec![1, 2, 3], BatchPolicy::StopOnFailure, fail_odd)
            .await
            .unwrap_err();

        assert_eq!(aborted.item_index, 1);
        assert_eq!(aborted.completed, vec![ItemOutcome::Success(10)]);
        assert!(matches!(aborted.error, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn authentication_failure_stops_even_when_continuing() {
        let aborted = run_batch(vec![1, 2], BatchPolicy::ContinueOnFailure, |_, _| async {
            Err::<u32, _>(Error::from(AuthError::MissingToken {
                headers: BTreeMap::new(),
            }))
        })
        .await
        .unwrap_err();

        assert_eq!(aborted.item_index, 0);
        assert!(aborted.completed.is_empty());
    }

    #[test]
    fn error_record_serializes_camel_case() {
        let outcome: ItemOutcome<Value> = ItemOutcome::Failed(ErrorRecord {
            error: "not found: x".to_string(),
            item_index: 4,
        });
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({ "error": "not found: x", "itemIndex": 4 })
        );
    }
}

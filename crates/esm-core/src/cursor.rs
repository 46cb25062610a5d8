//! Persisted poll state.
//!
//! A [`PollCursor`] survives across poll invocations of one trigger. It is
//! owned by the host: loaded before a cycle, handed to the orchestrator by
//! mutable reference, and stored again afterwards. Every mutation bumps its
//! `version`, so a store can refuse a write based on a stale read.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::card::DataCard;

/// Number of DataCard ids remembered across poll cycles.
pub const WINDOW_CAPACITY: usize = 1000;

/// A bounded FIFO of recently emitted DataCard ids.
///
/// Eviction is by commit order, oldest first; lookups do not refresh an
/// entry. Serializes as a plain array of ids, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct DedupWindow {
    order: VecDeque<String>,
    counts: HashMap<String, usize>,
}

impl DedupWindow {
    /// Create an empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the id is inside the window.
    pub fn contains(&self, id: &str) -> bool {
        self.counts.contains_key(id)
    }

    /// Returns the number of remembered ids.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if no ids are remembered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate over remembered ids, oldest first.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(String::as_str)
    }

    /// Drop every candidate whose id has already been committed.
    ///
    /// Candidates without an id are kept; they can never be committed.
    pub fn filter_new(&self, candidates: Vec<DataCard>) -> Vec<DataCard> {
        candidates
            .into_iter()
            .filter(|card| match &card.id {
                Some(id) => !self.contains(id.as_str()),
                None => true,
            })
            .collect()
    }

    /// Remember the ids of the records actually emitted.
    ///
    /// Only pass records that were returned to the caller: committing a
    /// fetched-but-dropped record suppresses it forever. Returns the number
    /// of ids appended.
    pub fn commit(&mut self, emitted: &[DataCard]) -> usize {
        let mut appended = 0;
        for id in emitted.iter().filter_map(|card| card.id.as_ref()) {
            self.push(id.as_str().to_string());
            appended += 1;
        }
        appended
    }

    fn push(&mut self, id: String) {
        *self.counts.entry(id.clone()).or_insert(0) += 1;
        self.order.push_back(id);

        while self.order.len() > WINDOW_CAPACITY {
            let Some(evicted) = self.order.pop_front() else {
                break;
            };
            if let Some(count) = self.counts.get_mut(&evicted) {
                *count -= 1;
                if *count == 0 {
                    self.counts.remove(&evicted);
                }
            }
        }
    }
}

impl From<Vec<String>> for DedupWindow {
    fn from(ids: Vec<String>) -> Self {
        let mut window = Self::new();
        for id in ids {
            window.push(id);
        }
        window
    }
}

impl From<DedupWindow> for Vec<String> {
    fn from(window: DedupWindow) -> Self {
        window.order.into_iter().collect()
    }
}

/// Durable state of one poll trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollCursor {
    #[serde(default)]
    last_filter_id: u64,
    #[serde(default)]
    processed_ids: DedupWindow,
    #[serde(default)]
    version: u64,
}

impl PollCursor {
    /// Create the state of a trigger that has never polled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the `filterId` the next incremental fetch starts from.
    pub fn last_filter_id(&self) -> u64 {
        self.last_filter_id
    }

    /// Returns the dedup window.
    pub fn window(&self) -> &DedupWindow {
        &self.processed_ids
    }

    /// Returns the mutation counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Move the cursor forward. Never moves it backwards.
    ///
    /// Returns true if the cursor changed.
    pub fn advance(&mut self, filter_id: u64) -> bool {
        if filter_id > self.last_filter_id {
            self.last_filter_id = filter_id;
            self.version += 1;
            true
        } else {
            false
        }
    }

    /// Commit emitted records to the dedup window.
    pub fn commit(&mut self, emitted: &[DataCard]) -> usize {
        let appended = self.processed_ids.commit(emitted);
        if appended > 0 {
            self.version += 1;
        }
        appended
    }
}

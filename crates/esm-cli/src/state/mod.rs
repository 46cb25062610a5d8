//! Durable poll state, one file per trigger.

pub mod storage;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use esm_core::PollCursor;

/// Contents of one state file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredState {
    /// Instance the cursor belongs to.
    pub base_url: String,
    /// Template the cursor belongs to.
    pub template: String,
    pub updated_at: DateTime<Utc>,
    pub cursor: PollCursor,
}

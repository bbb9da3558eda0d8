//! Per-item results of one worker iteration.
//!
//! Item-level faults never stop a worker. Instead of only logging them the
//! worker returns an `ItemOutcome`, and the pool aggregates those into
//! counts (`app::status`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// Extraction succeeded and every record reached the sink.
    Completed { stored: usize },

    /// The item was dropped because of a fault; the worker moved on.
    Skipped(SkipReason),

    /// Cancellation fired while the item was in flight. Not requeued.
    Abandoned,
}

impl ItemOutcome {
    pub fn records_stored(&self) -> usize {
        match self {
            ItemOutcome::Completed { stored } => *stored,
            ItemOutcome::Skipped(SkipReason::Store { stored, .. }) => *stored,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Payload is not a valid `Task`.
    Decode(String),

    /// The extractor returned an error for this task.
    Extract(String),

    /// At least one record could not be appended to the sink.
    Store {
        stored: usize,
        failed: usize,
        last_error: String,
    },
}

//! Status - 実行結果の集計
//!
//! Every worker turns its `ItemOutcome`s into an `ItemCounts`, and the pool
//! folds the worker reports into one `PoolReport` when `start` returns.

use serde::{Deserialize, Serialize};

use crate::domain::{ItemOutcome, SkipReason, StopReason};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCounts {
    /// Items taken off the queue.
    pub popped: usize,
    pub completed: usize,
    pub records_stored: usize,
    pub decode_failures: usize,
    pub extract_failures: usize,
    pub store_failures: usize,
    pub abandoned: usize,
    /// `pop` failures other than `Empty`.
    pub pop_errors: usize,
}

impl ItemCounts {
    pub fn record(&mut self, outcome: &ItemOutcome) {
        self.popped += 1;
        self.records_stored += outcome.records_stored();
        match outcome {
            ItemOutcome::Completed { .. } => self.completed += 1,
            ItemOutcome::Skipped(SkipReason::Decode(_)) => self.decode_failures += 1,
            ItemOutcome::Skipped(SkipReason::Extract(_)) => self.extract_failures += 1,
            ItemOutcome::Skipped(SkipReason::Store { .. }) => self.store_failures += 1,
            ItemOutcome::Abandoned => self.abandoned += 1,
        }
    }

    pub fn merge(&mut self, other: &ItemCounts) {
        self.popped += other.popped;
        self.completed += other.completed;
        self.records_stored += other.records_stored;
        self.decode_failures += other.decode_failures;
        self.extract_failures += other.extract_failures;
        self.store_failures += other.store_failures;
        self.abandoned += other.abandoned;
        self.pop_errors += other.pop_errors;
    }

    /// Items that were skipped because of a fault.
    pub fn failed(&self) -> usize {
        self.decode_failures + self.extract_failures + self.store_failures
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub counts: ItemCounts,
    pub stop: StopReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolReport {
    pub workers: Vec<WorkerReport>,
    /// Workers whose task panicked instead of returning a report.
    pub panicked: usize,
}

impl PoolReport {
    pub fn totals(&self) -> ItemCounts {
        let mut totals = ItemCounts::default();
        for worker in &self.workers {
            totals.merge(&worker.counts);
        }
        totals
    }

    pub fn cancelled(&self) -> bool {
        self.workers.iter().any(|w| w.stop == StopReason::Cancelled)
    }
}

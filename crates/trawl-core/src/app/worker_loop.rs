//! WorkerLoop - pop → decode → extract → store
//!
//! One worker runs until the queue is exhausted or the shared token is
//! cancelled. Faults on a single item are logged, turned into an
//! `ItemOutcome` and never end the loop.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::status::{ItemCounts, WorkerReport};
use crate::domain::{ItemOutcome, SkipReason, StopReason, Task};
use crate::ports::{ExtractError, Extractor, Queue, QueueError, Sink};

pub struct WorkerLoop {
    worker_id: usize,
    queue: Arc<dyn Queue>,
    sink: Arc<dyn Sink>,
    extractor: Arc<dyn Extractor>,
    cancel: CancellationToken,
}

impl WorkerLoop {
    pub fn new(
        worker_id: usize,
        queue: Arc<dyn Queue>,
        sink: Arc<dyn Sink>,
        extractor: Arc<dyn Extractor>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            worker_id,
            queue,
            sink,
            extractor,
            cancel,
        }
    }

    pub async fn run(self) -> WorkerReport {
        let worker_id = self.worker_id;
        let mut counts = ItemCounts::default();

        let stop = loop {
            // cancel はループ先頭でだけ見る（ロック待ちや処理中は割り込まない）
            if self.cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            let payload = match self.queue.pop().await {
                Ok(payload) => payload,
                Err(QueueError::Empty) => break StopReason::Exhausted,
                Err(error) => {
                    tracing::warn!(worker_id, %error, "pop task from queue failed");
                    counts.pop_errors += 1;
                    tokio::task::yield_now().await;
                    continue;
                }
            };

            let outcome = self.process(&payload).await;
            counts.record(&outcome);
        };

        tracing::debug!(worker_id, ?stop, popped = counts.popped, "worker stopped");
        WorkerReport {
            worker_id,
            counts,
            stop,
        }
    }

    /// Handle one popped payload end to end.
    pub async fn process(&self, payload: &[u8]) -> ItemOutcome {
        let worker_id = self.worker_id;

        let task = match Task::from_payload(payload) {
            Ok(task) => task,
            Err(error) => {
                tracing::warn!(worker_id, %error, "decode task failed");
                return ItemOutcome::Skipped(SkipReason::Decode(error.to_string()));
            }
        };

        let records = match self.extractor.extract(&self.cancel, &task).await {
            Ok(records) => records,
            Err(ExtractError::Cancelled) => {
                tracing::debug!(worker_id, task = task.name(), "extraction abandoned on shutdown");
                return ItemOutcome::Abandoned;
            }
            Err(error) => {
                tracing::warn!(worker_id, task = task.name(), %error, "extract task failed");
                return ItemOutcome::Skipped(SkipReason::Extract(error.to_string()));
            }
        };

        let mut stored = 0;
        let mut failed = 0;
        let mut last_error = None;
        for record in &records {
            match self.sink.append(record).await {
                Ok(()) => stored += 1,
                Err(error) => {
                    tracing::warn!(worker_id, task = task.name(), %error, "store record failed");
                    failed += 1;
                    last_error = Some(error.to_string());
                }
            }
        }

        match last_error {
            None => {
                tracing::info!(worker_id, task = task.name(), records = stored, "task completed");
                ItemOutcome::Completed { stored }
            }
            Some(last_error) => ItemOutcome::Skipped(SkipReason::Store {
                stored,
                failed,
                last_error,
            }),
        }
    }
}

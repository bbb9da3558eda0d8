//! TaskProducer - バッチファイルをキューへ投入
//!
//! The batch is read in one shot and pushed in file order. The first error
//! aborts the run; already pushed tasks stay in the queue. Re-running the
//! whole batch is safe under at-least-once delivery, it only duplicates.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::TaskBatch;
use crate::ports::{Queue, QueueError};

#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("read task file {} failed: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse task file {} failed: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("marshal task {name:?} failed: {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("push task {name:?} (#{index}) to queue failed: {source}")]
    Push {
        index: usize,
        name: String,
        #[source]
        source: QueueError,
    },

    #[error("cancelled after pushing {pushed} task(s)")]
    Cancelled { pushed: usize },

    #[error("close queue failed: {0}")]
    Close(#[source] QueueError),
}

pub struct TaskProducer {
    batch_path: PathBuf,
    queue: Arc<dyn Queue>,
}

impl TaskProducer {
    pub fn new(batch_path: impl Into<PathBuf>, queue: Arc<dyn Queue>) -> Self {
        Self {
            batch_path: batch_path.into(),
            queue,
        }
    }

    pub fn batch_path(&self) -> &Path {
        &self.batch_path
    }

    pub async fn load_batch(&self) -> Result<TaskBatch, ProducerError> {
        let bytes = tokio::fs::read(&self.batch_path)
            .await
            .map_err(|source| ProducerError::Read {
                path: self.batch_path.clone(),
                source,
            })?;
        TaskBatch::from_json(&bytes).map_err(|source| ProducerError::Parse {
            path: self.batch_path.clone(),
            source,
        })
    }

    /// Push every task of the batch. Returns how many were pushed.
    pub async fn start(&self, cancel: &CancellationToken) -> Result<usize, ProducerError> {
        let batch = self.load_batch().await?;
        tracing::info!(
            path = %self.batch_path.display(),
            tasks = batch.len(),
            "loaded task batch"
        );

        let mut pushed = 0;
        for (index, task) in batch.tasks.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ProducerError::Cancelled { pushed });
            }

            let payload = task.to_payload().map_err(|source| ProducerError::Encode {
                name: task.name().to_string(),
                source,
            })?;
            self.queue
                .push(&payload)
                .await
                .map_err(|source| ProducerError::Push {
                    index,
                    name: task.name().to_string(),
                    source,
                })?;

            tracing::debug!(task = task.name(), index, "pushed task");
            pushed += 1;
        }

        tracing::info!(pushed, "task batch submitted");
        Ok(pushed)
    }

    pub async fn close(&self) -> Result<(), ProducerError> {
        self.queue.close().await.map_err(ProducerError::Close)
    }
}

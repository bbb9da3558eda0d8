//! Queue port - 永続キューの抽象化
//!
//! The contract every queue implementation honors:
//! - `push` appends; it never blocks on consumers.
//! - `pop` hands out each item at most once per queue instance and reports
//!   `QueueError::Empty` when nothing unseen remains. Workers treat `Empty`
//!   as "no more work", not as a fault.
//! - `close` forgets what this instance has handed out. Items stay.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::IdError;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue is empty")]
    Empty,

    /// Reserved for bounded queues; the file queue is unbounded.
    #[error("queue is full")]
    Full,

    #[error("queue log {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode queue item: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Id(#[from] IdError),
}

impl QueueError {
    /// True for the exhaustion condition that ends a worker gracefully.
    pub fn is_empty(&self) -> bool {
        matches!(self, QueueError::Empty)
    }
}

#[async_trait]
pub trait Queue: Send + Sync {
    /// Append one opaque payload.
    async fn push(&self, payload: &[u8]) -> Result<(), QueueError>;

    /// Take the next payload this instance has not handed out yet.
    async fn pop(&self) -> Result<Vec<u8>, QueueError>;

    /// Reset the in-memory consumption state.
    async fn close(&self) -> Result<(), QueueError>;
}

//! Sink port - 抽出結果の保存先

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Record;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("record store {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Append-only destination for extracted records.
///
/// Implementations must be safe to call from many workers at once; a single
/// `append` is never interleaved with another.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn append(&self, record: &Record) -> Result<(), SinkError>;

    async fn close(&self) -> Result<(), SinkError>;
}

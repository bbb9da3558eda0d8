//! Extractor port - Fetch/Extract collaborator
//!
//! Turns one `Task` into zero or more `Record`s. An `Err` means this task is
//! lost (network error, non-success status, unparsable content); the worker
//! logs it and moves on. The token is the worker's cancellation signal and
//! must abort in-flight requests promptly.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::{Record, Task};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status code: {0}")]
    Status(u16),

    #[error("unparsable content: {0}")]
    Content(String),

    #[error("cancelled")]
    Cancelled,
}

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        cancel: &CancellationToken,
        task: &Task,
    ) -> Result<Vec<Record>, ExtractError>;
}

//! Run configuration for the producer and consumer sides.
//!
//! Defaults mirror the command-line defaults of the `trawl` binary.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::impls::DEFAULT_REQUEST_TIMEOUT;

pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_QUEUE: &str = "data/queue.data";
pub const DEFAULT_STORAGE: &str = "data/results.jsonl";
pub const DEFAULT_BATCH: &str = "tasks.json";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported queue scheme {0:?} (only file:// is supported)")]
    UnsupportedScheme(String),

    #[error("queue location is empty")]
    EmptyQueuePath,

    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
}

/// Where the queue log lives: `file://<path>` or a bare path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueLocation {
    path: PathBuf,
}

impl QueueLocation {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let path = match s.split_once("://") {
            Some(("file", rest)) => rest,
            Some((scheme, _)) => return Err(ConfigError::UnsupportedScheme(scheme.to_string())),
            None => s,
        };
        if path.is_empty() {
            return Err(ConfigError::EmptyQueuePath);
        }
        Ok(Self {
            path: PathBuf::from(path),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FromStr for QueueLocation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Default for QueueLocation {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_QUEUE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerConfig {
    pub batch: PathBuf,
    pub queue: QueueLocation,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            batch: PathBuf::from(DEFAULT_BATCH),
            queue: QueueLocation::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    pub workers: usize,
    pub queue: QueueLocation,
    pub storage: PathBuf,
    pub request_timeout: Duration,
}

impl ConsumerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue: QueueLocation::default(),
            storage: PathBuf::from(DEFAULT_STORAGE),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

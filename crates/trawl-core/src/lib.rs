//! trawl-core
//!
//! Durable task distribution: a producer appends fetch tasks to a
//! file-backed queue, a pool of workers pops them, hands each to an
//! `Extractor` and appends the resulting records to a `Sink`.
//!
//! # モジュール構成
//! - **domain**: Task, QueueItem, Record, ItemOutcome, ids
//! - **ports**: Queue, Sink, Extractor, Clock
//! - **impls**: FileQueue, FileSink, InMemorySink, HttpExtractor
//! - **app**: TaskProducer, WorkerPool, WorkerLoop, builders, status
//! - **config**: producer / consumer settings
//!
//! # Delivery
//! At-least-once. A queue instance never hands out the same item twice,
//! but the consumption set is not persisted: a restarted consumer sees the
//! whole log again.

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{ConsumerBuilder, PoolReport, ProducerBuilder, TaskProducer, WorkerPool};
pub use domain::{Record, Task, TaskBatch};
pub use ports::{Extractor, Queue, QueueError, Sink};

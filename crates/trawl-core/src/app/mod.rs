//! App - アプリケーション層
//!
//! ports を組み合わせてパイプラインを動かす。
//!
//! # 主要コンポーネント
//! - **TaskProducer**: batch file → queue
//! - **WorkerPool**: N 本の WorkerLoop を起動して全員の終了を待つ
//! - **WorkerLoop**: pop → decode → extract → store
//! - **ProducerBuilder / ConsumerBuilder**: config からの組み立て（fail-fast）
//! - **status**: per-run counts

pub mod builder;
pub mod pool;
pub mod producer;
pub mod status;
pub mod worker_loop;

pub use self::builder::{BuildError, ConsumerBuilder, ProducerBuilder};
pub use self::pool::{PoolError, WorkerPool};
pub use self::producer::{ProducerError, TaskProducer};
pub use self::status::{ItemCounts, PoolReport, WorkerReport};
pub use self::worker_loop::WorkerLoop;

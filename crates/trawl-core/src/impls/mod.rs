//! Impls - ports の実装
//!
//! - **FileQueue**: append-only JSON lines queue log
//! - **FileSink**: append-only JSON lines record store
//! - **InMemorySink**: 開発・テスト用
//! - **HttpExtractor**: generic reqwest-based fetcher

pub mod file_queue;
pub mod file_sink;
pub mod http_extractor;
pub mod memory_sink;

pub use self::file_queue::FileQueue;
pub use self::file_sink::FileSink;
pub use self::http_extractor::{DEFAULT_REQUEST_TIMEOUT, HttpExtractor};
pub use self::memory_sink::InMemorySink;

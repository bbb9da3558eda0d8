//! Ports - 抽象化レイヤー
//!
//! The worker pool and the producer only see these traits. File-backed and
//! in-memory implementations live in `impls`.

pub mod clock;
pub mod extractor;
pub mod queue;
pub mod sink;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::extractor::{ExtractError, Extractor};
pub use self::queue::{Queue, QueueError};
pub use self::sink::{Sink, SinkError};

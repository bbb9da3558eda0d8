//! Domain model: tasks, queue items, records, per-item outcomes.

pub mod ids;
pub mod item;
pub mod outcome;
pub mod record;
pub mod state;
pub mod task;

pub use self::ids::{IdError, ItemId, UlidGenerator};
pub use self::item::QueueItem;
pub use self::outcome::{ItemOutcome, SkipReason};
pub use self::record::Record;
pub use self::state::StopReason;
pub use self::task::{Task, TaskBatch};

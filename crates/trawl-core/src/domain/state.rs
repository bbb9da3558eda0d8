//! Worker lifecycle.
//!
//! Running -> (Popping -> Processing)* -> Stopped
//!
//! There is no failed state: a worker only stops for one of the reasons
//! below.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The queue reported `Empty`.
    Exhausted,

    /// The shared cancellation token fired.
    Cancelled,
}

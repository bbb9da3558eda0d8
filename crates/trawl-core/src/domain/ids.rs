//! Queue item identifiers.
//!
//! `ItemId` wraps a ULID: the first 48 bits are the creation time in
//! milliseconds, so ids sort by creation time. Within one millisecond the
//! monotonic generator increments the random part, which keeps ids strictly
//! increasing for a single writer.

use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ulid::{Generator, Ulid};

use crate::ports::Clock;

/// Identifier of a `QueueItem`, unique within one queue log.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Ulid);

impl ItemId {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for ItemId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ItemId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

#[derive(Debug, Error)]
#[error("item id space exhausted for the current millisecond")]
pub struct IdError;

/// Mints strictly increasing `ItemId`s from a `Clock`.
///
/// The clock only supplies the timestamp part; ordering comes from the
/// wrapped `ulid::Generator`, which also covers a clock that stands still
/// (`FixedClock`) or steps backwards.
pub struct UlidGenerator<C> {
    clock: C,
    inner: Mutex<Generator>,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            inner: Mutex::new(Generator::new()),
        }
    }

    pub fn next_id(&self) -> Result<ItemId, IdError> {
        let now = SystemTime::from(self.clock.now());
        // 生成器の状態は Ulid 1 個だけなので poison されても使い続けてよい
        let mut generator = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        generator
            .generate_from_datetime(now)
            .map(ItemId::from)
            .map_err(|_| IdError)
    }
}

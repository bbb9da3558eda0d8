//! QueueItem: one line of the durable queue log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::ItemId;

/// Envelope around one enqueued payload.
///
/// Created by `push`, never mutated, never removed from the log. The payload
/// is opaque to the queue and stored base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: ItemId,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    pub timestamp: DateTime<Utc>,
}

impl QueueItem {
    pub fn new(id: ItemId, data: Vec<u8>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            data,
            timestamp,
        }
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::prelude::BASE64_STANDARD;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64_STANDARD.decode(encoded).map_err(de::Error::custom)
    }
}

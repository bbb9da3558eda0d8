//! Fetch tasks and the batch descriptor the producer reads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A remote resource to fetch: name, target URL and request headers.
///
/// Fields are private so a task cannot change after it has been built or
/// decoded. The JSON form is what travels through the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    name: String,
    url: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
}

impl Task {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Adds a header. A repeated key replaces the earlier value.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

/// Batch descriptor: one JSON object holding the ordered task list.
///
/// ```json
/// { "tasks": [ { "name": "...", "url": "...", "headers": { "k": "v" } } ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBatch {
    pub tasks: Vec<Task>,
}

impl TaskBatch {
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

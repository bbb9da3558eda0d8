//! InMemorySink - 開発・テスト用の保存先

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::Record;
use crate::ports::{Sink, SinkError};

#[derive(Default)]
pub struct InMemorySink {
    records: Mutex<Vec<Record>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far, in append order.
    pub async fn records(&self) -> Vec<Record> {
        self.records.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl Sink for InMemorySink {
    async fn append(&self, record: &Record) -> Result<(), SinkError> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }

    async fn close(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

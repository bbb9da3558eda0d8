//! FileQueue - append-only JSON lines log on local disk
//!
//! # 設計
//! - Every `push` appends one `QueueItem` line; nothing is ever rewritten.
//! - `pop` re-reads the log from the top and returns the first item whose id
//!   this instance has not handed out yet.
//! - The consumption set lives in memory only. A new `FileQueue` over the
//!   same log starts from an empty set and re-delivers everything
//!   (at-least-once).
//! - One async mutex covers each whole operation, including the file I/O.

use std::collections::HashSet;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::domain::{ItemId, QueueItem, UlidGenerator};
use crate::ports::{Clock, Queue, QueueError, SystemClock};

/// State guarded by the queue lock.
struct FileQueueState {
    /// Ids returned by `pop` during this instance's lifetime.
    consumed: HashSet<ItemId>,
}

pub struct FileQueue {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    ids: UlidGenerator<Arc<dyn Clock>>,
    state: Mutex<FileQueueState>,
}

impl FileQueue {
    /// Open (or prepare) the log at `path`, creating its parent directory.
    ///
    /// The log file itself is created lazily by the first `push`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, QueueError> {
        Self::open_with_clock(path, Arc::new(SystemClock)).await
    }

    pub async fn open_with_clock(
        path: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, QueueError> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await.map_err(|source| QueueError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        Ok(Self {
            path,
            ids: UlidGenerator::new(Arc::clone(&clock)),
            clock,
            state: Mutex::new(FileQueueState {
                consumed: HashSet::new(),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of items this instance has handed out so far.
    pub async fn consumed_count(&self) -> usize {
        self.state.lock().await.consumed.len()
    }

    /// True when the log ends in a partial line, e.g. after a crash mid-append.
    async fn ends_with_torn_line(&self) -> Result<bool, QueueError> {
        let mut file = match fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(self.io_error(e)),
        };
        let len = file.metadata().await.map_err(|e| self.io_error(e))?.len();
        if len == 0 {
            return Ok(false);
        }

        file.seek(SeekFrom::End(-1)).await.map_err(|e| self.io_error(e))?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last).await.map_err(|e| self.io_error(e))?;
        Ok(last[0] != b'\n')
    }

    fn io_error(&self, source: std::io::Error) -> QueueError {
        QueueError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl Queue for FileQueue {
    async fn push(&self, payload: &[u8]) -> Result<(), QueueError> {
        let _state = self.state.lock().await;

        let item = QueueItem::new(self.ids.next_id()?, payload.to_vec(), self.clock.now());
        let mut line = Vec::new();
        // 切れた行の後ろに連結されないよう改行で閉じる
        if self.ends_with_torn_line().await? {
            tracing::warn!(path = %self.path.display(), "queue log ends in a partial record, closing it");
            line.push(b'\n');
        }
        serde_json::to_writer(&mut line, &item)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        file.write_all(&line).await.map_err(|e| self.io_error(e))?;
        // tokio の File は drop 時に書き込み完了を待たないので明示的に flush
        file.flush().await.map_err(|e| self.io_error(e))?;

        tracing::debug!(item_id = %item.id, bytes = payload.len(), "pushed queue item");
        Ok(())
    }

    async fn pop(&self) -> Result<Vec<u8>, QueueError> {
        let mut state = self.state.lock().await;

        let file = match fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(QueueError::Empty),
            Err(e) => return Err(self.io_error(e)),
        };

        // 生のバイト列で読む（UTF-8 でない行も skip 対象）
        let mut lines = BufReader::new(file).split(b'\n');
        let mut line_no = 0usize;
        while let Some(line) = lines.next_segment().await.map_err(|e| self.io_error(e))? {
            line_no += 1;
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let item: QueueItem = match serde_json::from_slice(&line) {
                Ok(item) => item,
                Err(error) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = line_no,
                        %error,
                        "skipping undecodable queue record"
                    );
                    continue;
                }
            };

            if state.consumed.insert(item.id) {
                tracing::debug!(item_id = %item.id, "popped queue item");
                return Ok(item.data);
            }
        }

        Err(QueueError::Empty)
    }

    async fn close(&self) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state.consumed.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use std::collections::HashSet;
    use tempfile::TempDir;

    use crate::ports::FixedClock;

    fn append_raw(queue: &FileQueue, bytes: &[u8]) {
        let mut raw = std::fs::read(queue.path()).unwrap();
        raw.extend_from_slice(bytes);
        std::fs::write(queue.path(), raw).unwrap();
    }

    async fn queue_in(dir: &TempDir) -> FileQueue {
        FileQueue::open(dir.path().join("queue.data")).await.unwrap()
    }

    #[tokio::test]
    async fn pops_in_push_order_then_reports_empty() {
        let dir = TempDir::new().unwrap();
        let queue = queue_in(&dir).await;

        for payload in [b"A", b"B", b"C"] {
            queue.push(payload).await.unwrap();
        }

        assert_eq!(queue.pop().await.unwrap(), b"A");
        assert_eq!(queue.pop().await.unwrap(), b"B");
        assert_eq!(queue.pop().await.unwrap(), b"C");
        assert!(matches!(queue.pop().await, Err(QueueError::Empty)));
    }

    #[tokio::test]
    async fn fresh_instance_redelivers_consumed_items() {
        let dir = TempDir::new().unwrap();
        let queue = queue_in(&dir).await;
        for payload in [b"A", b"B", b"C"] {
            queue.push(payload).await.unwrap();
        }
        while queue.pop().await.is_ok() {}
        queue.close().await.unwrap();

        let reopened = queue_in(&dir).await;
        assert_eq!(reopened.pop().await.unwrap(), b"A");
    }

    #[tokio::test]
    async fn close_resets_consumption_of_same_instance() {
        let dir = TempDir::new().unwrap();
        let queue = queue_in(&dir).await;
        queue.push(b"only").await.unwrap();

        assert_eq!(queue.pop().await.unwrap(), b"only");
        assert!(queue.pop().await.unwrap_err().is_empty());

        queue.close().await.unwrap();
        assert_eq!(queue.consumed_count().await, 0);
        assert_eq!(queue.pop().await.unwrap(), b"only");
    }

    #[tokio::test]
    async fn missing_log_is_empty_not_an_error() {
        let dir = TempDir::new().unwrap();
        let queue = FileQueue::open(dir.path().join("nested/dir/queue.data"))
            .await
            .unwrap();

        assert!(dir.path().join("nested/dir").is_dir());
        assert!(matches!(queue.pop().await, Err(QueueError::Empty)));
    }

    #[rstest]
    #[case(1)]
    #[case(7)]
    #[case(50)]
    #[tokio::test]
    async fn log_only_grows_and_prefix_is_never_rewritten(#[case] pushes: usize) {
        let dir = TempDir::new().unwrap();
        let queue = queue_in(&dir).await;

        let mut previous: Vec<u8> = Vec::new();
        for i in 0..pushes {
            queue.push(format!("payload-{i}").as_bytes()).await.unwrap();
            if i % 3 == 0 {
                let _ = queue.pop().await;
            }

            let current = std::fs::read(queue.path()).unwrap();
            assert!(current.len() > previous.len());
            assert_eq!(&current[..previous.len()], previous.as_slice());
            previous = current;
        }
    }

    #[tokio::test]
    async fn undecodable_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let queue = queue_in(&dir).await;
        queue.push(b"first").await.unwrap();

        // crash 途中で切れた行を模擬（末尾の改行なし）
        append_raw(&queue, b"{\"id\":\"01H");
        queue.push(b"second").await.unwrap();

        assert_eq!(queue.pop().await.unwrap(), b"first");
        assert_eq!(queue.pop().await.unwrap(), b"second");
        assert!(queue.pop().await.unwrap_err().is_empty());
    }

    #[tokio::test]
    async fn non_utf8_lines_are_skipped_not_reported_as_io_errors() {
        let dir = TempDir::new().unwrap();
        let queue = queue_in(&dir).await;
        queue.push(b"a").await.unwrap();
        append_raw(&queue, b"\xff\xfe garbage\n");
        queue.push(b"b").await.unwrap();

        assert_eq!(queue.pop().await.unwrap(), b"a");
        assert_eq!(queue.pop().await.unwrap(), b"b");
        assert!(matches!(queue.pop().await, Err(QueueError::Empty)));
    }

    #[tokio::test]
    async fn push_after_intact_log_adds_no_blank_line() {
        let dir = TempDir::new().unwrap();
        let queue = queue_in(&dir).await;
        queue.push(b"x").await.unwrap();
        queue.push(b"y").await.unwrap();

        let raw = std::fs::read_to_string(queue.path()).unwrap();
        assert_eq!(raw.lines().count(), 2);
        assert!(raw.lines().all(|l| !l.is_empty()));
    }

    #[tokio::test]
    async fn ids_stay_unique_under_a_frozen_clock() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let queue = FileQueue::open_with_clock(dir.path().join("queue.data"), clock)
            .await
            .unwrap();

        for i in 0..20 {
            queue.push(format!("{i}").as_bytes()).await.unwrap();
        }

        let raw = std::fs::read_to_string(queue.path()).unwrap();
        let items: Vec<QueueItem> = raw
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(items.len(), 20);
        assert!(items.windows(2).all(|w| w[0].id < w[1].id));
        assert!(items.iter().all(|i| i.timestamp == items[0].timestamp));

        for i in 0..20 {
            assert_eq!(queue.pop().await.unwrap(), format!("{i}").into_bytes());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_pops_never_hand_out_an_item_twice() {
        let dir = TempDir::new().unwrap();
        let queue = Arc::new(queue_in(&dir).await);
        for i in 0..40 {
            queue.push(format!("item-{i}").as_bytes()).await.unwrap();
        }

        let mut joins = Vec::new();
        for _ in 0..8 {
            let queue = Arc::clone(&queue);
            joins.push(tokio::spawn(async move {
                let mut got = Vec::new();
                while let Ok(payload) = queue.pop().await {
                    got.push(String::from_utf8(payload).unwrap());
                }
                got
            }));
        }

        let mut all = Vec::new();
        for join in joins {
            all.extend(join.await.unwrap());
        }
        let unique: HashSet<_> = all.iter().cloned().collect();
        assert_eq!(all.len(), 40);
        assert_eq!(unique.len(), 40);
    }
}

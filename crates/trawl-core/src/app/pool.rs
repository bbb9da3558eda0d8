//! WorkerPool - N 本の WorkerLoop を起動して全員の終了を待つ
//!
//! All workers share one queue, one sink and one extractor. The pool only
//! fails at construction and close; item faults end up in the `PoolReport`.

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::status::{PoolReport, WorkerReport};
use super::worker_loop::WorkerLoop;
use crate::ports::{Extractor, Queue, QueueError, Sink, SinkError};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("close queue failed: {0}")]
    CloseQueue(#[source] QueueError),

    #[error("close storage failed: {0}")]
    CloseSink(#[source] SinkError),
}

/// Fixed-size pool of workers sharing one queue, one sink and one extractor.
///
/// - `start` spawns the workers and resolves once every one of them stopped.
/// - Item-level faults only show up in the returned `PoolReport`.
pub struct WorkerPool {
    workers: usize,
    queue: Arc<dyn Queue>,
    sink: Arc<dyn Sink>,
    extractor: Arc<dyn Extractor>,
}

impl WorkerPool {
    pub fn new(
        workers: usize,
        queue: Arc<dyn Queue>,
        sink: Arc<dyn Sink>,
        extractor: Arc<dyn Extractor>,
    ) -> Result<Self, PoolError> {
        if workers == 0 {
            return Err(PoolError::NoWorkers);
        }
        Ok(Self {
            workers,
            queue,
            sink,
            extractor,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run all workers to completion.
    ///
    /// Cancelling `cancel` stops every worker at its next iteration boundary;
    /// extraction calls in flight see the same token.
    pub async fn start(&self, cancel: CancellationToken) -> PoolReport {
        tracing::info!(workers = self.workers, "starting worker pool");

        let mut joins: Vec<JoinHandle<WorkerReport>> = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            let worker = WorkerLoop::new(
                worker_id,
                Arc::clone(&self.queue),
                Arc::clone(&self.sink),
                Arc::clone(&self.extractor),
                cancel.clone(),
            );
            joins.push(tokio::spawn(worker.run()));
        }

        let mut report = PoolReport::default();
        for join in joins {
            match join.await {
                Ok(worker) => report.workers.push(worker),
                Err(error) => {
                    tracing::error!(%error, "worker task panicked");
                    report.panicked += 1;
                }
            }
        }

        let totals = report.totals();
        tracing::info!(
            popped = totals.popped,
            completed = totals.completed,
            failed = totals.failed(),
            records = totals.records_stored,
            cancelled = report.cancelled(),
            "worker pool finished"
        );
        report
    }

    /// Close queue and sink. Both are attempted; the first error wins.
    pub async fn close(&self) -> Result<(), PoolError> {
        let queue = self.queue.close().await.map_err(PoolError::CloseQueue);
        let sink = self.sink.close().await.map_err(PoolError::CloseSink);
        queue.and(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::domain::{Record, Task};
    use crate::impls::InMemorySink;
    use crate::ports::ExtractError;

    struct EmptyQueue {
        closed: AtomicBool,
        fail_close: bool,
    }

    #[async_trait]
    impl Queue for EmptyQueue {
        async fn push(&self, _payload: &[u8]) -> Result<(), QueueError> {
            Ok(())
        }

        async fn pop(&self) -> Result<Vec<u8>, QueueError> {
            Err(QueueError::Empty)
        }

        async fn close(&self) -> Result<(), QueueError> {
            self.closed.store(true, Ordering::SeqCst);
            if self.fail_close {
                return Err(QueueError::Full);
            }
            Ok(())
        }
    }

    struct ClosingSink {
        closed: AtomicBool,
    }

    #[async_trait]
    impl Sink for ClosingSink {
        async fn append(&self, _record: &Record) -> Result<(), SinkError> {
            Ok(())
        }

        async fn close(&self) -> Result<(), SinkError> {
            self.closed.store(true, Ordering::SeqCst);
            Err(SinkError::Other("sink close failed".into()))
        }
    }

    struct NoopExtractor;

    #[async_trait]
    impl Extractor for NoopExtractor {
        async fn extract(
            &self,
            _cancel: &CancellationToken,
            _task: &Task,
        ) -> Result<Vec<Record>, ExtractError> {
            Ok(Vec::new())
        }
    }

    fn empty_queue(fail_close: bool) -> Arc<EmptyQueue> {
        Arc::new(EmptyQueue {
            closed: AtomicBool::new(false),
            fail_close,
        })
    }

    #[test]
    fn zero_workers_is_rejected() {
        let result = WorkerPool::new(
            0,
            empty_queue(false),
            Arc::new(InMemorySink::new()),
            Arc::new(NoopExtractor),
        );
        assert!(matches!(result, Err(PoolError::NoWorkers)));
    }

    #[tokio::test]
    async fn every_worker_reports_back_on_empty_queue() {
        let pool = WorkerPool::new(
            4,
            empty_queue(false),
            Arc::new(InMemorySink::new()),
            Arc::new(NoopExtractor),
        )
        .unwrap();

        let report = pool.start(CancellationToken::new()).await;
        assert_eq!(report.workers.len(), 4);
        assert_eq!(report.panicked, 0);
        assert!(!report.cancelled());
        assert_eq!(report.totals().popped, 0);
    }

    #[tokio::test]
    async fn close_attempts_sink_even_when_queue_close_fails() {
        let queue = empty_queue(true);
        let sink = Arc::new(ClosingSink {
            closed: AtomicBool::new(false),
        });
        let pool = WorkerPool::new(1, queue.clone(), sink.clone(), Arc::new(NoopExtractor)).unwrap();

        let err = pool.close().await.unwrap_err();
        assert!(matches!(err, PoolError::CloseQueue(QueueError::Full)));
        assert!(queue.closed.load(Ordering::SeqCst));
        assert!(sink.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn sink_close_error_surfaces_when_queue_closes_cleanly() {
        let sink = Arc::new(ClosingSink {
            closed: AtomicBool::new(false),
        });
        let pool = WorkerPool::new(1, empty_queue(false), sink, Arc::new(NoopExtractor)).unwrap();

        assert!(matches!(pool.close().await, Err(PoolError::CloseSink(_))));
    }
}

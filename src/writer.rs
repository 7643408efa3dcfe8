//! Buffered batch writer.
//!
//! Rows accumulate in an in-memory buffer and flush to the sink in
//! batches. Enqueue never blocks on, and never fails because of, the
//! sink: flushes run on spawned tasks, failed batches are requeued, and
//! when the buffer is full the oldest rows get dropped first.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::sink::{Row, SCHEMA, Sink};

#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub table: String,
    /// Buffered rows that trigger a background flush.
    pub batch_size: usize,
    /// Hard cap on buffered rows; beyond it the oldest are dropped.
    pub max_buffer_size: usize,
    pub auto_create_table: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            table: "ucp_events".to_owned(),
            batch_size: 50,
            max_buffer_size: 10_000,
            auto_create_table: true,
        }
    }
}

pub struct BufferedWriter {
    inner: Arc<Inner>,
    tasks: Mutex<JoinSet<()>>,
}

struct Inner {
    sink: Arc<dyn Sink>,
    table: String,
    batch_size: usize,
    max_buffer_size: usize,
    auto_create_table: bool,
    buffer: Mutex<VecDeque<Row>>,
    table_ensured: AtomicBool,
}

impl BufferedWriter {
    pub fn new(sink: Arc<dyn Sink>, config: WriterConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink,
                table: config.table,
                batch_size: config.batch_size.max(1),
                max_buffer_size: config.max_buffer_size.max(1),
                auto_create_table: config.auto_create_table,
                buffer: Mutex::new(VecDeque::new()),
                table_ensured: AtomicBool::new(false),
            }),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Buffer a row, spawning a background flush once a full batch is
    /// waiting. Never fails; a full buffer sheds its oldest row.
    pub async fn enqueue(&self, row: Row) {
        let should_flush = {
            let mut buffer = self.inner.buffer.lock().await;
            if buffer.len() >= self.inner.max_buffer_size {
                if let Some(dropped) = buffer.pop_front() {
                    let event_id = dropped
                        .get("event_id")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_owned();
                    warn!(event_id = %event_id, "event buffer full, dropping oldest row");
                }
            }
            buffer.push_back(row);
            buffer.len() >= self.inner.batch_size
        };
        if should_flush {
            let mut tasks = self.tasks.lock().await;
            // Reap finished flushes so the set stays small.
            while tasks.try_join_next().is_some() {}
            let inner = Arc::clone(&self.inner);
            tasks.spawn(async move { inner.flush().await });
        }
    }

    /// Flush whatever is buffered, inline.
    pub async fn flush(&self) {
        self.inner.flush().await;
    }

    /// Wait for all in-flight background flushes.
    pub async fn drain(&self) {
        let mut tasks = self.tasks.lock().await;
        while tasks.join_next().await.is_some() {}
    }

    /// Drain background flushes, then flush the remainder.
    pub async fn close(&self) {
        self.drain().await;
        self.inner.flush().await;
    }

    pub async fn buffered(&self) -> usize {
        self.inner.buffer.lock().await.len()
    }
}

impl Inner {
    async fn flush(&self) {
        let batch: Vec<Row> = {
            let mut buffer = self.buffer.lock().await;
            if buffer.is_empty() {
                return;
            }
            buffer.drain(..).collect()
        };

        if self.auto_create_table && !self.table_ensured.load(Ordering::Acquire) {
            match self.sink.ensure_table(&self.table, SCHEMA).await {
                Ok(()) => self.table_ensured.store(true, Ordering::Release),
                // Still attempt the insert: the table may already exist.
                Err(e) => error!(error = %e, table = %self.table, "ensure_table failed"),
            }
        }

        match self.sink.insert(&self.table, &batch).await {
            Ok(rejected) if rejected.is_empty() => {
                debug!(rows = batch.len(), table = %self.table, "flushed batch");
            }
            Ok(rejected) => {
                // Rejected rows would be rejected again; log and move on.
                for r in &rejected {
                    error!(row = r.row, message = %r.message, "sink rejected row");
                }
                debug!(
                    rows = batch.len() - rejected.len(),
                    rejected = rejected.len(),
                    table = %self.table,
                    "flushed batch with rejections"
                );
            }
            Err(e) => {
                error!(error = %e, rows = batch.len(), "batch insert failed, requeueing");
                let mut buffer = self.buffer.lock().await;
                for row in batch.into_iter().rev() {
                    buffer.push_front(row);
                }
                buffer.truncate(self.max_buffer_size);
            }
        }
    }
}

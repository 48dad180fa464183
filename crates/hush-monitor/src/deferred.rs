//! # Deferred Log Pool
//!
//! Verbose per-message logging must never stall a connection thread. The
//! interception stage hands [`LogRecord`]s to a [`DeferredLog`] handle,
//! which pushes them onto a bounded queue without waiting. A small, fixed
//! set of Tokio workers drains the queue and emits each record through
//! `tracing`.
//!
//! ```text
//!   connection threads            LogPool
//!  ┌──────────────────┐     ┌─────────────────────┐
//!  │ stage ─ defer() ─┼──▶  │ bounded mpsc queue  │
//!  │ stage ─ defer() ─┼──▶  │   ├─ worker 0 ──▶ tracing
//!  │ guard ─ defer() ─┼──▶  │   └─ worker 1 ──▶ tracing
//!  └──────────────────┘     └─────────────────────┘
//! ```
//!
//! ## Backpressure
//!
//! There is none, on purpose: when the queue is full the record is
//! discarded and counted in [`DeferredLog::dropped`].
//!
//! ## Shutdown
//!
//! [`LogPool::shutdown`] signals the workers, which close the queue and
//! drain whatever is already in it before exiting. Dropping the pool
//! without awaiting shutdown sends the same signal; records still queued
//! at runtime teardown may be lost.

use crate::error::{MonitorError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// Worker count used when the configuration does not say otherwise.
pub const DEFAULT_WORKERS: usize = 2;

/// Queue capacity used when the configuration does not say otherwise.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Severity of a deferred record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Per-message detail.
    Debug,
    /// Lifecycle detail (attach, detach, cancelled disconnects).
    Info,
    /// Rule failures and other fail-open events.
    Warn,
}

/// A log line waiting to be emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Severity.
    pub level: LogLevel,
    /// Connection the record concerns, if any.
    pub connection: Option<String>,
    /// Rendered message.
    pub message: String,
}

impl LogRecord {
    /// Creates a record with no connection attached.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            connection: None,
            message: message.into(),
        }
    }

    /// Shorthand for a [`LogLevel::Debug`] record.
    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, message)
    }

    /// Shorthand for a [`LogLevel::Info`] record.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    /// Shorthand for a [`LogLevel::Warn`] record.
    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, message)
    }

    /// Tags the record with a connection identity.
    #[must_use]
    pub fn with_connection(mut self, connection: impl ToString) -> Self {
        self.connection = Some(connection.to_string());
        self
    }

    /// Writes the record through `tracing`.
    pub fn emit(&self) {
        let connection = self.connection.as_deref().unwrap_or("-");
        match self.level {
            LogLevel::Debug => tracing::debug!(target: "hush", %connection, "{}", self.message),
            LogLevel::Info => tracing::info!(target: "hush", %connection, "{}", self.message),
            LogLevel::Warn => tracing::warn!(target: "hush", %connection, "{}", self.message),
        }
    }
}

/// Producer handle for the deferred log pool.
///
/// `Clone + Send + Sync`; hand one to every stage. [`defer`](Self::defer)
/// is safe to call from any thread, inside or outside a Tokio runtime.
#[derive(Debug, Clone)]
pub struct DeferredLog {
    tx: Option<mpsc::Sender<LogRecord>>,
    capacity: usize,
    dropped: Arc<AtomicU64>,
}

impl DeferredLog {
    /// A handle that discards every record.
    ///
    /// Used when no runtime is available to host a [`LogPool`].
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            tx: None,
            capacity: 0,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether a pool is behind this handle.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queues `record`, or discards it if the queue is full or closed.
    ///
    /// Returns `true` when the record was queued.
    pub fn defer(&self, record: LogRecord) -> bool {
        self.try_defer(record).is_ok()
    }

    /// Queues `record`, reporting why it was discarded otherwise.
    ///
    /// # Errors
    ///
    /// - [`MonitorError::Disabled`] for a [`disabled`](Self::disabled) handle
    /// - [`MonitorError::QueueFull`] when the queue is at capacity
    /// - [`MonitorError::Closed`] after the pool has shut down
    pub fn try_defer(&self, record: LogRecord) -> Result<()> {
        let Some(tx) = &self.tx else {
            return Err(MonitorError::Disabled);
        };
        tx.try_send(record).map_err(|err| {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            match err {
                TrySendError::Full(_) => MonitorError::QueueFull {
                    capacity: self.capacity,
                },
                TrySendError::Closed(_) => MonitorError::Closed,
            }
        })
    }

    /// Records discarded because the queue was full or closed.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Fixed-size pool of Tokio workers emitting deferred records.
#[derive(Debug)]
pub struct LogPool {
    log: DeferredLog,
    stop: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl LogPool {
    /// Spawns `workers` tasks draining a queue of `capacity` records.
    ///
    /// Both values are clamped to at least one.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime, like `tokio::spawn`.
    #[must_use]
    pub fn start(workers: usize, capacity: usize) -> Self {
        let workers = workers.max(1);
        let capacity = capacity.max(1);

        let (tx, rx) = mpsc::channel(capacity);
        let (stop, stop_rx) = watch::channel(false);
        let rx = Arc::new(Mutex::new(rx));

        let handles = (0..workers)
            .map(|id| tokio::spawn(run_worker(id, Arc::clone(&rx), stop_rx.clone())))
            .collect();

        tracing::debug!(workers, capacity, "log pool started");

        Self {
            log: DeferredLog {
                tx: Some(tx),
                capacity,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            stop,
            workers: handles,
        }
    }

    /// A producer handle for this pool.
    #[must_use]
    pub fn handle(&self) -> DeferredLog {
        self.log.clone()
    }

    /// Number of worker tasks.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stops accepting records, drains the queue and waits for the workers.
    pub async fn shutdown(mut self) {
        let _ = self.stop.send(true);
        for worker in std::mem::take(&mut self.workers) {
            if let Err(err) = worker.await {
                tracing::warn!(%err, "log worker ended abnormally");
            }
        }
    }
}

impl Drop for LogPool {
    fn drop(&mut self) {
        let _ = self.stop.send(true);
    }
}

async fn run_worker(
    id: usize,
    rx: Arc<Mutex<mpsc::Receiver<LogRecord>>>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        let next = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                record = rx.recv() => record,
                _ = stop.changed() => None,
            }
        };
        match next {
            Some(record) => record.emit(),
            None => break,
        }
    }

    let mut rx = rx.lock().await;
    rx.close();
    while let Ok(record) = rx.try_recv() {
        record.emit();
    }
    tracing::debug!(worker = id, "log worker stopped");
}

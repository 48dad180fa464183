//! Error types for the monitor crate.

use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors surfaced when handing a record to the deferred log pool.
///
/// Callers on the forwarding path normally use [`DeferredLog::defer`],
/// which swallows these; [`DeferredLog::try_defer`] exposes them for
/// callers that want to know.
///
/// [`DeferredLog::defer`]: crate::DeferredLog::defer
/// [`DeferredLog::try_defer`]: crate::DeferredLog::try_defer
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonitorError {
    /// The handle was created without a pool behind it.
    #[error("deferred logging is disabled")]
    Disabled,

    /// The queue is at capacity; the record was discarded.
    #[error("log queue full ({capacity} records); record dropped")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// The pool has shut down.
    #[error("log pool closed")]
    Closed,
}

//! # Hush Monitor
//!
//! Process-wide diagnostics and off-path logging for the interception
//! engine.
//!
//! ## Components
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`Diagnostics`] | Six lock-free cumulative counters |
//! | [`LogPool`] | Fixed-size background workers that emit deferred log records |
//! | [`DeferredLog`] | Cheap, cloneable, never-blocking producer handle |
//!
//! ## Quick Start
//!
//! ```rust
//! use hush_monitor::{Counter, Diagnostics};
//!
//! let diagnostics = Diagnostics::new();
//! diagnostics.increment(Counter::ProcessedChat);
//!
//! let snapshot = diagnostics.snapshot();
//! assert_eq!(snapshot.get(Counter::ProcessedChat), 1);
//! println!("{snapshot}");
//! ```
//!
//! ## Notes
//!
//! - Counters only ever grow; there is no reset.
//! - [`DeferredLog::defer`] never waits. A full queue drops the record
//!   rather than stall the connection thread that produced it.

mod deferred;
mod diagnostics;
mod error;

pub use deferred::{DeferredLog, LogLevel, LogPool, LogRecord, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};
pub use diagnostics::{Counter, Diagnostics, DiagnosticsSnapshot};
pub use error::{MonitorError, Result};

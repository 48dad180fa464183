//! # Hush Registry - Stage Installation Across Live Connections
//!
//! The registry keeps exactly one interception stage in every live
//! connection's pipeline, no matter how often connections are attached,
//! re-attached on reload, or torn down by the host mid-operation.
//!
//! ## Purpose
//!
//! 1. **Installation** - The stage goes under a fixed name directly in
//!    front of the host's decoded-message handler, or at the tail when the
//!    host has none.
//!
//! 2. **Idempotence** - Attaching twice replaces; detaching an unknown
//!    connection does nothing.
//!
//! 3. **Bulk operations** - Reload and shutdown walk every live entry
//!    without blocking connection threads.
//!
//! ## Architecture
//!
//! ```text
//!   host channel (owned by host)         ConnectionRegistry
//!  ┌─────────────────────────────┐     ┌──────────────────────────────┐
//!  │ splitter                    │     │ DashMap<SessionId, Attached> │
//!  │ decoder                     │     │                              │
//!  │ prepender                   │ ◀───┤  channel: Weak<dyn Pipeline> │
//!  │ encoder                     │     │  stage:   Arc<Interception>  │
//!  │ hush_interceptor  ◀── here  │     └──────────────────────────────┘
//!  │ packet_handler              │
//!  └─────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use hush_filter::{FilterConfig, InterceptionStage, SessionId};
//! use hush_monitor::{DeferredLog, Diagnostics};
//! use hush_registry::{AttachOutcome, ConnectionRegistry, MemoryPipeline, Pipeline};
//! use std::sync::Arc;
//!
//! let registry = ConnectionRegistry::new(DeferredLog::disabled());
//! let channel: Arc<dyn Pipeline> = Arc::new(MemoryPipeline::new());
//! let identity = SessionId::new();
//! let stage = || {
//!     Arc::new(InterceptionStage::new(
//!         identity,
//!         Arc::new(FilterConfig::default()),
//!         Arc::new(Diagnostics::new()),
//!         DeferredLog::disabled(),
//!     ))
//! };
//!
//! assert_eq!(registry.attach(identity, &channel, stage()).unwrap(), AttachOutcome::Installed);
//! assert_eq!(registry.attach(identity, &channel, stage()).unwrap(), AttachOutcome::Replaced);
//! assert_eq!(registry.len(), 1);
//!
//! assert!(registry.detach(identity));
//! assert!(!registry.detach(identity));
//! ```

pub mod error;
pub mod memory;
pub mod pipeline;
pub mod registry;

#[cfg(test)]
mod tests;

pub use error::{RegistryError, Result};
pub use memory::{MemoryPipeline, HOST_HANDLERS};
pub use pipeline::{install, Pipeline, DECODE_ANCHOR, STAGE_NAME};
pub use registry::{AttachOutcome, ConnectionRegistry};

//! # Hush Core
//!
//! Lifecycle facade for Hush, a chat attestation stripper for game
//! servers and proxies. Ties the interception stage, the connection
//! registry and the disconnect guard to a host.
//!
//! ## Coverage
//!
//! | Concern | Component | Effect |
//! |---------|-----------|--------|
//! | Signed chat | Interception stage | re-sent as unsigned broadcasts |
//! | Client signatures | Interception stage | cleared before the host sees them |
//! | Profile keys | Interception stage | session updates dropped |
//! | Warning toast | Interception stage | secure chat flag forced on |
//! | Attestation kicks | Disconnect guard | cancelled, client advised |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          HUSH CORE                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │                    ┌─────────────────┐                          │
//! │   host hooks ────▶ │      Hush       │  ← Unified Facade        │
//! │                    └────────┬────────┘                          │
//! │                             │                                   │
//! │         ┌───────────────────┼───────────────────┐               │
//! │         ▼                   ▼                   ▼               │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐          │
//! │  │ Connection  │    │ Disconnect  │    │ Diagnostics │          │
//! │  │  Registry   │    │    Guard    │    │  + Log Pool │          │
//! │  └──────┬──────┘    └─────────────┘    └─────────────┘          │
//! │         ▼                                                       │
//! │  ┌─────────────┐                                                │
//! │  │Interception │  one per connection                            │
//! │  │   Stage     │                                                │
//! │  └─────────────┘                                                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hush_core::{Hush, HushConfig};
//!
//! let hush = Arc::new(Hush::new(HushConfig::default(), host)?);
//! hush.start();
//!
//! // host callbacks
//! hush.on_connect(identity, &channel)?;
//! hush.on_disconnect_notice(&mut event);
//! hush.on_disconnect(identity);
//!
//! // admin command
//! hush.reload(new_config)?;
//! println!("{}", hush.diagnostics());
//!
//! hush.shutdown().await;
//! ```
//!
//! ## Operational Notes
//!
//! - Every rule fails open: the original message is forwarded
//! - No error closes a connection or stops the host
//! - Verbose logging never runs on a connection thread

mod config;
mod error;
mod host;
mod hush;

pub use config::HushConfig;
pub use error::HushError;
pub use host::{Host, MemoryHost};
pub use hush::Hush;

// Re-export component types for convenience
pub use hush_filter::{FilterConfig, Message, SessionId};
pub use hush_guard::{Advisory, AttestationFailure, DisconnectEvent, GuardDecision, HookPriority, HookRegistration};
pub use hush_monitor::{Counter, DiagnosticsSnapshot};
pub use hush_registry::{AttachOutcome, MemoryPipeline, Pipeline};

/// Core result type for Hush operations.
pub type Result<T> = std::result::Result<T, HushError>;

//! # Hush Guard - Attestation Kick Prevention
//!
//! With signatures stripped, the host's own chat validation eventually
//! decides a client is misbehaving and disconnects it. This crate keeps
//! those clients connected.
//!
//! ## Threat Model
//!
//! | Kick | Trigger | Defense |
//! |------|---------|---------|
//! | Out-of-order chat | timestamps no longer signed | cause code |
//! | Pending chat overflow | acknowledgements never arrive | cause code |
//! | Expired profile key | session updates dropped | cause code |
//! | Validation failure | signature chain broken | cause code |
//! | Unsigned chat | signature cleared | cause code |
//! | Hosts without cause codes | any of the above | reason text |
//!
//! ## Usage
//!
//! ```rust
//! use hush_filter::SessionId;
//! use hush_guard::{Advisory, DisconnectEvent, DisconnectGuard, GuardConfig, GuardDecision};
//! use hush_monitor::{DeferredLog, Diagnostics};
//! use std::sync::Arc;
//!
//! struct Silent;
//! impl Advisory for Silent {
//!     fn send_advisory(&self, _: SessionId, _: &str) {}
//! }
//!
//! let guard = DisconnectGuard::new(
//!     GuardConfig::default(),
//!     Arc::new(Diagnostics::new()),
//!     DeferredLog::disabled(),
//! )
//! .unwrap();
//!
//! let mut event = DisconnectEvent::new(SessionId::new(), "Out-of-order chat packet received")
//!     .with_cause("OUT_OF_ORDER_CHAT");
//! assert!(matches!(guard.inspect(&mut event, &Silent), GuardDecision::Cancelled(_)));
//! assert!(event.is_cancelled());
//! ```

pub mod cause;
pub mod error;
pub mod guard;

pub use cause::{AttestationFailure, CauseMatcher, REASON_PATTERNS};
pub use error::{GuardError, Result};
pub use guard::{
    Advisory, DisconnectEvent, DisconnectGuard, GuardConfig, GuardDecision, HookPriority, HookRegistration, ADVISORY_HINT,
};

//! # Disconnect Guard
//!
//! Stripping signatures means the host's chat validation will sooner or
//! later decide a client misbehaved and kick it. The guard hooks the
//! host's "about to disconnect" notification, recognizes those kicks, and
//! cancels them.
//!
//! ## Hook Contract
//!
//! | Property | Value |
//! |----------|-------|
//! | Priority | [`HookPriority::Lowest`], runs before every other handler |
//! | Cancelled events | skipped |
//! | Side effects on cancel | `blocked-kicks` += 1, one advisory to the client |
//!
//! Hosts read the first two from [`DisconnectGuard::REGISTRATION`].
//! Disconnects with any other cause are left alone.

use crate::cause::{AttestationFailure, CauseMatcher};
use crate::error::Result;
use hush_filter::SessionId;
use hush_monitor::{Counter, DeferredLog, Diagnostics, LogRecord};
use std::sync::Arc;
use tracing::debug;

/// Second line of every advisory.
pub const ADVISORY_HINT: &str = "You may need to rejoin the server if you experience issues with chat.";

/// Guard switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardConfig {
    /// Cancel attestation-failure disconnects.
    pub prevent_chat_kicks: bool,
    /// Defer a record for each cancelled disconnect.
    pub enable_logging: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            prevent_chat_kicks: true,
            enable_logging: false,
        }
    }
}

/// Position of a handler among the host's disconnect handlers.
///
/// Lower priorities run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HookPriority {
    /// Runs first.
    Lowest,
    /// Runs early.
    Low,
    /// Default slot.
    Normal,
    /// Runs late.
    High,
    /// Runs last.
    Highest,
}

/// How a host should register a disconnect handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookRegistration {
    /// Slot among the host's disconnect handlers.
    pub priority: HookPriority,
    /// Skip events another handler already cancelled.
    pub ignore_cancelled: bool,
}

/// The host is about to disconnect a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectEvent {
    /// Connection being disconnected.
    pub identity: SessionId,
    /// Structured cause code, when the host has one.
    pub cause: Option<String>,
    /// Plain-text reason shown to the client.
    pub reason: String,
    cancelled: bool,
}

impl DisconnectEvent {
    /// An event with no structured cause.
    pub fn new(identity: SessionId, reason: impl Into<String>) -> Self {
        Self {
            identity,
            cause: None,
            reason: reason.into(),
            cancelled: false,
        }
    }

    /// Attaches a structured cause code.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Stops the disconnect.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Whether some handler has stopped the disconnect.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Sends a chat line to one client.
pub trait Advisory: Send + Sync {
    /// Delivers `text` to the client behind `identity`.
    fn send_advisory(&self, identity: SessionId, text: &str);
}

/// What the guard did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// `prevent_chat_kicks` is off.
    Disabled,
    /// Another handler already cancelled it.
    AlreadyCancelled,
    /// Not an attestation failure; the disconnect proceeds.
    Allowed,
    /// Cancelled for this cause.
    Cancelled(AttestationFailure),
}

/// Cancels disconnects caused by chat attestation.
#[derive(Debug)]
pub struct DisconnectGuard {
    config: GuardConfig,
    matcher: CauseMatcher,
    diagnostics: Arc<Diagnostics>,
    log: DeferredLog,
}

impl DisconnectGuard {
    /// Registration the host applies when wiring [`inspect`](Self::inspect)
    /// into its disconnect handlers.
    pub const REGISTRATION: HookRegistration = HookRegistration {
        priority: HookPriority::Lowest,
        ignore_cancelled: true,
    };

    /// Builds a guard.
    ///
    /// # Errors
    ///
    /// [`GuardError::Pattern`](crate::GuardError::Pattern) if the reason
    /// patterns fail to compile.
    pub fn new(config: GuardConfig, diagnostics: Arc<Diagnostics>, log: DeferredLog) -> Result<Self> {
        let matcher = CauseMatcher::new()?;
        debug!(
            enabled = config.prevent_chat_kicks,
            codes = AttestationFailure::CODES.len(),
            "disconnect guard ready"
        );
        Ok(Self {
            config,
            matcher,
            diagnostics,
            log,
        })
    }

    /// Switches captured at construction.
    #[must_use]
    pub fn config(&self) -> GuardConfig {
        self.config
    }

    /// Inspects `event`, cancelling it if it is an attestation kick.
    pub fn inspect<A: Advisory + ?Sized>(&self, event: &mut DisconnectEvent, advisory: &A) -> GuardDecision {
        if event.is_cancelled() {
            return GuardDecision::AlreadyCancelled;
        }
        if !self.config.prevent_chat_kicks {
            return GuardDecision::Disabled;
        }

        let Some(failure) = self.matcher.classify(event.cause.as_deref(), &event.reason) else {
            return GuardDecision::Allowed;
        };

        event.cancel();
        self.diagnostics.increment(Counter::BlockedKicks);
        advisory.send_advisory(
            event.identity,
            &format!("Prevented a chat-related kick: {failure}\n{ADVISORY_HINT}"),
        );

        if self.config.enable_logging {
            self.log.defer(
                LogRecord::info(format!("prevented chat-related kick: {failure}"))
                    .with_connection(event.identity),
            );
        }
        GuardDecision::Cancelled(failure)
    }
}

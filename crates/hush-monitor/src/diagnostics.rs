//! # Diagnostics Counters
//!
//! Cumulative counters shared by every connection's interception stage
//! and by the disconnect guard.
//!
//! ## Design
//!
//! Each counter is an independent [`AtomicU64`]. Increments use relaxed
//! ordering: nothing else is synchronised through these values, and
//! readers only need each individual counter to be monotonic.
//!
//! A [`DiagnosticsSnapshot`] reads the counters one by one, so it is not
//! atomic across all six. Two counters bumped by the same message may be
//! observed one step apart.
//!
//! ## Counters
//!
//! | Counter | Incremented when |
//! |---------|------------------|
//! | `processed-chat` | a signed chat message is rewritten to an unsigned broadcast |
//! | `processed-metadata` | the attestation flag is forced on server data or login |
//! | `blocked-session-updates` | a session update is dropped |
//! | `stripped-signatures` | a client signature is cleared |
//! | `blocked-kicks` | an attestation disconnect is cancelled |
//! | `failed` | a rule failed and the original message was forwarded |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// One of the six diagnostics categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Counter {
    /// Signed chat converted to an unsigned broadcast.
    ProcessedChat,
    /// Server data or login message with the attestation flag forced.
    ProcessedMetadata,
    /// Session update dropped.
    BlockedSessionUpdates,
    /// Client signature cleared on a chat or command message.
    StrippedSignatures,
    /// Attestation disconnect cancelled.
    BlockedKicks,
    /// Rule failure; the original message went through.
    Failed,
}

impl Counter {
    /// Every counter, in display order.
    pub const ALL: [Counter; 6] = [
        Counter::ProcessedChat,
        Counter::ProcessedMetadata,
        Counter::BlockedSessionUpdates,
        Counter::StrippedSignatures,
        Counter::BlockedKicks,
        Counter::Failed,
    ];

    /// Kebab-case name used in configuration-style output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ProcessedChat => "processed-chat",
            Self::ProcessedMetadata => "processed-metadata",
            Self::BlockedSessionUpdates => "blocked-session-updates",
            Self::StrippedSignatures => "stripped-signatures",
            Self::BlockedKicks => "blocked-kicks",
            Self::Failed => "failed",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::ProcessedChat => 0,
            Self::ProcessedMetadata => 1,
            Self::BlockedSessionUpdates => 2,
            Self::StrippedSignatures => 3,
            Self::BlockedKicks => 4,
            Self::Failed => 5,
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lock-free cumulative counters.
///
/// Share one instance (behind an `Arc`) between every stage and the
/// guard. Lifetime equals the owning core's lifetime; there is no reset.
///
/// # Example
///
/// ```rust
/// use hush_monitor::{Counter, Diagnostics};
/// use std::sync::Arc;
///
/// let diagnostics = Arc::new(Diagnostics::new());
/// let worker = Arc::clone(&diagnostics);
/// std::thread::spawn(move || worker.increment(Counter::Failed))
///     .join()
///     .unwrap();
/// assert_eq!(diagnostics.get(Counter::Failed), 1);
/// ```
#[derive(Debug, Default)]
pub struct Diagnostics {
    counters: [AtomicU64; 6],
}

impl Diagnostics {
    /// Creates a set of zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one to `counter`.
    #[inline]
    pub fn increment(&self, counter: Counter) {
        self.counters[counter.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Current value of a single counter.
    #[must_use]
    pub fn get(&self, counter: Counter) -> u64 {
        self.counters[counter.index()].load(Ordering::Relaxed)
    }

    /// Reads all counters.
    #[must_use]
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            processed_chat: self.get(Counter::ProcessedChat),
            processed_metadata: self.get(Counter::ProcessedMetadata),
            blocked_session_updates: self.get(Counter::BlockedSessionUpdates),
            stripped_signatures: self.get(Counter::StrippedSignatures),
            blocked_kicks: self.get(Counter::BlockedKicks),
            failed: self.get(Counter::Failed),
        }
    }
}

/// Point-in-time copy of the counters, formatted for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DiagnosticsSnapshot {
    /// Signed chat messages rewritten.
    pub processed_chat: u64,
    /// Server data / login messages rewritten.
    pub processed_metadata: u64,
    /// Session updates dropped.
    pub blocked_session_updates: u64,
    /// Client signatures cleared.
    pub stripped_signatures: u64,
    /// Disconnects cancelled.
    pub blocked_kicks: u64,
    /// Rule failures.
    pub failed: u64,
}

impl DiagnosticsSnapshot {
    /// Value of one counter in this snapshot.
    #[must_use]
    pub const fn get(&self, counter: Counter) -> u64 {
        match counter {
            Counter::ProcessedChat => self.processed_chat,
            Counter::ProcessedMetadata => self.processed_metadata,
            Counter::BlockedSessionUpdates => self.blocked_session_updates,
            Counter::StrippedSignatures => self.stripped_signatures,
            Counter::BlockedKicks => self.blocked_kicks,
            Counter::Failed => self.failed,
        }
    }
}

impl fmt::Display for DiagnosticsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, counter) in Counter::ALL.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", counter.label(), self.get(*counter))?;
        }
        Ok(())
    }
}

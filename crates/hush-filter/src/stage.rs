//! # Interception Stage
//!
//! One [`InterceptionStage`] sits in each connection's pipeline and sees
//! every message in both directions. For each message it classifies,
//! applies the rule set inside a failure boundary, updates counters and
//! forwards exactly one of: the original, a replacement, or nothing.
//!
//! ```text
//!   message ──▶ classify ──▶ rules.apply ──┬─ Ok(Pass)        ──▶ original
//!                            (catch_unwind) ├─ Ok(Replace(m)) ──▶ m
//!                                           ├─ Ok(Drop)        ──▶ (nothing)
//!                                           └─ Err / panic     ──▶ original, failed += 1
//! ```
//!
//! ## Fail-open
//!
//! A rule that returns an error or panics never costs the connection a
//! message: the original is forwarded untouched and the `failed` counter
//! goes up by one.
//!
//! ## Ordering
//!
//! The stage holds no queue. Each call returns before the next message on
//! the same direction is handed over, so order is preserved.

use crate::classify::{classify, Kind};
use crate::config::FilterConfig;
use crate::models::{Message, SessionId};
use crate::rules::{RuleOutcome, RuleSet, StandardRules};
use hush_monitor::{Counter, DeferredLog, Diagnostics, LogRecord};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A handler installed in a connection pipeline.
///
/// Returns the message to pass further along, or `None` to swallow it.
pub trait Stage: Send + Sync {
    /// Handles one message.
    fn on_message(&self, message: Message) -> Option<Message>;
}

/// Per-connection message counts.
#[derive(Debug, Default)]
struct StageStats {
    forwarded: AtomicU64,
    replaced: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of a stage's counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageStatsSnapshot {
    /// Messages passed on, original or replacement.
    pub forwarded: u64,
    /// Messages passed on as a replacement.
    pub replaced: u64,
    /// Messages swallowed.
    pub dropped: u64,
}

/// The per-connection interception stage.
pub struct InterceptionStage {
    identity: SessionId,
    config: Arc<FilterConfig>,
    rules: Arc<dyn RuleSet>,
    diagnostics: Arc<Diagnostics>,
    log: DeferredLog,
    stats: StageStats,
}

impl std::fmt::Debug for InterceptionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptionStage")
            .field("identity", &self.identity)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl InterceptionStage {
    /// A stage applying [`StandardRules`].
    #[must_use]
    pub fn new(
        identity: SessionId,
        config: Arc<FilterConfig>,
        diagnostics: Arc<Diagnostics>,
        log: DeferredLog,
    ) -> Self {
        Self::with_rules(identity, config, Arc::new(StandardRules), diagnostics, log)
    }

    /// A stage applying a custom rule set.
    #[must_use]
    pub fn with_rules(
        identity: SessionId,
        config: Arc<FilterConfig>,
        rules: Arc<dyn RuleSet>,
        diagnostics: Arc<Diagnostics>,
        log: DeferredLog,
    ) -> Self {
        Self {
            identity,
            config,
            rules,
            diagnostics,
            log,
            stats: StageStats::default(),
        }
    }

    /// Connection this stage belongs to.
    #[must_use]
    pub fn identity(&self) -> SessionId {
        self.identity
    }

    /// Rule switches captured at construction.
    #[must_use]
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Current message counts.
    #[must_use]
    pub fn stats(&self) -> StageStatsSnapshot {
        StageStatsSnapshot {
            forwarded: self.stats.forwarded.load(Ordering::Relaxed),
            replaced: self.stats.replaced.load(Ordering::Relaxed),
            dropped: self.stats.dropped.load(Ordering::Relaxed),
        }
    }

    /// Classifies and applies the rules to one message.
    ///
    /// Never fails: errors and panics inside the rule set forward the
    /// original.
    pub fn process(&self, message: Message) -> Option<Message> {
        let kind = classify(&message);
        if kind.is_malformed() {
            self.trace(|| format!("{} {} has no known layout at {}", kind.label(), message.tag, message.protocol));
        }

        let applied = panic::catch_unwind(AssertUnwindSafe(|| {
            self.rules.apply(&message, &kind, &self.config)
        }));

        let outcome = match applied {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => return self.fail_open(message, &err.to_string()),
            Err(payload) => return self.fail_open(message, &panic_message(payload.as_ref())),
        };

        match outcome {
            RuleOutcome::Pass => {
                self.stats.forwarded.fetch_add(1, Ordering::Relaxed);
                Some(message)
            }
            RuleOutcome::Replace(replacement) => {
                if let Some(counter) = replace_counter(&kind) {
                    self.diagnostics.increment(counter);
                }
                self.stats.forwarded.fetch_add(1, Ordering::Relaxed);
                self.stats.replaced.fetch_add(1, Ordering::Relaxed);
                self.trace(|| format!("rewrote {} as {}", message.tag, replacement.tag));
                Some(replacement)
            }
            RuleOutcome::Drop => {
                if matches!(kind, Kind::SessionUpdate) {
                    self.diagnostics.increment(Counter::BlockedSessionUpdates);
                }
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                self.trace(|| format!("dropped {}", message.tag));
                None
            }
        }
    }

    fn fail_open(&self, message: Message, reason: &str) -> Option<Message> {
        self.diagnostics.increment(Counter::Failed);
        self.stats.forwarded.fetch_add(1, Ordering::Relaxed);
        if self.config.enable_logging {
            self.log.defer(
                LogRecord::warn(format!("rule failed on {}, forwarding original: {reason}", message.tag))
                    .with_connection(self.identity),
            );
        }
        Some(message)
    }

    /// Defers a debug record when verbose logging is on. The closure keeps
    /// formatting off the hot path otherwise.
    fn trace(&self, render: impl FnOnce() -> String) {
        if self.config.enable_logging {
            self.log
                .defer(LogRecord::debug(render()).with_connection(self.identity));
        }
    }
}

impl Stage for InterceptionStage {
    fn on_message(&self, message: Message) -> Option<Message> {
        self.process(message)
    }
}

fn replace_counter(kind: &Kind) -> Option<Counter> {
    match kind {
        Kind::SignedChat(_) => Some(Counter::ProcessedChat),
        Kind::ServerMetadata(_) | Kind::Login(_) => Some(Counter::ProcessedMetadata),
        Kind::ChatCommand(_) => Some(Counter::StrippedSignatures),
        Kind::SessionUpdate | Kind::DisconnectNotice | Kind::Other => None,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::models::{FilterError, Result};

    struct Panicking;

    impl RuleSet for Panicking {
        fn apply(&self, _: &Message, _: &Kind, _: &FilterConfig) -> Result<RuleOutcome> {
            panic!("rule exploded");
        }
    }

    struct Failing;

    impl RuleSet for Failing {
        fn apply(&self, message: &Message, _: &Kind, _: &FilterConfig) -> Result<RuleOutcome> {
            Err(FilterError::NotAnObject(message.tag.clone()))
        }
    }

    fn stage(config: FilterConfig) -> (InterceptionStage, Arc<Diagnostics>) {
        let diagnostics = Arc::new(Diagnostics::new());
        let stage = InterceptionStage::new(
            SessionId::new(),
            Arc::new(config),
            Arc::clone(&diagnostics),
            DeferredLog::disabled(),
        );
        (stage, diagnostics)
    }

    #[test]
    fn test_replace_counts_by_kind() {
        let (stage, diagnostics) = stage(FilterConfig::default());
        stage.process(fixtures::player_chat("Steve", "hi"));
        stage.process(fixtures::login());
        stage.process(fixtures::server_data());
        stage.process(fixtures::chat("hi"));
        stage.process(fixtures::chat_session_update());
        stage.process(fixtures::keep_alive());

        let snapshot = diagnostics.snapshot();
        assert_eq!(snapshot.get(Counter::ProcessedChat), 1);
        assert_eq!(snapshot.get(Counter::ProcessedMetadata), 2);
        assert_eq!(snapshot.get(Counter::StrippedSignatures), 1);
        assert_eq!(snapshot.get(Counter::BlockedSessionUpdates), 1);
        assert_eq!(snapshot.get(Counter::Failed), 0);

        assert_eq!(
            stage.stats(),
            StageStatsSnapshot {
                forwarded: 5,
                replaced: 4,
                dropped: 1,
            }
        );
    }

    #[test]
    fn test_panic_forwards_original() {
        let diagnostics = Arc::new(Diagnostics::new());
        let stage = InterceptionStage::with_rules(
            SessionId::new(),
            Arc::new(FilterConfig::default().with_logging(true)),
            Arc::new(Panicking),
            Arc::clone(&diagnostics),
            DeferredLog::disabled(),
        );
        let message = fixtures::player_chat("Steve", "hi");
        assert_eq!(stage.process(message.clone()), Some(message));
        assert_eq!(diagnostics.get(Counter::Failed), 1);
    }

    #[test]
    fn test_error_forwards_original() {
        let diagnostics = Arc::new(Diagnostics::new());
        let stage = InterceptionStage::with_rules(
            SessionId::new(),
            Arc::new(FilterConfig::default()),
            Arc::new(Failing),
            Arc::clone(&diagnostics),
            DeferredLog::disabled(),
        );
        let message = fixtures::chat_session_update();
        assert_eq!(stage.on_message(message.clone()), Some(message));
        assert_eq!(diagnostics.get(Counter::Failed), 1);
        assert_eq!(diagnostics.get(Counter::BlockedSessionUpdates), 0);
    }

    #[test]
    fn test_passthrough_forwards_everything_unchanged() {
        let (stage, diagnostics) = stage(FilterConfig::passthrough());
        for message in [
            fixtures::player_chat("Steve", "hi"),
            fixtures::chat("hi"),
            fixtures::chat_session_update(),
            fixtures::login(),
        ] {
            assert_eq!(stage.process(message.clone()), Some(message));
        }
        assert_eq!(diagnostics.snapshot().get(Counter::ProcessedChat), 0);
        assert_eq!(stage.stats().replaced, 0);
    }

    #[test]
    fn test_panic_message_extraction() {
        let result = panic::catch_unwind(|| panic!("boom {}", 1));
        let payload = result.unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom 1");
    }
}

//! Configuration types for Hush.

use crate::error::HushError;
use crate::Result;
use hush_filter::FilterConfig;
use hush_guard::GuardConfig;
use hush_monitor::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every Hush setting.
///
/// Keys are kebab-case; a missing key takes its default. Unknown keys are
/// ignored so older files keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HushConfig {
    /// Rewrite signed player chat as unsigned broadcasts.
    #[serde(default = "enabled")]
    pub strip_server_signatures: bool,

    /// Clear signatures on client chat and commands.
    #[serde(default = "enabled")]
    pub strip_client_signatures: bool,

    /// Force the secure chat flag so clients do not warn.
    #[serde(default = "enabled")]
    pub hide_secure_chat_warning: bool,

    /// Drop client chat session updates.
    #[serde(default = "enabled")]
    pub block_chat_session_updates: bool,

    /// Cancel disconnects caused by chat attestation.
    #[serde(default = "enabled")]
    pub prevent_chat_kicks: bool,

    /// Verbose per-message logging.
    #[serde(default)]
    pub enable_logging: bool,

    /// Deferred log pool workers. Read once at construction.
    #[serde(default = "default_log_workers")]
    pub log_workers: usize,

    /// Deferred log pool queue capacity. Read once at construction.
    #[serde(default = "default_log_queue")]
    pub log_queue: usize,
}

fn enabled() -> bool {
    true
}

fn default_log_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_log_queue() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for HushConfig {
    fn default() -> Self {
        Self {
            strip_server_signatures: true,
            strip_client_signatures: true,
            hide_secure_chat_warning: true,
            block_chat_session_updates: true,
            prevent_chat_kicks: true,
            enable_logging: false,
            log_workers: DEFAULT_WORKERS,
            log_queue: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl HushConfig {
    /// Rule switches for interception stages.
    #[must_use]
    pub fn filter(&self) -> FilterConfig {
        FilterConfig {
            strip_server_signatures: self.strip_server_signatures,
            strip_client_signatures: self.strip_client_signatures,
            hide_secure_chat_warning: self.hide_secure_chat_warning,
            block_chat_session_updates: self.block_chat_session_updates,
            enable_logging: self.enable_logging,
        }
    }

    /// Switches for the disconnect guard.
    #[must_use]
    pub fn guard(&self) -> GuardConfig {
        GuardConfig {
            prevent_chat_kicks: self.prevent_chat_kicks,
            enable_logging: self.enable_logging,
        }
    }

    /// Checks the numeric settings.
    ///
    /// # Errors
    ///
    /// [`HushError::Config`] if `log-workers` or `log-queue` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.log_workers == 0 {
            return Err(HushError::Config("log-workers must be at least 1".to_string()));
        }
        if self.log_queue == 0 {
            return Err(HushError::Config("log-queue must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for HushConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "strip-server-signatures: {}", self.strip_server_signatures)?;
        writeln!(f, "strip-client-signatures: {}", self.strip_client_signatures)?;
        writeln!(f, "hide-secure-chat-warning: {}", self.hide_secure_chat_warning)?;
        writeln!(f, "block-chat-session-updates: {}", self.block_chat_session_updates)?;
        writeln!(f, "prevent-chat-kicks: {}", self.prevent_chat_kicks)?;
        writeln!(f, "enable-logging: {}", self.enable_logging)?;
        writeln!(f, "log-workers: {}", self.log_workers)?;
        write!(f, "log-queue: {}", self.log_queue)
    }
}

//! Per-stage rule switches.

use serde::{Deserialize, Serialize};

/// Which rewrite rules a stage applies.
///
/// Every rule is on by default; verbose logging is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Rewrite outbound signed chat as unsigned broadcasts.
    pub strip_server_signatures: bool,
    /// Clear signatures on inbound chat and commands.
    pub strip_client_signatures: bool,
    /// Force the "enforces secure chat" flag on outbound metadata.
    pub hide_secure_chat_warning: bool,
    /// Drop inbound chat session updates.
    pub block_chat_session_updates: bool,
    /// Defer a record for every rewritten or dropped message.
    pub enable_logging: bool,
}

impl FilterConfig {
    /// Every rule disabled; the stage forwards everything untouched.
    #[must_use]
    pub const fn passthrough() -> Self {
        Self {
            strip_server_signatures: false,
            strip_client_signatures: false,
            hide_secure_chat_warning: false,
            block_chat_session_updates: false,
            enable_logging: false,
        }
    }

    /// Sets [`enable_logging`](Self::enable_logging).
    #[must_use]
    pub const fn with_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            strip_server_signatures: true,
            strip_client_signatures: true,
            hide_secure_chat_warning: true,
            block_chat_session_updates: true,
            enable_logging: false,
        }
    }
}

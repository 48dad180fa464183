//! # Transformation Rules
//!
//! One rule per [`Kind`]. A rule reads a few fields, decides, and at most
//! builds one replacement value. No kind is subject to more than one rule.
//!
//! | Kind | Switch | Outcome |
//! |------|--------|---------|
//! | `SignedChat` | `strip_server_signatures` | `Replace` with an unsigned `system_chat` |
//! | `ChatCommand` | `strip_client_signatures` | `Replace` with signatures cleared |
//! | `SessionUpdate` | `block_chat_session_updates` | `Drop` |
//! | `ServerMetadata` / `Login` | `hide_secure_chat_warning` | `Replace` with the flag forced on |
//! | `DisconnectNotice` / `Other` | | `Pass` |
//!
//! Forcing "enforces secure chat" to `true` is what stops the client from
//! showing its unsigned-chat warning toast. A `Malformed` shape always
//! passes.
//!
//! Rules may fail (see [`FilterError`](crate::FilterError)); the
//! interception stage catches both errors and panics and forwards the
//! original message.

use crate::classify::{Kind, Shape};
use crate::component::Component;
use crate::config::FilterConfig;
use crate::models::{tags, Direction, FilterError, Message, Result};
use serde::Serialize;

/// What the stage should do with a message.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    /// Forward the original unchanged.
    Pass,
    /// Forward this message instead of the original.
    Replace(Message),
    /// Forward nothing.
    Drop,
}

/// A set of rewrite rules.
///
/// [`StandardRules`] is the production set; tests substitute their own to
/// exercise failure isolation.
pub trait RuleSet: Send + Sync {
    /// Decides the outcome for `message`, already classified as `kind`.
    ///
    /// # Errors
    ///
    /// Any [`FilterError`]; the caller forwards the original message.
    fn apply(&self, message: &Message, kind: &Kind, config: &FilterConfig) -> Result<RuleOutcome>;
}

/// The production rule set.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRules;

impl RuleSet for StandardRules {
    fn apply(&self, message: &Message, kind: &Kind, config: &FilterConfig) -> Result<RuleOutcome> {
        match kind {
            Kind::SignedChat(Shape::Recognized(schema)) if config.strip_server_signatures => {
                match schema.extract(message)? {
                    Some(content) => system_chat(message, content).map(RuleOutcome::Replace),
                    None => Ok(RuleOutcome::Pass),
                }
            }
            Kind::ChatCommand(Shape::Recognized(schema))
                if config.strip_client_signatures && schema.is_signed(message) =>
            {
                schema.strip(message).map(RuleOutcome::Replace)
            }
            Kind::SessionUpdate if config.block_chat_session_updates => Ok(RuleOutcome::Drop),
            Kind::ServerMetadata(Shape::Recognized(schema)) | Kind::Login(Shape::Recognized(schema))
                if config.hide_secure_chat_warning && schema.value(message) != Some(true) =>
            {
                schema.force(message, true).map(RuleOutcome::Replace)
            }
            _ => Ok(RuleOutcome::Pass),
        }
    }
}

#[derive(Serialize)]
struct SystemChat {
    content: Component,
    overlay: bool,
}

/// Unsigned broadcast carrying `content`, on the same connection revision.
fn system_chat(original: &Message, content: Component) -> Result<Message> {
    let payload = serde_json::to_value(SystemChat {
        content,
        overlay: false,
    })
    .map_err(|source| FilterError::Encode {
        tag: original.tag.clone(),
        source,
    })?;

    Ok(Message {
        direction: Direction::Outbound,
        tag: tags::SYSTEM_CHAT.to_string(),
        protocol: original.protocol,
        payload,
    })
}

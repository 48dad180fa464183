//! # Versioned Schema Adapters
//!
//! Field layouts of the rewritten message types drift between protocol
//! revisions. Rather than probing payloads for whichever field name
//! happens to exist, each message kind has a small table of known layouts,
//! each valid for a closed range of protocol versions. The classifier
//! picks the adapter covering the connection's revision, then checks that
//! the fields the rule needs are really there.
//!
//! | Kind | Layout | Versions | Fields used |
//! |------|--------|----------|-------------|
//! | signed chat | `1.19.1` | 760 | `message.unsigned_content`, `message.signed_body.content.plain`, `chat_type` |
//! | signed chat | `1.19.3+` | 761– | `unsigned_content`, `body.content`, `chat_type` |
//! | chat submission | `chat` | 759– | `signature` |
//! | chat command | `chat_command` | 759–765 | `argument_signatures` |
//! | chat command | `chat_command_signed` | 766– | `argument_signatures` |
//! | server data | `server_data` | 759–765 | `enforces_secure_chat` |
//! | login | `login` | 766– | `enforces_secure_chat` |
//!
//! A revision with no adapter, or a payload missing a required field,
//! makes the message `Malformed`: it is forwarded untouched.

use crate::component::{ChatDecoration, Component};
use crate::models::{tags, FilterError, Message, ProtocolVersion, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// Closed range of protocol revisions; `max = None` means open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange {
    min: ProtocolVersion,
    max: Option<ProtocolVersion>,
}

impl VersionRange {
    /// `min` and every later revision.
    #[must_use]
    pub const fn from(min: ProtocolVersion) -> Self {
        Self { min, max: None }
    }

    /// `min..=max`.
    #[must_use]
    pub const fn between(min: ProtocolVersion, max: ProtocolVersion) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    /// Whether `version` falls in the range.
    #[must_use]
    pub fn contains(&self, version: ProtocolVersion) -> bool {
        version >= self.min && self.max.map_or(true, |max| version <= max)
    }
}

/// Common surface of every adapter.
pub trait Schema: fmt::Debug + Sync + 'static {
    /// Human-readable layout name, used in logs.
    fn name(&self) -> &'static str;

    /// Revisions this layout applies to.
    fn versions(&self) -> VersionRange;

    /// Whether every field the rule needs is present with the right type.
    fn locate(&self, message: &Message) -> bool;
}

fn decode<T: DeserializeOwned>(message: &Message, path: &[&str], value: &Value) -> Result<T> {
    T::deserialize(value).map_err(|source| FilterError::Decode {
        tag: message.tag.clone(),
        field: path.join("."),
        source,
    })
}

/// Copies the payload and overwrites one top-level field.
fn rewrite_field(message: &Message, field: &str, value: Value) -> Result<Message> {
    let mut payload = message.payload.clone();
    let object = payload
        .as_object_mut()
        .ok_or_else(|| FilterError::NotAnObject(message.tag.clone()))?;
    object.insert(field.to_string(), value);
    Ok(message.with_payload(payload))
}

// =============================================================================
// Signed chat
// =============================================================================

/// Layout of an outbound signed chat message.
#[derive(Debug)]
pub struct SignedChatSchema {
    /// Layout name.
    pub name: &'static str,
    /// Applicable revisions.
    pub versions: VersionRange,
    /// Path to the display content (optional, may be `null`).
    pub display: &'static [&'static str],
    /// Path to the raw body text.
    pub body: &'static [&'static str],
    /// Path to the bound chat type.
    pub decoration: &'static [&'static str],
}

impl SignedChatSchema {
    /// The message's declared decoration.
    ///
    /// # Errors
    ///
    /// [`FilterError::Decode`] when the field is present but malformed.
    pub fn decoration(&self, message: &Message) -> Result<Option<ChatDecoration>> {
        message
            .field(self.decoration)
            .map(|value| decode(message, self.decoration, value))
            .transpose()
    }

    /// Decorated text to carry over into an unsigned broadcast.
    ///
    /// The unsigned display content wins when present. Otherwise a
    /// non-empty raw body is used. Either way the message's own decoration
    /// is applied. `None` means nothing conveyable.
    ///
    /// # Errors
    ///
    /// [`FilterError::Decode`] when a present field has the wrong shape.
    pub fn extract(&self, message: &Message) -> Result<Option<Component>> {
        let content = match message.field(self.display).filter(|value| !value.is_null()) {
            Some(display) => decode::<Component>(message, self.display, display)?,
            None => match message.field(self.body).and_then(Value::as_str) {
                Some(text) if !text.is_empty() => Component::literal(text),
                _ => return Ok(None),
            },
        };
        Ok(self
            .decoration(message)?
            .map(|decoration| decoration.decorate(content)))
    }
}

impl Schema for SignedChatSchema {
    fn name(&self) -> &'static str {
        self.name
    }

    fn versions(&self) -> VersionRange {
        self.versions
    }

    fn locate(&self, message: &Message) -> bool {
        message.field(self.body).is_some_and(Value::is_string)
            && message.field(self.decoration).is_some_and(Value::is_object)
    }
}

/// Known signed chat layouts.
pub static SIGNED_CHAT: &[SignedChatSchema] = &[
    SignedChatSchema {
        name: "1.19.1",
        versions: VersionRange::between(ProtocolVersion::V1_19_1, ProtocolVersion::V1_19_1),
        display: &["message", "unsigned_content"],
        body: &["message", "signed_body", "content", "plain"],
        decoration: &["chat_type"],
    },
    SignedChatSchema {
        name: "1.19.3+",
        versions: VersionRange::from(ProtocolVersion::V1_19_3),
        display: &["unsigned_content"],
        body: &["body", "content"],
        decoration: &["chat_type"],
    },
];

// =============================================================================
// Client signatures
// =============================================================================

/// Value a cleared signature field takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleared {
    /// Single optional signature: `null`.
    Null,
    /// Per-argument signatures: `[]`.
    EmptyList,
}

impl Cleared {
    fn value(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::EmptyList => Value::Array(Vec::new()),
        }
    }
}

/// Layout of an inbound chat or command message carrying a signature.
#[derive(Debug)]
pub struct SignatureSchema {
    /// Layout name.
    pub name: &'static str,
    /// Message tag this layout applies to.
    pub tag: &'static str,
    /// Applicable revisions.
    pub versions: VersionRange,
    /// Top-level signature field.
    pub field: &'static str,
    /// Cleared form of the field.
    pub cleared: Cleared,
}

impl SignatureSchema {
    /// Whether the message still carries a signature.
    #[must_use]
    pub fn is_signed(&self, message: &Message) -> bool {
        match message.field(&[self.field]) {
            None | Some(Value::Null) => false,
            Some(Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
        }
    }

    /// Copy of `message` with the signature cleared.
    ///
    /// # Errors
    ///
    /// [`FilterError::NotAnObject`] if the payload is not an object.
    pub fn strip(&self, message: &Message) -> Result<Message> {
        rewrite_field(message, self.field, self.cleared.value())
    }
}

impl Schema for SignatureSchema {
    fn name(&self) -> &'static str {
        self.name
    }

    fn versions(&self) -> VersionRange {
        self.versions
    }

    fn locate(&self, message: &Message) -> bool {
        message.field(&[self.field]).is_some()
    }
}

/// Known client signature layouts.
pub static CLIENT_SIGNATURES: &[SignatureSchema] = &[
    SignatureSchema {
        name: "chat",
        tag: tags::CHAT,
        versions: VersionRange::from(ProtocolVersion::V1_19),
        field: "signature",
        cleared: Cleared::Null,
    },
    SignatureSchema {
        name: "chat_command",
        tag: tags::CHAT_COMMAND,
        versions: VersionRange::between(ProtocolVersion::V1_19, ProtocolVersion::V1_20_3),
        field: "argument_signatures",
        cleared: Cleared::EmptyList,
    },
    SignatureSchema {
        name: "chat_command_signed",
        tag: tags::CHAT_COMMAND_SIGNED,
        versions: VersionRange::from(ProtocolVersion::V1_20_5),
        field: "argument_signatures",
        cleared: Cleared::EmptyList,
    },
];

// =============================================================================
// Secure chat flag
// =============================================================================

/// Layout of an outbound message carrying the "enforces secure chat" flag.
#[derive(Debug)]
pub struct FlagSchema {
    /// Layout name.
    pub name: &'static str,
    /// Applicable revisions.
    pub versions: VersionRange,
    /// Top-level boolean field.
    pub field: &'static str,
}

impl FlagSchema {
    /// Current value of the flag, if it is a boolean.
    #[must_use]
    pub fn value(&self, message: &Message) -> Option<bool> {
        message.field(&[self.field]).and_then(Value::as_bool)
    }

    /// Copy of `message` with the flag set to `value`; every other field
    /// is carried over untouched.
    ///
    /// # Errors
    ///
    /// [`FilterError::NotAnObject`] if the payload is not an object.
    pub fn force(&self, message: &Message, value: bool) -> Result<Message> {
        rewrite_field(message, self.field, Value::Bool(value))
    }
}

impl Schema for FlagSchema {
    fn name(&self) -> &'static str {
        self.name
    }

    fn versions(&self) -> VersionRange {
        self.versions
    }

    fn locate(&self, message: &Message) -> bool {
        self.value(message).is_some()
    }
}

/// Known server data layouts.
pub static SERVER_DATA: &[FlagSchema] = &[FlagSchema {
    name: "server_data",
    versions: VersionRange::between(ProtocolVersion::V1_19, ProtocolVersion::V1_20_3),
    field: "enforces_secure_chat",
}];

/// Known login layouts.
pub static LOGIN: &[FlagSchema] = &[FlagSchema {
    name: "login",
    versions: VersionRange::from(ProtocolVersion::V1_20_5),
    field: "enforces_secure_chat",
}];

// =============================================================================
// Selection
// =============================================================================

/// First adapter in `table` covering `version`.
pub fn select<S: Schema>(table: &'static [S], version: ProtocolVersion) -> Option<&'static S> {
    table.iter().find(|schema| schema.versions().contains(version))
}

/// Signature adapter for `tag` at `version`.
pub fn client_signature(tag: &str, version: ProtocolVersion) -> Option<&'static SignatureSchema> {
    CLIENT_SIGNATURES
        .iter()
        .find(|schema| schema.tag == tag && schema.versions.contains(version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_version_range_bounds() {
        let range = VersionRange::between(ProtocolVersion::V1_19, ProtocolVersion::V1_20_3);
        assert!(range.contains(ProtocolVersion::V1_19));
        assert!(range.contains(ProtocolVersion::V1_20_3));
        assert!(!range.contains(ProtocolVersion::V1_20_5));
        assert!(VersionRange::from(ProtocolVersion::V1_19_3).contains(ProtocolVersion::new(9999)));
    }

    #[test]
    fn test_select_signed_chat_by_version() {
        assert_eq!(select(SIGNED_CHAT, ProtocolVersion::V1_19_1).unwrap().name, "1.19.1");
        assert_eq!(select(SIGNED_CHAT, ProtocolVersion::LATEST).unwrap().name, "1.19.3+");
        assert!(select(SIGNED_CHAT, ProtocolVersion::V1_19).is_none());
    }

    #[test]
    fn test_flag_layout_moves_from_server_data_to_login() {
        assert!(select(SERVER_DATA, ProtocolVersion::V1_20_3).is_some());
        assert!(select(SERVER_DATA, ProtocolVersion::V1_20_5).is_none());
        assert!(select(LOGIN, ProtocolVersion::V1_20_3).is_none());
        assert!(select(LOGIN, ProtocolVersion::V1_20_5).is_some());
    }

    #[test]
    fn test_client_signature_matches_tag_and_version() {
        assert!(client_signature(tags::CHAT_COMMAND, ProtocolVersion::V1_19_3).is_some());
        assert!(client_signature(tags::CHAT_COMMAND, ProtocolVersion::V1_20_5).is_none());
        assert!(client_signature(tags::CHAT_COMMAND_SIGNED, ProtocolVersion::LATEST).is_some());
        assert!(client_signature("keep_alive", ProtocolVersion::LATEST).is_none());
    }

    #[test]
    fn test_extract_prefers_display_content() {
        let schema = select(SIGNED_CHAT, ProtocolVersion::LATEST).unwrap();
        let message = Message::outbound(
            tags::PLAYER_CHAT,
            ProtocolVersion::LATEST,
            json!({
                "body": { "content": "raw" },
                "unsigned_content": { "text": "[mod] filtered" },
                "chat_type": { "translation_key": "chat.type.text", "sender": { "text": "Steve" } }
            }),
        );
        let component = schema.extract(&message).unwrap().unwrap();
        assert_eq!(component.to_plain(), "<Steve> [mod] filtered");
    }

    #[test]
    fn test_extract_decorates_raw_body() {
        let schema = select(SIGNED_CHAT, ProtocolVersion::V1_19_1).unwrap();
        let message = Message::outbound(
            tags::PLAYER_CHAT,
            ProtocolVersion::V1_19_1,
            json!({
                "message": {
                    "signed_body": { "content": { "plain": "hello" } },
                    "unsigned_content": null
                },
                "chat_type": { "translation_key": "chat.type.text", "sender": { "text": "Steve" } }
            }),
        );
        assert!(schema.locate(&message));
        let component = schema.extract(&message).unwrap().unwrap();
        assert_eq!(component.to_plain(), "<Steve> hello");
    }

    #[test]
    fn test_extract_empty_body_is_not_conveyable() {
        let schema = select(SIGNED_CHAT, ProtocolVersion::LATEST).unwrap();
        let message = Message::outbound(
            tags::PLAYER_CHAT,
            ProtocolVersion::LATEST,
            json!({
                "body": { "content": "" },
                "chat_type": { "translation_key": "chat.type.text", "sender": { "text": "Steve" } }
            }),
        );
        assert!(schema.extract(&message).unwrap().is_none());
    }

    #[test]
    fn test_extract_reports_bad_decoration() {
        let schema = select(SIGNED_CHAT, ProtocolVersion::LATEST).unwrap();
        let message = Message::outbound(
            tags::PLAYER_CHAT,
            ProtocolVersion::LATEST,
            json!({ "body": { "content": "hi" }, "chat_type": { "sender": 12 } }),
        );
        let err = schema.extract(&message).unwrap_err();
        assert!(err.to_string().contains("chat_type"));
    }

    #[test]
    fn test_signature_strip_and_detection() {
        let schema = client_signature(tags::CHAT_COMMAND_SIGNED, ProtocolVersion::LATEST).unwrap();
        let message = Message::inbound(
            tags::CHAT_COMMAND_SIGNED,
            ProtocolVersion::LATEST,
            json!({ "command": "msg Alex hi", "argument_signatures": [{ "name": "message", "signature": "AAAA" }] }),
        );
        assert!(schema.is_signed(&message));

        let stripped = schema.strip(&message).unwrap();
        assert_eq!(stripped.payload["argument_signatures"], json!([]));
        assert_eq!(stripped.payload["command"], "msg Alex hi");
        assert!(!schema.is_signed(&stripped));
    }

    #[test]
    fn test_flag_force_preserves_other_fields() {
        let schema = select(LOGIN, ProtocolVersion::LATEST).unwrap();
        let message = Message::outbound(
            tags::LOGIN,
            ProtocolVersion::LATEST,
            json!({ "player_id": 7, "max_players": 20, "enforces_secure_chat": false }),
        );
        let forced = schema.force(&message, true).unwrap();
        assert_eq!(schema.value(&forced), Some(true));
        assert_eq!(forced.payload["player_id"], 7);
        assert_eq!(forced.payload["max_players"], 20);
    }

    #[test]
    fn test_rewrite_requires_object_payload() {
        let schema = select(LOGIN, ProtocolVersion::LATEST).unwrap();
        let message = Message::outbound(tags::LOGIN, ProtocolVersion::LATEST, json!([1, 2]));
        assert!(matches!(
            schema.force(&message, true),
            Err(FilterError::NotAnObject(_))
        ));
    }
}

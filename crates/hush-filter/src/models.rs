//! # Core Types for the Interception Engine
//!
//! A [`Message`] is one decoded protocol unit as the host's codec hands it
//! over: a runtime tag naming the decoded type, the protocol revision the
//! connection negotiated, the direction of travel, and the payload as an
//! opaque JSON object. The engine never re-encodes anything; it reads a
//! few fields, and when a rule applies it builds a replacement value of
//! the same shape.
//!
//! ## Direction
//!
//! | Direction | Travels | Examples |
//! |-----------|---------|----------|
//! | `Inbound` | client → server | `chat`, `chat_command_signed`, `chat_session_update` |
//! | `Outbound` | server → client | `player_chat`, `server_data`, `login`, `disconnect` |

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Runtime tags of the message types the engine cares about.
pub mod tags {
    /// Signed player chat, server → client.
    pub const PLAYER_CHAT: &str = "player_chat";
    /// Unsigned broadcast, server → client.
    pub const SYSTEM_CHAT: &str = "system_chat";
    /// Chat submission, client → server.
    pub const CHAT: &str = "chat";
    /// Chat command, client → server.
    pub const CHAT_COMMAND: &str = "chat_command";
    /// Chat command carrying argument signatures, client → server.
    pub const CHAT_COMMAND_SIGNED: &str = "chat_command_signed";
    /// Session / profile key update, client → server.
    pub const CHAT_SESSION_UPDATE: &str = "chat_session_update";
    /// Server metadata (motd, icon, flags), server → client.
    pub const SERVER_DATA: &str = "server_data";
    /// Join-game handshake, server → client.
    pub const LOGIN: &str = "login";
    /// Disconnect notice, server → client.
    pub const DISCONNECT: &str = "disconnect";
}

/// Stable identity of one connection for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// A fresh random identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an identity supplied by the host.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Direction of travel through a connection's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Client → server.
    Inbound,
    /// Server → client.
    Outbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        })
    }
}

/// Numeric protocol revision negotiated by a connection.
///
/// Schema adapters select their field layout from this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolVersion(u32);

impl ProtocolVersion {
    /// 1.19
    pub const V1_19: Self = Self(759);
    /// 1.19.1 / 1.19.2
    pub const V1_19_1: Self = Self(760);
    /// 1.19.3
    pub const V1_19_3: Self = Self(761);
    /// 1.20.3 / 1.20.4
    pub const V1_20_3: Self = Self(765);
    /// 1.20.5 / 1.20.6
    pub const V1_20_5: Self = Self(766);
    /// 1.21.6
    pub const V1_21_6: Self = Self(771);
    /// Newest revision with a known layout for every adapter.
    pub const LATEST: Self = Self::V1_21_6;

    /// Wraps a raw protocol number.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw protocol number.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "protocol {}", self.0)
    }
}

/// One decoded protocol unit in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Direction of travel.
    pub direction: Direction,
    /// Runtime tag of the decoded type (see [`tags`]).
    pub tag: String,
    /// Protocol revision of the connection.
    pub protocol: ProtocolVersion,
    /// Decoded fields, as produced by the host's codec.
    pub payload: Value,
}

impl Message {
    /// A client → server message.
    pub fn inbound(tag: impl Into<String>, protocol: ProtocolVersion, payload: Value) -> Self {
        Self {
            direction: Direction::Inbound,
            tag: tag.into(),
            protocol,
            payload,
        }
    }

    /// A server → client message.
    pub fn outbound(tag: impl Into<String>, protocol: ProtocolVersion, payload: Value) -> Self {
        Self {
            direction: Direction::Outbound,
            tag: tag.into(),
            protocol,
            payload,
        }
    }

    /// Walks nested objects along `path`.
    ///
    /// Returns `None` as soon as a segment is missing or the current value
    /// is not an object. An empty path yields the whole payload.
    #[must_use]
    pub fn field(&self, path: &[&str]) -> Option<&Value> {
        path.iter()
            .try_fold(&self.payload, |value, segment| value.as_object()?.get(*segment))
    }

    /// Same tag, direction and protocol with a different payload.
    #[must_use]
    pub fn with_payload(&self, payload: Value) -> Self {
        Self {
            direction: self.direction,
            tag: self.tag.clone(),
            protocol: self.protocol,
            payload,
        }
    }

    /// Whether the message has the given tag.
    #[must_use]
    pub fn is(&self, tag: &str) -> bool {
        self.tag == tag
    }
}

/// Errors raised inside a rule.
///
/// The interception stage never propagates these: it counts them as
/// failures and forwards the original message.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A field was present but could not be decoded into the expected type.
    #[error("cannot decode {field} on {tag}: {source}")]
    Decode {
        /// Message tag.
        tag: String,
        /// Field path, dot-separated.
        field: String,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// The payload is not a JSON object and cannot be rewritten.
    #[error("payload of {0} is not an object")]
    NotAnObject(String),

    /// A replacement could not be encoded.
    #[error("cannot encode replacement for {tag}: {source}")]
    Encode {
        /// Message tag.
        tag: String,
        /// Underlying encode error.
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for rule evaluation.
pub type Result<T> = std::result::Result<T, FilterError>;

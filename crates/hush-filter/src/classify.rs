//! Message classification.
//!
//! [`classify`] maps a message to a [`Kind`] from its direction and tag,
//! then resolves the schema adapter for the connection's protocol revision.
//! Classification never fails: an unknown tag is [`Kind::Other`], and a
//! known tag whose layout cannot be resolved is carried as
//! [`Shape::Malformed`] so the rules can forward it untouched.

use crate::models::{tags, Direction, Message};
use crate::schema::{self, FlagSchema, Schema, SignatureSchema, SignedChatSchema};

/// Resolved layout of a recognized message.
#[derive(Debug)]
pub enum Shape<S: 'static> {
    /// An adapter covers the revision and every required field is present.
    Recognized(&'static S),
    /// No adapter, or a required field is missing.
    Malformed,
}

impl<S: Schema> Shape<S> {
    fn resolve(candidate: Option<&'static S>, message: &Message) -> Self {
        match candidate {
            Some(schema) if schema.locate(message) => Self::Recognized(schema),
            _ => Self::Malformed,
        }
    }
}

/// Category of a message, as far as the rules are concerned.
#[derive(Debug)]
pub enum Kind {
    /// Outbound signed player chat.
    SignedChat(Shape<SignedChatSchema>),
    /// Inbound chat or command submission that may carry signatures.
    ChatCommand(Shape<SignatureSchema>),
    /// Inbound chat session / profile key update.
    SessionUpdate,
    /// Outbound server metadata carrying the secure chat flag.
    ServerMetadata(Shape<FlagSchema>),
    /// Outbound join handshake carrying the secure chat flag.
    Login(Shape<FlagSchema>),
    /// Outbound disconnect notice.
    DisconnectNotice,
    /// Anything else.
    Other,
}

impl Kind {
    /// Short name for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::SignedChat(_) => "signed-chat",
            Self::ChatCommand(_) => "chat-command",
            Self::SessionUpdate => "session-update",
            Self::ServerMetadata(_) => "server-metadata",
            Self::Login(_) => "login",
            Self::DisconnectNotice => "disconnect-notice",
            Self::Other => "other",
        }
    }

    /// Whether the message was recognized but its layout could not be resolved.
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::SignedChat(Shape::Malformed)
                | Self::ChatCommand(Shape::Malformed)
                | Self::ServerMetadata(Shape::Malformed)
                | Self::Login(Shape::Malformed)
        )
    }
}

/// Classifies `message`.
#[must_use]
pub fn classify(message: &Message) -> Kind {
    let version = message.protocol;
    match (message.direction, message.tag.as_str()) {
        (Direction::Outbound, tags::PLAYER_CHAT) => Kind::SignedChat(Shape::resolve(
            schema::select(schema::SIGNED_CHAT, version),
            message,
        )),
        (Direction::Inbound, tag @ (tags::CHAT | tags::CHAT_COMMAND | tags::CHAT_COMMAND_SIGNED)) => {
            Kind::ChatCommand(Shape::resolve(schema::client_signature(tag, version), message))
        }
        (Direction::Inbound, tags::CHAT_SESSION_UPDATE) => Kind::SessionUpdate,
        (Direction::Outbound, tags::SERVER_DATA) => Kind::ServerMetadata(Shape::resolve(
            schema::select(schema::SERVER_DATA, version),
            message,
        )),
        (Direction::Outbound, tags::LOGIN) => {
            Kind::Login(Shape::resolve(schema::select(schema::LOGIN, version), message))
        }
        (Direction::Outbound, tags::DISCONNECT) => Kind::DisconnectNotice,
        _ => Kind::Other,
    }
}

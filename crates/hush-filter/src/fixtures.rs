//! Sample messages in the layouts the schema adapters understand.
//!
//! Used by the tests across the workspace and by `hush simulate`. Every
//! message is built at [`ProtocolVersion::LATEST`] unless its layout only
//! exists on an older revision.

use crate::models::{tags, Message, ProtocolVersion};
use serde_json::json;

/// Signed chat from `sender`, decorated as plain `chat.type.text`.
#[must_use]
pub fn player_chat(sender: &str, text: &str) -> Message {
    Message::outbound(
        tags::PLAYER_CHAT,
        ProtocolVersion::LATEST,
        json!({
            "global_index": 0,
            "sender": "00000000-0000-0000-0000-000000000000",
            "index": 0,
            "signature": "c2lnbmF0dXJl",
            "body": { "content": text, "timestamp": 0, "salt": 0 },
            "unsigned_content": null,
            "filter_mask": { "type": "pass_through" },
            "chat_type": {
                "translation_key": "chat.type.text",
                "parameters": ["sender", "content"],
                "sender": { "text": sender }
            }
        }),
    )
}

/// Signed chat submission.
#[must_use]
pub fn chat(text: &str) -> Message {
    Message::inbound(
        tags::CHAT,
        ProtocolVersion::LATEST,
        json!({
            "message": text,
            "timestamp": 0,
            "salt": 0,
            "signature": "c2lnbmF0dXJl",
            "offset": 0,
            "acknowledged": [0, 0, 0]
        }),
    )
}

/// Chat command with one signed argument.
#[must_use]
pub fn chat_command_signed(command: &str) -> Message {
    Message::inbound(
        tags::CHAT_COMMAND_SIGNED,
        ProtocolVersion::LATEST,
        json!({
            "command": command,
            "timestamp": 0,
            "salt": 0,
            "argument_signatures": [{ "name": "message", "signature": "c2lnbmF0dXJl" }],
            "offset": 0,
            "acknowledged": [0, 0, 0]
        }),
    )
}

/// Chat session update carrying a profile key.
#[must_use]
pub fn chat_session_update() -> Message {
    Message::inbound(
        tags::CHAT_SESSION_UPDATE,
        ProtocolVersion::LATEST,
        json!({
            "session_id": "00000000-0000-0000-0000-000000000001",
            "profile_public_key": { "expires_at": 0, "key": "a2V5", "signature": "c2ln" }
        }),
    )
}

/// Server metadata. Only exists up to 1.20.4.
#[must_use]
pub fn server_data() -> Message {
    Message::outbound(
        tags::SERVER_DATA,
        ProtocolVersion::V1_20_3,
        json!({
            "motd": { "text": "A Minecraft Server" },
            "icon": null,
            "enforces_secure_chat": false
        }),
    )
}

/// Join-game handshake.
#[must_use]
pub fn login() -> Message {
    Message::outbound(
        tags::LOGIN,
        ProtocolVersion::LATEST,
        json!({
            "player_id": 42,
            "hardcore": false,
            "levels": ["minecraft:overworld", "minecraft:the_nether", "minecraft:the_end"],
            "max_players": 20,
            "chunk_radius": 10,
            "simulation_distance": 10,
            "reduced_debug_info": false,
            "show_death_screen": true,
            "do_limited_crafting": false,
            "spawn_info": { "dimension": "minecraft:overworld", "game_type": "survival" },
            "enforces_secure_chat": false
        }),
    )
}

/// Keep-alive; no rule applies.
#[must_use]
pub fn keep_alive() -> Message {
    Message::outbound("keep_alive", ProtocolVersion::LATEST, json!({ "id": 1 }))
}

/// Disconnect notice with a plain reason.
#[must_use]
pub fn disconnect(reason: &str) -> Message {
    Message::outbound(
        tags::DISCONNECT,
        ProtocolVersion::LATEST,
        json!({ "reason": { "text": reason } }),
    )
}

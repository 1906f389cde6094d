//! Message types for the relay protocol

use serde::{Deserialize, Deserializer, Serialize};

/// State of one player as reported by a client
///
/// Every field is optional on the wire. Absent fields fall back to zero,
/// an empty color, or a null controller state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerState {
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub health: f64,

    /// Opaque client-side controller state, relayed untouched
    #[serde(rename = "bulletController")]
    pub bullet_controller: serde_json::Value,
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// First message on every connection
    ///
    /// Carries a join token, a watch token, or neither (to host a new session).
    /// A token key that is present counts even when its value is `null`.
    Init {
        #[serde(
            default,
            deserialize_with = "present_token",
            skip_serializing_if = "Option::is_none"
        )]
        join: Option<String>,

        #[serde(
            default,
            deserialize_with = "present_token",
            skip_serializing_if = "Option::is_none"
        )]
        watch: Option<String>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        player: Option<PlayerState>,
    },

    /// A move from one of the two players
    Play { player: PlayerState },
}

impl ClientMessage {
    /// Init message for hosting a new session
    pub fn host() -> Self {
        ClientMessage::Init {
            join: None,
            watch: None,
            player: None,
        }
    }

    /// Init message for joining as the second player
    pub fn join(token: impl Into<String>) -> Self {
        ClientMessage::Init {
            join: Some(token.into()),
            watch: None,
            player: None,
        }
    }

    /// Init message for attaching as a spectator
    pub fn watch(token: impl Into<String>) -> Self {
        ClientMessage::Init {
            join: None,
            watch: Some(token.into()),
            player: None,
        }
    }

    /// Wire name of the message type, used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Init { .. } => "init",
            ClientMessage::Play { .. } => "play",
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Tokens handed to the host after it starts a session
    Init { join: String, watch: String },

    /// A recorded move, used for both live broadcast and replay
    Play { player: PlayerState },

    /// The player with this color dropped to zero health
    Lost { player: String },

    /// Error addressed to a single connection
    Error { message: String },
}

/// Only called for keys that are present; `null` becomes an empty token
fn present_token<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(Option::<String>::deserialize(deserializer)?.unwrap_or_default()))
}

//! Protocol definitions for client-server communication
//!
//! Every message is a JSON object carried in one WebSocket text frame and
//! discriminated by its `type` field.

mod message;

pub use message::{ClientMessage, PlayerState, ServerMessage};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default limit for a single inbound text frame (64 KiB)
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Protocol-specific errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Unexpected message: expected {expected}, got {got}")]
    UnexpectedMessage {
        expected: &'static str,
        got: &'static str,
    },

    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ProtocolError {
    /// A well-formed message that is not valid in the current state
    pub fn unexpected(expected: &'static str, got: &ClientMessage) -> Self {
        ProtocolError::UnexpectedMessage {
            expected,
            got: got.kind(),
        }
    }
}

/// Serialize a message to JSON text
pub fn serialize<T: Serialize>(msg: &T) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(msg)?)
}

/// Deserialize a message from JSON text
pub fn deserialize<'a, T: Deserialize<'a>>(text: &'a str) -> Result<T, ProtocolError> {
    serde_json::from_str(text).map_err(|e| ProtocolError::MalformedMessage(e.to_string()))
}

/// Decode a client message, enforcing the size limit first
pub fn decode_client_message(text: &str, max_size: usize) -> Result<ClientMessage, ProtocolError> {
    if text.len() > max_size {
        return Err(ProtocolError::MessageTooLarge {
            size: text.len(),
            max: max_size,
        });
    }
    deserialize(text)
}

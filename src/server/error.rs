//! Errors raised while relaying a connection

use super::rules::IllegalMove;
use crate::protocol::ProtocolError;
use thiserror::Error;

/// Message sent to clients that present an unknown token
pub const GAME_NOT_FOUND: &str = "Game not found.";

#[derive(Debug, Error)]
pub enum RelayError {
    /// Join or watch token is absent from the registry
    #[error("Game not found.")]
    NotFound,

    /// The rule engine rejected a move
    #[error(transparent)]
    IllegalMove(#[from] IllegalMove),

    /// The client broke the protocol; the connection is dropped
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl RelayError {
    /// Whether the connection may keep going after reporting this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RelayError::IllegalMove(_))
    }
}

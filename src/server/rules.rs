//! Move validation hook
//!
//! The relay does not know the game's rules. A [`RuleEngine`] gets to veto a
//! move before it is recorded; a rejected move is reported back to the player
//! who sent it and nothing is broadcast.

use super::session::Session;
use crate::protocol::PlayerState;
use thiserror::Error;

/// A move the rule engine refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct IllegalMove(pub String);

/// Decides whether a move may be applied to a session
pub trait RuleEngine: Send + Sync {
    fn check(&self, session: &Session, player: &PlayerState) -> Result<(), IllegalMove>;
}

/// Accepts every move
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenRules;

impl RuleEngine for OpenRules {
    fn check(&self, _session: &Session, _player: &PlayerState) -> Result<(), IllegalMove> {
        Ok(())
    }
}

impl<F> RuleEngine for F
where
    F: Fn(&Session, &PlayerState) -> Result<(), IllegalMove> + Send + Sync,
{
    fn check(&self, session: &Session, player: &PlayerState) -> Result<(), IllegalMove> {
        self(session, player)
    }
}

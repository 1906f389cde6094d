//! Session state - the match snapshot and its move history

use crate::protocol::PlayerState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Color of the player who starts a session
pub const PLAYER1: &str = "yellow";

/// Color of the player who joins a session
pub const PLAYER2: &str = "lightgreen";

/// Health a fresh session starts with
pub const STARTING_HEALTH: f64 = 100.0;

/// Session metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Unique session identifier
    pub id: Uuid,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// Number of recorded moves
    pub move_count: usize,

    /// Number of subscribed connections
    pub subscriber_count: usize,
}

/// One recorded move
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub health: f64,
    pub bullet_controller: serde_json::Value,
}

impl MoveRecord {
    /// Player state to put on the wire for this move
    pub fn to_player_state(&self) -> PlayerState {
        PlayerState {
            x: self.x,
            y: self.y,
            color: self.color.clone(),
            health: self.health,
            bullet_controller: self.bullet_controller.clone(),
        }
    }
}

/// Active match state
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,

    x: f64,
    y: f64,
    color: Option<String>,
    health: f64,
    bullet_controller: serde_json::Value,

    /// Append-only move history
    stats: Vec<MoveRecord>,

    /// Latest known state per player color
    roster: BTreeMap<String, PlayerState>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create a new session
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            x: 0.0,
            y: 0.0,
            color: None,
            health: STARTING_HEALTH,
            bullet_controller: serde_json::Value::Null,
            stats: Vec::new(),
            roster: BTreeMap::new(),
        }
    }

    /// Get session ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// When the session was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Apply a player's move and append it to the history
    pub fn record_move(&mut self, player: &PlayerState) -> &MoveRecord {
        self.x = player.x;
        self.y = player.y;
        self.color = Some(player.color.clone());
        self.health = player.health;
        self.bullet_controller = player.bullet_controller.clone();
        self.roster.insert(player.color.clone(), player.clone());

        self.stats.push(MoveRecord {
            x: self.x,
            y: self.y,
            color: player.color.clone(),
            health: self.health,
            bullet_controller: self.bullet_controller.clone(),
        });
        // Just pushed, so the history is non-empty.
        &self.stats[self.stats.len() - 1]
    }

    /// Remember a player's announced state without recording a move
    pub fn announce_player(&mut self, player: &PlayerState) {
        self.roster.insert(player.color.clone(), player.clone());
    }

    /// True once the last recorded health reached zero
    pub fn has_lost(&self) -> bool {
        self.health == 0.0
    }

    /// Current position
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Color of the player who moved last
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// Current health
    pub fn health(&self) -> f64 {
        self.health
    }

    /// Current controller state
    pub fn bullet_controller(&self) -> &serde_json::Value {
        &self.bullet_controller
    }

    /// Recorded moves, oldest first
    pub fn stats(&self) -> &[MoveRecord] {
        &self.stats
    }

    /// Point-in-time copy of the move history
    pub fn stats_snapshot(&self) -> Vec<MoveRecord> {
        self.stats.clone()
    }

    /// Latest known state of the player with this color
    pub fn player(&self, color: &str) -> Option<&PlayerState> {
        self.roster.get(color)
    }
}

//! A session together with the connections subscribed to it
//!
//! Moves are recorded and fanned out while the session lock is held, so every
//! subscriber sees moves in the order they were appended to the history.
//! Fan-out never waits on a subscriber: one whose queue is full is evicted.
//! A newcomer is replayed outside the lock and subscribed once it has caught
//! up, so each move reaches it exactly once and in order.

use super::connection::ClientConnection;
use super::rules::{IllegalMove, RuleEngine};
use super::session::{MoveRecord, Session, SessionInfo};
use crate::protocol::{PlayerState, ServerMessage};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

pub struct Room {
    id: Uuid,
    session: Mutex<Session>,
    subscribers: RwLock<HashMap<Uuid, ClientConnection>>,
}

impl Room {
    pub fn new(session: Session) -> Self {
        Self {
            id: session.id(),
            session: Mutex::new(session),
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// ID of the session in this room
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Lock the session
    pub async fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().await
    }

    /// Add a connection to the subscriber set
    ///
    /// The connection stays subscribed until the returned guard is dropped.
    pub fn subscribe(self: &Arc<Self>, conn: &ClientConnection) -> SubscriptionGuard {
        self.subscribers.write().insert(conn.id(), conn.clone());
        SubscriptionGuard {
            room: Arc::clone(self),
            conn_id: conn.id(),
        }
    }

    /// Remove a connection from the subscriber set
    pub fn unsubscribe(&self, conn_id: Uuid) -> bool {
        self.subscribers.write().remove(&conn_id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Replay the history to a late arrival, then subscribe it
    ///
    /// Replay runs without the session lock. Moves recorded meanwhile are sent
    /// in further rounds until nothing is left, and the subscription is taken
    /// under the lock in that final state.
    pub async fn attach(self: &Arc<Self>, conn: &ClientConnection) -> SubscriptionGuard {
        let mut sent = 0;
        loop {
            let pending = {
                let session = self.session.lock().await;
                let stats = session.stats();
                if sent >= stats.len() {
                    return self.subscribe(conn);
                }
                stats[sent..].to_vec()
            };

            sent += pending.len();
            if !replay(conn, &pending).await {
                // The client is gone; its handler will notice and unwind.
                return self.subscribe(conn);
            }
        }
    }

    /// Validate, record and broadcast one move
    ///
    /// Returns the number of connections the move was delivered to. Nothing is
    /// recorded or sent when the rule engine rejects the move.
    pub async fn play(
        &self,
        rules: &dyn RuleEngine,
        player: &PlayerState,
    ) -> Result<usize, IllegalMove> {
        let mut session = self.session.lock().await;
        rules.check(&session, player)?;

        let state = session.record_move(player).to_player_state();
        let recipients = self.subscribers_snapshot();
        let delivered = self.fan_out(&recipients, &ServerMessage::Play { player: state });

        if session.has_lost() {
            tracing::info!(session = %self.id, player = %player.color, "Player lost");
            let lost = ServerMessage::Lost {
                player: player.color.clone(),
            };
            self.fan_out(&recipients, &lost);
        }

        Ok(delivered)
    }

    /// Session metadata
    pub async fn info(&self) -> SessionInfo {
        let session = self.session.lock().await;
        SessionInfo {
            id: self.id,
            created_at: session.created_at(),
            move_count: session.stats().len(),
            subscriber_count: self.subscriber_count(),
        }
    }

    /// Copy of the subscriber set, so sends happen without holding its lock
    fn subscribers_snapshot(&self) -> Vec<ClientConnection> {
        self.subscribers.read().values().cloned().collect()
    }

    /// Queue a message for each connection without waiting
    ///
    /// A subscriber whose queue is full is dropped from the room and told to
    /// disconnect; one whose queue is closed is skipped.
    fn fan_out(&self, recipients: &[ClientConnection], msg: &ServerMessage) -> usize {
        let mut delivered = 0;
        for conn in recipients {
            match conn.try_send(msg.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(session = %self.id, client = %conn.id(), "Evicting slow subscriber");
                    self.unsubscribe(conn.id());
                    conn.evict();
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(session = %self.id, client = %conn.id(), "Skipping closed subscriber");
                }
            }
        }
        delivered
    }
}

/// Keeps a connection subscribed to a room until dropped
pub struct SubscriptionGuard {
    room: Arc<Room>,
    conn_id: Uuid,
}

impl SubscriptionGuard {
    pub fn room(&self) -> &Arc<Room> {
        &self.room
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.room.unsubscribe(self.conn_id);
    }
}

/// Send recorded moves to one connection, oldest first
///
/// Returns false if the connection went away part way.
async fn replay(conn: &ClientConnection, history: &[MoveRecord]) -> bool {
    for record in history {
        let msg = ServerMessage::Play {
            player: record.to_player_state(),
        };
        if let Err(e) = conn.send(msg).await {
            tracing::debug!("Replay aborted: {}", e);
            return false;
        }
    }
    true
}

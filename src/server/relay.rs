//! Per-connection dispatcher: routes a client to host, join or watch, then
//! relays its moves

use super::connection::{create_error_message, ClientConnection};
use super::error::RelayError;
use super::registry::Registry;
use super::room::Room;
use super::rules::{OpenRules, RuleEngine};
use super::session::{Session, PLAYER1, PLAYER2};
use crate::protocol::{
    decode_client_message, ClientMessage, PlayerState, ProtocolError, ServerMessage,
    MAX_MESSAGE_SIZE,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Relays moves between the connections of every live session
#[derive(Clone)]
pub struct Relay {
    registry: Arc<Registry>,
    rules: Arc<dyn RuleEngine>,
    max_message_size: usize,
}

impl Relay {
    /// Create a relay over the given registry, accepting every move
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            rules: Arc::new(OpenRules),
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }

    /// Use a rule engine to veto moves
    pub fn with_rules(mut self, rules: Arc<dyn RuleEngine>) -> Self {
        self.rules = rules;
        self
    }

    /// Limit the size of inbound messages
    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Drive one connection from its `init` message until it goes away
    ///
    /// `inbound` yields the client's text messages and ends when the transport
    /// closes. Fatal errors are reported to the client before being returned;
    /// the caller closes the connection afterwards.
    pub async fn handle_connection(
        &self,
        conn: ClientConnection,
        mut inbound: mpsc::Receiver<String>,
    ) -> Result<(), RelayError> {
        let result = self.dispatch(&conn, &mut inbound).await;

        if let Err(e) = &result {
            // The client may already be gone; nothing left to clean up then.
            let _ = conn.send(create_error_message(e.to_string())).await;
        }

        result
    }

    async fn dispatch(
        &self,
        conn: &ClientConnection,
        inbound: &mut mpsc::Receiver<String>,
    ) -> Result<(), RelayError> {
        let Some(text) = inbound.recv().await else {
            tracing::debug!("Client {} left before sending init", conn.id());
            return Ok(());
        };

        match decode_client_message(&text, self.max_message_size)? {
            ClientMessage::Init {
                join: Some(token),
                player,
                ..
            } => self.join(conn, inbound, &token, player).await,
            ClientMessage::Init {
                watch: Some(token), ..
            } => self.watch(conn, inbound, &token).await,
            ClientMessage::Init { player, .. } => self.start(conn, inbound, player).await,
            other => Err(ProtocolError::unexpected("init", &other).into()),
        }
    }

    /// Handle the first player: start a new session
    async fn start(
        &self,
        conn: &ClientConnection,
        inbound: &mut mpsc::Receiver<String>,
        player: Option<PlayerState>,
    ) -> Result<(), RelayError> {
        let mut session = Session::new();
        if let Some(player) = &player {
            session.announce_player(player);
        }

        let room = Arc::new(Room::new(session));
        let _subscription = room.subscribe(conn);
        let host = self.registry.open_session(Arc::clone(&room));

        tracing::info!(session = %room.id(), client = %conn.id(), "Session started");

        let init = ServerMessage::Init {
            join: host.join_token().to_string(),
            watch: host.watch_token().to_string(),
        };
        let result = if conn.send(init).await.is_ok() {
            self.play(conn, inbound, &room, PLAYER1).await
        } else {
            Ok(())
        };

        let info = room.info().await;
        tracing::info!(
            session = %info.id,
            created_at = %info.created_at,
            moves = info.move_count,
            subscribers = info.subscriber_count,
            "Session ending"
        );

        result
    }

    /// Handle the second player: join an existing session
    async fn join(
        &self,
        conn: &ClientConnection,
        inbound: &mut mpsc::Receiver<String>,
        token: &str,
        player: Option<PlayerState>,
    ) -> Result<(), RelayError> {
        let room = self.registry.lookup_join(token).inspect_err(|_| {
            tracing::info!(client = %conn.id(), "Rejected join with unknown token");
        })?;

        if let Some(player) = &player {
            room.session().await.announce_player(player);
        }

        let _subscription = room.attach(conn).await;
        tracing::info!(session = %room.id(), client = %conn.id(), "Player joined");

        self.play(conn, inbound, &room, PLAYER2).await
    }

    /// Handle a spectator: watch an existing session
    async fn watch(
        &self,
        conn: &ClientConnection,
        inbound: &mut mpsc::Receiver<String>,
        token: &str,
    ) -> Result<(), RelayError> {
        let room = self.registry.lookup_watch(token).inspect_err(|_| {
            tracing::info!(client = %conn.id(), "Rejected watch with unknown token");
        })?;

        let _subscription = room.attach(conn).await;
        tracing::info!(session = %room.id(), client = %conn.id(), "Spectator attached");

        // Spectators only wait for the connection to close.
        while next_message(conn, inbound).await.is_some() {
            tracing::debug!("Ignoring message from spectator {}", conn.id());
        }

        tracing::info!(session = %room.id(), client = %conn.id(), "Spectator left");
        Ok(())
    }

    /// Receive and relay moves from a player until the connection closes
    async fn play(
        &self,
        conn: &ClientConnection,
        inbound: &mut mpsc::Receiver<String>,
        room: &Room,
        identity: &'static str,
    ) -> Result<(), RelayError> {
        while let Some(text) = next_message(conn, inbound).await {
            match self.apply_move(room, &text).await {
                Ok(recipients) => {
                    tracing::debug!(
                        session = %room.id(),
                        player = identity,
                        recipients,
                        "Move relayed"
                    );
                }
                Err(e) if e.is_recoverable() => {
                    tracing::info!(
                        session = %room.id(),
                        player = identity,
                        "Rejected move: {}",
                        e
                    );
                    if conn.send(create_error_message(e.to_string())).await.is_err() {
                        break;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(session = %room.id(), client = %conn.id(), player = identity, "Player left");
        Ok(())
    }

    async fn apply_move(&self, room: &Room, text: &str) -> Result<usize, RelayError> {
        let player = match decode_client_message(text, self.max_message_size)? {
            ClientMessage::Play { player } => player,
            other => return Err(ProtocolError::unexpected("play", &other).into()),
        };

        Ok(room.play(self.rules.as_ref(), &player).await?)
    }
}

/// Next inbound message, or None once the client left or was evicted
async fn next_message(
    conn: &ClientConnection,
    inbound: &mut mpsc::Receiver<String>,
) -> Option<String> {
    tokio::select! {
        text = inbound.recv() => text,
        _ = conn.evicted() => {
            tracing::info!(client = %conn.id(), "Disconnecting client that fell behind");
            None
        }
    }
}

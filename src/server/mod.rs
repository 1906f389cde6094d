//! Server module - WebSocket listener, session registry and move relay

mod connection;
mod error;
mod listener;
mod registry;
mod relay;
mod room;
mod rules;
mod session;

pub use connection::{client_reader_task, client_writer_task, ClientConnection};
pub use error::{RelayError, GAME_NOT_FOUND};
pub use listener::RelayServer;
pub use registry::{generate_token, HostGuard, Registry, TOKEN_BYTES};
pub use relay::Relay;
pub use room::{Room, SubscriptionGuard};
pub use rules::{IllegalMove, OpenRules, RuleEngine};
pub use session::{MoveRecord, Session, SessionInfo, PLAYER1, PLAYER2, STARTING_HEALTH};

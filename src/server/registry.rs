//! Token tables mapping join and watch capabilities to live sessions

use super::error::RelayError;
use super::room::Room;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Random bytes behind every token
pub const TOKEN_BYTES: usize = 12;

/// Generate an unguessable, URL-safe capability token
pub fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Join and watch token tables
///
/// Both tables hold shared handles to the same [`Room`] for a session. Locks
/// are never held across an await, so cleanup can run from `Drop`.
#[derive(Default)]
pub struct Registry {
    join: RwLock<HashMap<String, Arc<Room>>>,
    watch: RwLock<HashMap<String, Arc<Room>>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_join(&self, token: String, room: Arc<Room>) {
        self.join.write().insert(token, room);
    }

    pub fn register_watch(&self, token: String, room: Arc<Room>) {
        self.watch.write().insert(token, room);
    }

    /// Find the session a join token grants access to
    pub fn lookup_join(&self, token: &str) -> Result<Arc<Room>, RelayError> {
        self.join.read().get(token).cloned().ok_or(RelayError::NotFound)
    }

    /// Find the session a watch token grants access to
    pub fn lookup_watch(&self, token: &str) -> Result<Arc<Room>, RelayError> {
        self.watch.read().get(token).cloned().ok_or(RelayError::NotFound)
    }

    pub fn unregister_join(&self, token: &str) -> Option<Arc<Room>> {
        self.join.write().remove(token)
    }

    pub fn unregister_watch(&self, token: &str) -> Option<Arc<Room>> {
        self.watch.write().remove(token)
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.join.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Issue fresh tokens for a room and register it under both
    ///
    /// The entries live exactly as long as the returned guard.
    pub fn open_session(self: &Arc<Self>, room: Arc<Room>) -> HostGuard {
        let join = generate_token();
        let watch = generate_token();

        self.register_join(join.clone(), Arc::clone(&room));
        self.register_watch(watch.clone(), room);

        HostGuard {
            registry: Arc::clone(self),
            join,
            watch,
        }
    }
}

/// Owns a session's registry entries on behalf of its host
pub struct HostGuard {
    registry: Arc<Registry>,
    join: String,
    watch: String,
}

impl HostGuard {
    pub fn join_token(&self) -> &str {
        &self.join
    }

    pub fn watch_token(&self) -> &str {
        &self.watch
    }
}

impl Drop for HostGuard {
    fn drop(&mut self) {
        let room = self.registry.unregister_join(&self.join);
        self.registry.unregister_watch(&self.watch);

        if let Some(room) = room {
            tracing::info!(
                session = %room.id(),
                subscribers = room.subscriber_count(),
                "Session closed"
            );
        }
    }
}

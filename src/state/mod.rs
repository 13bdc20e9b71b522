pub mod export;
mod roster;
mod session;
mod submission;
mod voting;

pub use voting::RestartSummary;

use crate::identity::{IdentityProvider, LocalIdentityProvider};
use crate::protocol::ServerMessage;
use crate::store::{DocumentStore, MemoryStore};
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Shared application state
///
/// Authoritative data lives in the document store and the identity provider.
/// Sessions and the broadcast channels are process-local.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub sessions: Arc<RwLock<HashMap<SessionToken, Session>>>,
    /// Broadcast channel for messages every connected client receives
    pub broadcast: broadcast::Sender<ServerMessage>,
    /// Broadcast channel for admin-only messages
    pub admin_broadcast: broadcast::Sender<ServerMessage>,
}

impl AppState {
    /// State backed by the in-memory store and identity provider
    pub fn new() -> Self {
        Self::with_backends(
            Arc::new(MemoryStore::new()),
            Arc::new(LocalIdentityProvider::new()),
        )
    }

    pub fn with_backends(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let (tx, _rx) = broadcast::channel(100);
        let (admin_tx, _admin_rx) = broadcast::channel(100);
        Self {
            store,
            identity,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            broadcast: tx,
            admin_broadcast: admin_tx,
        }
    }

    /// Send to every connected client. No receivers is fine.
    pub fn broadcast_to_all(&self, msg: ServerMessage) {
        let _ = self.broadcast.send(msg);
    }

    /// Send to connected admins only
    pub fn broadcast_to_admin(&self, msg: ServerMessage) {
        let _ = self.admin_broadcast.send(msg);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! Rooms live in a map keyed by room id and each room sits behind its own
//! async mutex, so events for one room are applied and fanned out strictly
//! one at a time while unrelated rooms proceed in parallel.
//!
//! LOCK ORDER
//! ==========
//! `rooms` before any room mutex. The `connections` index is a plain mutex
//! that is never held across an await.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::ws::Utf8Bytes;
use frames::{ServerEvent, User};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::services::drawing::DrawingState;
use crate::services::room::IdentityAllocator;

/// Opaque handle issued when a websocket is accepted.
pub type ConnectionId = Uuid;

/// Outbound queue of one connection. Unbounded: a slow reader falls behind
/// without blocking the room.
pub type Outbound = mpsc::UnboundedSender<Utf8Bytes>;

pub type SharedRoom = Arc<tokio::sync::Mutex<RoomState>>;

// =============================================================================
// ROOM STATE
// =============================================================================

/// A joined connection: who it is and where its frames go.
#[derive(Debug)]
pub struct Member {
    pub user: User,
    pub tx: Outbound,
}

/// Live state of one room. Discarded when its last member leaves.
#[derive(Debug)]
pub struct RoomState {
    pub id: String,
    pub members: HashMap<ConnectionId, Member>,
    pub drawing: DrawingState,
}

impl RoomState {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), members: HashMap::new(), drawing: DrawingState::new() }
    }

    /// Roster snapshot, in no particular order.
    #[must_use]
    pub fn users(&self) -> Vec<User> {
        self.members.values().map(|m| m.user.clone()).collect()
    }

    /// Serialize `event` once and queue it for every member except `exclude`.
    ///
    /// Best-effort: members whose connection already closed are skipped.
    pub fn broadcast(&self, event: &ServerEvent, exclude: Option<ConnectionId>) {
        let text = match event.encode() {
            Ok(text) => Utf8Bytes::from(text),
            Err(e) => {
                warn!(room_id = %self.id, event = event.event(), error = %e, "failed to encode broadcast");
                return;
            }
        };

        for (connection_id, member) in &self.members {
            if exclude == Some(*connection_id) {
                continue;
            }
            if member.tx.send(text.clone()).is_err() {
                debug!(room_id = %self.id, %connection_id, event = event.event(), "skipped closed connection");
            }
        }
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RwLock<HashMap<String, SharedRoom>>>,
    /// Room id of every joined connection.
    pub connections: Arc<Mutex<HashMap<ConnectionId, String>>>,
    pub identities: Arc<IdentityAllocator>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            connections: Arc::new(Mutex::new(HashMap::new())),
            identities: Arc::new(IdentityAllocator::new()),
            config: Arc::new(config),
        }
    }

    /// Room id the connection is currently joined to.
    #[must_use]
    pub fn room_id_of(&self, connection_id: ConnectionId) -> Option<String> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&connection_id)
            .cloned()
    }

    pub async fn room(&self, room_id: &str) -> Option<SharedRoom> {
        self.rooms.read().await.get(room_id).cloned()
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;

//! Room service: membership, identity assignment, and room lifecycle.
//!
//! DESIGN
//! ======
//! A room is created by its first join and dropped, drawing state included,
//! when its last member leaves. Creation and removal both happen under the
//! `rooms` write lock, so a concurrent join either finds the live room or
//! creates a fresh one, never a detached one.
//!
//! Both membership calls hand back the room guard. Callers broadcast the
//! roster change before releasing it, which keeps joins and leaves in order
//! with the drawing events of the same room.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};

use frames::{JoinRoom, User};
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};

use crate::state::{AppState, ConnectionId, Member, Outbound, RoomState};

pub const DEFAULT_ROOM: &str = "default";

/// Colors handed out round-robin, one per join.
pub const PALETTE: [&str; 8] = ["#e74c3c", "#3498db", "#2ecc71", "#f39c12", "#9b59b6", "#1abc9c", "#e67e22", "#34495e"];

// =============================================================================
// IDENTITY
// =============================================================================

/// Process-wide join counter. The Nth join (from 1) is named `User N` and
/// colored `PALETTE[(N - 1) % 8]`.
#[derive(Debug, Default)]
pub struct IdentityAllocator {
    joins: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub ordinal: u64,
    pub color: &'static str,
}

impl IdentityAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> Identity {
        let ordinal = self.joins.fetch_add(1, Ordering::Relaxed) + 1;
        Identity { ordinal, color: palette_color(ordinal) }
    }
}

/// Palette entry for the `ordinal`-th join. Ordinals start at 1.
#[must_use]
pub fn palette_color(ordinal: u64) -> &'static str {
    let slot = ordinal.saturating_sub(1) % PALETTE.len() as u64;
    PALETTE[usize::try_from(slot).unwrap_or_default()]
}

// =============================================================================
// MEMBERSHIP
// =============================================================================

/// A connection that just left a room, with the room still locked.
pub struct Departure {
    pub room_id: String,
    pub user: User,
    pub room: OwnedMutexGuard<RoomState>,
}

/// Room a `join_room` request targets: `roomId`, or the default room.
#[must_use]
pub fn requested_room_id(request: &JoinRoom) -> &str {
    non_empty(request.room_id.as_deref()).unwrap_or(DEFAULT_ROOM)
}

/// Join `connection_id` to the requested room, creating it if absent.
///
/// The connection must not be in a different room; leave that first. A
/// connection already in the requested room keeps the room and its drawing,
/// and its member entry is replaced with the fresh identity and outbound.
pub async fn join_room(
    state: &AppState,
    connection_id: ConnectionId,
    tx: Outbound,
    request: &JoinRoom,
) -> (User, OwnedMutexGuard<RoomState>) {
    let room_id = requested_room_id(request).to_owned();
    let identity = state.identities.next();
    let user = User {
        id: non_empty(request.user_id.as_deref()).map_or_else(|| connection_id.to_string(), str::to_owned),
        name: non_empty(request.user_name.as_deref()).map_or_else(|| format!("User {}", identity.ordinal), str::to_owned),
        color: identity.color.to_owned(),
        connection_id: connection_id.to_string(),
    };

    let mut room = {
        let mut rooms = state.rooms.write().await;
        let shared = rooms
            .entry(room_id.clone())
            .or_insert_with(|| {
                info!(%room_id, "room created");
                Arc::new(tokio::sync::Mutex::new(RoomState::new(room_id.clone())))
            })
            .clone();
        shared.lock_owned().await
    };

    room.members.insert(connection_id, Member { user: user.clone(), tx });
    state
        .connections
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(connection_id, room_id.clone());

    info!(%connection_id, %room_id, user_id = %user.id, members = room.members.len(), "joined room");
    (user, room)
}

/// Remove `connection_id` from its room. Returns `None` if it was not in one,
/// so a second call for the same connection does nothing.
pub async fn leave_room(state: &AppState, connection_id: ConnectionId) -> Option<Departure> {
    let room_id = state
        .connections
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&connection_id)?;

    let mut rooms = state.rooms.write().await;
    let Some(shared) = rooms.get(&room_id).cloned() else {
        warn!(%connection_id, %room_id, "connection indexed to a missing room");
        return None;
    };
    let mut room = shared.lock_owned().await;
    let member = room.members.remove(&connection_id)?;
    info!(%connection_id, %room_id, remaining = room.members.len(), "left room");

    if room.members.is_empty() {
        rooms.remove(&room_id);
        info!(%room_id, strokes = room.drawing.history().len(), "room closed");
    }
    drop(rooms);

    Some(Departure { room_id, user: member.user, room })
}

/// Lock the room `connection_id` is joined to.
pub async fn lock_room_of(state: &AppState, connection_id: ConnectionId) -> Option<OwnedMutexGuard<RoomState>> {
    let room_id = state.room_id_of(connection_id)?;
    let shared = state.room(&room_id).await?;
    Some(shared.lock_owned().await)
}

/// Roster of a room; empty when the room does not exist.
pub async fn users_in_room(state: &AppState, room_id: &str) -> Vec<User> {
    match state.room(room_id).await {
        Some(shared) => shared.lock().await.users(),
        None => Vec::new(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;

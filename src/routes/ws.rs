//! WebSocket handler: protocol dispatch and room fan-out.
//!
//! DESIGN
//! ======
//! On upgrade, generates a connection ID and enters a `select!` loop:
//! - Incoming client frames → decode + dispatch by event name
//! - Broadcast frames queued by room peers → forward to client
//!
//! Handler functions are pure business logic over a locked room: they
//! mutate the drawing state and return an `Outcome`. The dispatch layer
//! applies the outcome while still holding the room lock, so each event is
//! mutated and fanned out before the next one for that room starts.
//!
//! Nothing is ever sent back on a bad frame. Malformed text, unknown events,
//! events before `join_room`, and references to unknown strokes are all
//! dropped with a debug log.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → connection id issued, nothing sent yet
//! 2. `join_room` → `user_list` + `full_state` to sender, `user_joined` to peers
//! 3. Drawing events → mutate room → broadcast per `Outcome`
//! 4. Close → leave room → `user_left` to remaining members

use axum::extract::State;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use frames::{
    ClientEvent, CursorUpdate, JoinRoom, RedoApplied, RosterChange, ServerEvent, StrokeEnd, UndoApplied, UserList,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::services;
use crate::services::drawing::StrokeInit;
use crate::services::room::Departure;
use crate::state::{AppState, ConnectionId, RoomState};

// =============================================================================
// SESSION
// =============================================================================

/// One accepted connection.
///
/// Every join opens a fresh inbox, so frames still queued from a previous
/// room are dropped together with the old receiver.
pub struct Session {
    pub id: ConnectionId,
    inbox: Option<mpsc::UnboundedReceiver<Utf8Bytes>>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self { id: Uuid::new_v4(), inbox: None }
    }

    /// Next frame queued for this connection by its room.
    async fn next_broadcast(&mut self) -> Option<Utf8Bytes> {
        match self.inbox.as_mut() {
            Some(rx) => rx.recv().await,
            None => std::future::pending().await,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by room handlers. The dispatch layer uses this to decide
/// who receives what; handlers never send frames directly.
#[derive(Debug)]
enum Outcome {
    /// Broadcast to ALL room members including the sender.
    Broadcast(ServerEvent),
    /// Broadcast to room peers EXCLUDING the sender, who already applied it.
    BroadcastExcludeSender(ServerEvent),
    /// Nothing changed and nothing is sent.
    Ignored,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let mut session = Session::new();
    info!(connection_id = %session.id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        dispatch_text(&state, &mut socket, &mut session, text.as_str()).await;
                    }
                    Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                        Ok(text) => dispatch_text(&state, &mut socket, &mut session, text).await,
                        Err(_) => debug!(connection_id = %session.id, "ws: dropped non-utf8 binary frame"),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(text) = session.next_broadcast() => {
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    }

    disconnect(&state, session.id).await;
    info!(connection_id = %session.id, "ws: client disconnected");
}

/// Process one inbound frame and write the sender-only replies.
async fn dispatch_text(state: &AppState, socket: &mut WebSocket, session: &mut Session, text: &str) {
    for event in on_message(state, session, text).await {
        if !send_event(socket, &event).await {
            debug!(connection_id = %session.id, event = event.event(), "ws: reply not delivered");
            break;
        }
    }
}

/// Encode and write one event. Returns false if nothing was written.
async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> bool {
    match event.encode() {
        Ok(text) => socket.send(Message::Text(text.into())).await.is_ok(),
        Err(e) => {
            warn!(event = event.event(), error = %e, "ws: failed to encode event");
            false
        }
    }
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Decode and apply one inbound frame. Returns the events destined for the
/// sender only; everything else travels through room broadcasts.
pub async fn on_message(state: &AppState, session: &mut Session, text: &str) -> Vec<ServerEvent> {
    let connection_id = session.id;
    let event = match ClientEvent::decode(text) {
        Ok(event) => event,
        Err(e) => {
            debug!(%connection_id, error = %e, "ws: dropped inbound frame");
            return Vec::new();
        }
    };

    if let ClientEvent::JoinRoom(request) = event {
        return handle_join(state, session, &request).await;
    }

    let name = event.event();
    let Some(mut room) = services::room::lock_room_of(state, connection_id).await else {
        debug!(%connection_id, event = name, "ws: dropped event before join_room");
        return Vec::new();
    };

    match handle_room_event(&mut room, connection_id, event) {
        Outcome::Broadcast(event) => room.broadcast(&event, None),
        Outcome::BroadcastExcludeSender(event) => room.broadcast(&event, Some(connection_id)),
        Outcome::Ignored => debug!(%connection_id, room_id = %room.id, event = name, "ws: event had no effect"),
    }
    Vec::new()
}

/// Run leave cleanup for a closed connection. Safe to call more than once.
pub async fn disconnect(state: &AppState, connection_id: ConnectionId) {
    if let Some(departure) = services::room::leave_room(state, connection_id).await {
        announce_departure(departure);
    }
}

fn announce_departure(departure: Departure) {
    let Departure { user, room, .. } = departure;
    let users = room.users();
    room.broadcast(&ServerEvent::UserLeft(RosterChange { user, users }), None);
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn handle_join(state: &AppState, session: &mut Session, request: &JoinRoom) -> Vec<ServerEvent> {
    // Moving to another room leaves the current one first, with the usual
    // announcement. Re-joining the same room keeps membership so the room
    // and its drawing survive.
    let target = services::room::requested_room_id(request);
    if state.room_id_of(session.id).as_deref() != Some(target) {
        disconnect(state, session.id).await;
    }

    let (tx, rx) = mpsc::unbounded_channel();
    session.inbox = Some(rx);

    let (user, room) = services::room::join_room(state, session.id, tx, request).await;
    let users = room.users();
    room.broadcast(&ServerEvent::UserJoined(RosterChange { user, users: users.clone() }), Some(session.id));

    vec![ServerEvent::UserList(UserList { users }), ServerEvent::FullState(room.drawing.full_state())]
}

fn handle_room_event(room: &mut RoomState, connection_id: ConnectionId, event: ClientEvent) -> Outcome {
    let Some(user) = room.members.get(&connection_id).map(|m| m.user.clone()) else {
        return Outcome::Ignored;
    };

    match event {
        ClientEvent::StrokeStart(start) => {
            let init = StrokeInit { id: start.stroke_id, user_id: user.id, tool: start.tool, style: start.style };
            match room.drawing.add_stroke(init) {
                Some(stroke) => Outcome::BroadcastExcludeSender(ServerEvent::StrokeStart(stroke.clone())),
                None => Outcome::Ignored,
            }
        }
        ClientEvent::StrokeSegment(segment) => {
            // Relayed even on a miss; remote replicas discard unknown ids themselves.
            if room.drawing.append_segment(&segment.stroke_id, segment.start, segment.end).is_none() {
                debug!(%connection_id, stroke_id = %segment.stroke_id, "ws: segment for unknown stroke");
            }
            Outcome::BroadcastExcludeSender(ServerEvent::StrokeSegment(segment))
        }
        ClientEvent::StrokeEnd(end) => {
            Outcome::BroadcastExcludeSender(ServerEvent::StrokeEnd(StrokeEnd { stroke_id: end.stroke_id }))
        }
        ClientEvent::Cursor(at) => Outcome::BroadcastExcludeSender(ServerEvent::Cursor(CursorUpdate {
            user_id: user.id,
            user_name: user.name,
            x: at.x,
            y: at.y,
        })),
        ClientEvent::Undo => match room.drawing.undo() {
            Some(stroke) => Outcome::Broadcast(ServerEvent::UndoApplied(UndoApplied {
                stroke_id: stroke.id.clone(),
                user_id: stroke.user_id.clone(),
            })),
            None => Outcome::Ignored,
        },
        ClientEvent::Redo => match room.drawing.redo() {
            Some(stroke) => Outcome::Broadcast(ServerEvent::RedoApplied(RedoApplied { stroke: stroke.clone() })),
            None => Outcome::Ignored,
        },
        ClientEvent::JoinRoom(_) => Outcome::Ignored,
    }
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;

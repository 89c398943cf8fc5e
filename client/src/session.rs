//! Sync client: the participant side of a drawing room.
//!
//! DESIGN
//! ======
//! `SyncClient` is transport-agnostic. Pointer input and server frames go
//! in; intent events collect in an outbound queue and geometry goes out to
//! the `Renderer`. The transport decides when the queue is flushed.
//!
//! Local strokes are optimistic: they are added to the replica and drawn
//! before the server has seen them. Drawing starts only once the replica
//! holds the server's `full_state`; earlier strokes would be wiped by it. The server relays them to everyone
//! else under the same id, so the origin's copy is never overwritten.
//! Undo and redo are not optimistic; they only take effect when the
//! server's `undo_applied` / `redo_applied` arrives.
//!
//! THROTTLING
//! ==========
//! Cursor updates go out at most once per `cursor_interval`. Segments go out
//! at most once per `segment_interval`, each from the last emitted point to
//! the current one. The local replica receives exactly the emitted segments,
//! which keeps the origin identical to every remote copy.

use std::collections::VecDeque;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use frames::{
    ClientEvent, CursorMove, JoinRoom, Point, ServerEvent, Stroke, StrokeEnd, StrokeSegment, StrokeStart, Style, Tool,
};
use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::debug;

use crate::render::Renderer;
use crate::replica::{Replica, Repaint};

pub const DEFAULT_ROOM: &str = "default";
pub const DEFAULT_SEGMENT_INTERVAL: Duration = Duration::from_millis(8);
pub const DEFAULT_CURSOR_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

const STROKE_ID_SUFFIX_LEN: usize = 7;

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub room_id: String,
    /// Sent with `join_room` so the server stamps local strokes with it.
    pub user_id: String,
    pub user_name: Option<String>,
    pub segment_interval: Duration,
    pub cursor_interval: Duration,
    pub reconnect_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            room_id: DEFAULT_ROOM.to_owned(),
            user_id: uuid::Uuid::new_v4().to_string(),
            user_name: None,
            segment_interval: DEFAULT_SEGMENT_INTERVAL,
            cursor_interval: DEFAULT_CURSOR_INTERVAL,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// WebSocket connection status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Not connected; socket is closed or not yet opened.
    #[default]
    Disconnected,
    /// WebSocket handshake is in progress.
    Connecting,
    /// WebSocket is open and `join_room` has been queued.
    Connected,
}

/// The stroke currently under the pointer.
#[derive(Debug)]
struct LocalStroke {
    id: String,
    last_emitted: Point,
    last_emitted_at: Instant,
}

// =============================================================================
// SYNC CLIENT
// =============================================================================

pub struct SyncClient<R: Renderer> {
    config: ClientConfig,
    replica: Replica,
    renderer: R,
    status: ConnectionStatus,
    tool: Tool,
    style: Style,
    outbound: VecDeque<ClientEvent>,
    drawing: Option<LocalStroke>,
    last_cursor_at: Option<Instant>,
}

impl<R: Renderer> SyncClient<R> {
    pub fn new(config: ClientConfig, renderer: R) -> Self {
        Self {
            config,
            replica: Replica::new(),
            renderer,
            status: ConnectionStatus::Disconnected,
            tool: Tool::Brush,
            style: Style::default(),
            outbound: VecDeque::new(),
            drawing: None,
            last_cursor_at: None,
        }
    }

    // =========================================================================
    // CONNECTION
    // =========================================================================

    pub fn on_connecting(&mut self) {
        self.status = ConnectionStatus::Connecting;
    }

    /// Channel is open: join the configured room.
    pub fn on_open(&mut self) {
        self.status = ConnectionStatus::Connected;
        self.outbound.clear();
        self.outbound.push_back(ClientEvent::JoinRoom(JoinRoom {
            room_id: Some(self.config.room_id.clone()),
            user_id: Some(self.config.user_id.clone()),
            user_name: self.config.user_name.clone(),
        }));
    }

    /// Channel closed. Nothing queued survives, and the replica waits for
    /// the next `full_state`.
    pub fn on_close(&mut self) {
        self.status = ConnectionStatus::Disconnected;
        self.outbound.clear();
        self.drawing = None;
        self.last_cursor_at = None;
        self.replica.mark_unhydrated();
    }

    // =========================================================================
    // INBOUND
    // =========================================================================

    /// Decode and apply one server frame. Undecodable frames are dropped.
    pub fn handle_text(&mut self, text: &str) {
        match ServerEvent::decode(text) {
            Ok(event) => self.apply(event),
            Err(e) => debug!(error = %e, "client: dropped server frame"),
        }
    }

    pub fn apply(&mut self, event: ServerEvent) {
        let repaint = self.replica.apply(event);
        self.render(&repaint);
    }

    fn render(&mut self, repaint: &Repaint) {
        match repaint {
            Repaint::None => {}
            Repaint::Strokes => self.renderer.redraw(self.replica.strokes()),
            Repaint::Segment { stroke_id } => {
                if let Some(stroke) = self.replica.stroke(stroke_id) {
                    if let Some(segment) = stroke.segments.last() {
                        self.renderer.draw_segment(stroke, segment);
                    }
                }
            }
            Repaint::Cursors => self.renderer.draw_cursors(self.replica.cursors()),
            Repaint::Roster => {
                self.renderer.draw_roster(self.replica.users());
                self.renderer.draw_cursors(self.replica.cursors());
            }
        }
    }

    // =========================================================================
    // LOCAL INPUT
    // =========================================================================

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    /// Style for strokes started from now on. Invalid widths are ignored.
    pub fn set_style(&mut self, style: Style) {
        if style.is_valid() {
            self.style = style;
        }
    }

    /// Begin a stroke at `at`. Returns the new stroke id, or `None` while
    /// the replica is waiting for `full_state`, which would replace the
    /// optimistic stroke.
    pub fn pointer_down(&mut self, at: Point, now: Instant) -> Option<String> {
        if !self.replica.is_hydrated() {
            debug!("client: pointer down ignored until hydrated");
            return None;
        }
        if self.drawing.is_some() {
            self.pointer_up(at);
        }

        let id = new_stroke_id();
        let stroke = Stroke {
            id: id.clone(),
            user_id: self.config.user_id.clone(),
            tool: self.tool,
            style: self.style.clone(),
            segments: Vec::new(),
            timestamp: now_ms(),
        };
        let repaint = self.replica.apply_stroke_start(stroke);
        self.render(&repaint);
        self.queue(ClientEvent::StrokeStart(StrokeStart {
            stroke_id: id.clone(),
            tool: self.tool,
            style: self.style.clone(),
        }));

        // Zero-length first segment so a click leaves a dot.
        self.emit_segment(&id, at, at);
        self.drawing = Some(LocalStroke { id: id.clone(), last_emitted: at, last_emitted_at: now });
        Some(id)
    }

    pub fn pointer_move(&mut self, at: Point, now: Instant) {
        if self.last_cursor_at.is_none_or(|last| now.duration_since(last) >= self.config.cursor_interval) {
            self.last_cursor_at = Some(now);
            self.queue(ClientEvent::Cursor(CursorMove { x: at.x, y: at.y }));
        }

        let Some(local) = self.drawing.as_ref() else {
            return;
        };
        if now.duration_since(local.last_emitted_at) < self.config.segment_interval {
            return;
        }
        let (id, from) = (local.id.clone(), local.last_emitted);
        self.emit_segment(&id, from, at);
        self.drawing = Some(LocalStroke { id, last_emitted: at, last_emitted_at: now });
    }

    /// Finish the current stroke, flushing the tail segment if the pointer
    /// moved since the last one went out.
    pub fn pointer_up(&mut self, at: Point) {
        let Some(local) = self.drawing.take() else {
            return;
        };
        if local.last_emitted != at {
            self.emit_segment(&local.id, local.last_emitted, at);
        }
        self.queue(ClientEvent::StrokeEnd(StrokeEnd { stroke_id: local.id }));
    }

    pub fn request_undo(&mut self) {
        self.queue(ClientEvent::Undo);
    }

    pub fn request_redo(&mut self) {
        self.queue(ClientEvent::Redo);
    }

    fn emit_segment(&mut self, stroke_id: &str, start: Point, end: Point) {
        let segment = StrokeSegment { stroke_id: stroke_id.to_owned(), start, end };
        let repaint = self.replica.apply_stroke_segment(&segment);
        self.render(&repaint);
        self.queue(ClientEvent::StrokeSegment(segment));
    }

    fn queue(&mut self, event: ClientEvent) {
        if self.status == ConnectionStatus::Connected {
            self.outbound.push_back(event);
        } else {
            debug!(event = event.event(), "client: dropped intent while disconnected");
        }
    }

    // =========================================================================
    // OUTBOUND / READ
    // =========================================================================

    /// Take every queued intent, oldest first.
    pub fn drain_outbound(&mut self) -> Vec<ClientEvent> {
        self.outbound.drain(..).collect()
    }

    #[must_use]
    pub fn pending_outbound(&self) -> usize {
        self.outbound.len()
    }

    #[must_use]
    pub fn replica(&self) -> &Replica {
        &self.replica
    }

    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    #[must_use]
    pub fn is_hydrated(&self) -> bool {
        self.replica.is_hydrated()
    }

    #[must_use]
    pub fn is_drawing(&self) -> bool {
        self.drawing.is_some()
    }
}

/// `s-<epoch ms>-<7 random lowercase alphanumerics>`.
fn new_stroke_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(STROKE_ID_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("s-{}-{suffix}", now_ms())
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

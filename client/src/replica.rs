//! Local replica of a room: strokes, peer cursors, and the roster.
//!
//! DESIGN
//! ======
//! Every `apply_*` mirrors one server event and reports what needs to be
//! repainted. Applying is idempotent where delivery can repeat: a stroke id
//! already present is never added twice, and segments for unknown strokes
//! are discarded.
//!
//! Only history is replicated. The server's redo stack stays on the server;
//! a redo arrives as the complete stroke. The replica only counts how deep
//! that stack is, so callers can tell whether a redo would do anything.

use std::collections::HashMap;

use frames::{
    CursorUpdate, FullState, Point, RosterChange, Segment, ServerEvent, Stroke, StrokeEnd, StrokeSegment, User,
};

/// Color used for cursors of users missing from the roster.
pub const UNKNOWN_USER_COLOR: &str = "#666";

/// What a renderer must refresh after an apply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Repaint {
    None,
    /// The stroke list changed in a way that needs a full redraw.
    Strokes,
    /// One segment was appended to the named stroke.
    Segment { stroke_id: String },
    Cursors,
    Roster,
}

/// Last known pointer position of a peer.
#[derive(Clone, Debug, PartialEq)]
pub struct Cursor {
    pub name: String,
    pub color: String,
    pub at: Point,
}

#[derive(Debug, Default)]
pub struct Replica {
    strokes: Vec<Stroke>,
    cursors: HashMap<String, Cursor>,
    users: Vec<User>,
    redo_depth: usize,
    hydrated: bool,
}

impl Replica {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one server event to its `apply_*`.
    pub fn apply(&mut self, event: ServerEvent) -> Repaint {
        match event {
            ServerEvent::UserList(list) => self.apply_roster(list.users),
            ServerEvent::FullState(full) => self.hydrate(full),
            ServerEvent::UserJoined(change) => self.apply_roster(change.users),
            ServerEvent::UserLeft(change) => self.apply_user_left(change),
            ServerEvent::StrokeStart(stroke) => self.apply_stroke_start(stroke),
            ServerEvent::StrokeSegment(segment) => self.apply_stroke_segment(&segment),
            ServerEvent::StrokeEnd(end) => self.apply_stroke_end(&end),
            ServerEvent::Cursor(update) => self.apply_cursor(update),
            ServerEvent::UndoApplied(undo) => self.apply_undo(&undo.stroke_id),
            ServerEvent::RedoApplied(redo) => self.apply_redo(redo.stroke),
        }
    }

    // =========================================================================
    // STROKES
    // =========================================================================

    /// Add a stroke unless one with the same id is already present.
    pub fn apply_stroke_start(&mut self, stroke: Stroke) -> Repaint {
        if self.stroke(&stroke.id).is_some() {
            return Repaint::None;
        }
        let repaint = if stroke.segments.is_empty() { Repaint::None } else { Repaint::Strokes };
        self.strokes.push(stroke);
        repaint
    }

    /// Append a segment to a known stroke; unknown ids are discarded.
    pub fn apply_stroke_segment(&mut self, segment: &StrokeSegment) -> Repaint {
        let Some(stroke) = self.strokes.iter_mut().rev().find(|s| s.id == segment.stroke_id) else {
            return Repaint::None;
        };
        stroke.segments.push(Segment::new(segment.start, segment.end));
        Repaint::Segment { stroke_id: segment.stroke_id.clone() }
    }

    /// Stroke end is a boundary marker; the segments are already complete.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn apply_stroke_end(&self, _end: &StrokeEnd) -> Repaint {
        Repaint::None
    }

    /// Drop the undone stroke entirely. The server's redo stack grew by one
    /// whether or not the stroke was known here.
    pub fn apply_undo(&mut self, stroke_id: &str) -> Repaint {
        self.redo_depth += 1;
        let before = self.strokes.len();
        self.strokes.retain(|s| s.id != stroke_id);
        if self.strokes.len() == before { Repaint::None } else { Repaint::Strokes }
    }

    /// Put the server's copy of a redone stroke at the end, replacing any
    /// local copy with the same id.
    pub fn apply_redo(&mut self, stroke: Stroke) -> Repaint {
        self.redo_depth = self.redo_depth.saturating_sub(1);
        self.strokes.retain(|s| s.id != stroke.id);
        self.strokes.push(stroke);
        Repaint::Strokes
    }

    /// Replace the replica with the server's history.
    pub fn hydrate(&mut self, full: FullState) -> Repaint {
        self.strokes = full.history;
        self.redo_depth = full.redo_stack.len();
        self.hydrated = true;
        Repaint::Strokes
    }

    /// Forget that the replica matches the server. The next `full_state`
    /// replaces it wholesale.
    pub fn mark_unhydrated(&mut self) {
        self.hydrated = false;
    }

    // =========================================================================
    // PRESENCE
    // =========================================================================

    pub fn apply_cursor(&mut self, update: CursorUpdate) -> Repaint {
        let color = self.color_of(&update.user_id).unwrap_or(UNKNOWN_USER_COLOR).to_owned();
        let cursor = Cursor { name: update.user_name, color, at: Point::new(update.x, update.y) };
        self.cursors.insert(update.user_id, cursor);
        Repaint::Cursors
    }

    pub fn apply_roster(&mut self, users: Vec<User>) -> Repaint {
        self.users = users;
        for (user_id, cursor) in &mut self.cursors {
            if let Some(user) = self.users.iter().find(|u| &u.id == user_id) {
                cursor.color.clone_from(&user.color);
            }
        }
        Repaint::Roster
    }

    /// Replace the roster and forget the departed user's cursor.
    pub fn apply_user_left(&mut self, change: RosterChange) -> Repaint {
        if !change.users.iter().any(|u| u.id == change.user.id) {
            self.cursors.remove(&change.user.id);
        }
        self.apply_roster(change.users)
    }

    // =========================================================================
    // READ
    // =========================================================================

    #[must_use]
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    #[must_use]
    pub fn stroke(&self, stroke_id: &str) -> Option<&Stroke> {
        self.strokes.iter().rev().find(|s| s.id == stroke_id)
    }

    #[must_use]
    pub fn cursors(&self) -> &HashMap<String, Cursor> {
        &self.cursors
    }

    #[must_use]
    pub fn users(&self) -> &[User] {
        &self.users
    }

    #[must_use]
    pub fn color_of(&self, user_id: &str) -> Option<&str> {
        self.users.iter().find(|u| u.id == user_id).map(|u| u.color.as_str())
    }

    /// Strokes waiting on the server's redo stack, as of the last event.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo_depth
    }

    #[must_use]
    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }
}

#[cfg(test)]
#[path = "replica_test.rs"]
mod tests;

//! Drawing state service: per-room stroke history and redo stack.
//!
//! DESIGN
//! ======
//! One `DrawingState` lives inside each room and is only reached through
//! that room's lock, so every method here is plain synchronous mutation.
//! Undo and redo form one LIFO shared by the whole room: undo moves the
//! chronologically last stroke to the redo stack regardless of author.
//!
//! A new stroke does not clear the redo stack. Pending redos survive later
//! drawing, and a redo appends the restored stroke after anything drawn in
//! the meantime.
//!
//! INVARIANTS
//! ==========
//! - A stroke id appears at most once across history and redo stack.
//! - Segments are only appended, never reordered.

use std::time::{SystemTime, UNIX_EPOCH};

use frames::{FullState, Point, Segment, Stroke, Style, Tool};

/// Caller-supplied fields of a new stroke. The store stamps the timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeInit {
    pub id: String,
    pub user_id: String,
    pub tool: Tool,
    pub style: Style,
}

#[derive(Debug, Clone, Default)]
pub struct DrawingState {
    history: Vec<Stroke>,
    redo_stack: Vec<Stroke>,
}

impl DrawingState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new, segment-less stroke to history.
    ///
    /// Returns `None` without mutating when the init is malformed: empty id,
    /// invalid width, or an id already present in history or redo stack.
    pub fn add_stroke(&mut self, init: StrokeInit) -> Option<&Stroke> {
        if init.id.is_empty() || !init.style.is_valid() || self.contains(&init.id) {
            return None;
        }
        self.history.push(Stroke {
            id: init.id,
            user_id: init.user_id,
            tool: init.tool,
            style: init.style,
            segments: Vec::new(),
            timestamp: now_ms(),
        });
        self.history.last()
    }

    /// Append one segment to a stroke in history.
    ///
    /// Strokes that were undone or never existed are a referential miss:
    /// `None`, no mutation.
    pub fn append_segment(&mut self, stroke_id: &str, start: Point, end: Point) -> Option<&Stroke> {
        // Active strokes sit at the tail.
        let stroke = self.history.iter_mut().rev().find(|s| s.id == stroke_id)?;
        stroke.segments.push(Segment::new(start, end));
        Some(&*stroke)
    }

    /// Move the last stroke in history onto the redo stack.
    pub fn undo(&mut self) -> Option<&Stroke> {
        let stroke = self.history.pop()?;
        self.redo_stack.push(stroke);
        self.redo_stack.last()
    }

    /// Move the last undone stroke back to the tail of history.
    pub fn redo(&mut self) -> Option<&Stroke> {
        let stroke = self.redo_stack.pop()?;
        self.history.push(stroke);
        self.history.last()
    }

    /// Independent snapshot of both sequences.
    #[must_use]
    pub fn full_state(&self) -> FullState {
        FullState { history: self.history.clone(), redo_stack: self.redo_stack.clone() }
    }

    #[must_use]
    pub fn history(&self) -> &[Stroke] {
        &self.history
    }

    #[must_use]
    pub fn redo_stack(&self) -> &[Stroke] {
        &self.redo_stack
    }

    /// Whether `stroke_id` is in history or the redo stack.
    #[must_use]
    pub fn contains(&self, stroke_id: &str) -> bool {
        self.history.iter().chain(&self.redo_stack).any(|s| s.id == stroke_id)
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

#[cfg(test)]
#[path = "drawing_test.rs"]
mod tests;

//! Rendering seam.
//!
//! The sync engine never touches pixels. It hands geometry to a `Renderer`
//! and lets the implementation decide how to draw it. The helpers below
//! describe a stroke the way every renderer should draw it: one polyline
//! through the segment endpoints, painted with the stroke's style, where an
//! eraser removes what is underneath instead of adding color.

use std::collections::HashMap;

use frames::{Point, Segment, Stroke, Tool, User};

use crate::replica::Cursor;

pub trait Renderer {
    /// Clear and draw every stroke, oldest first.
    fn redraw(&mut self, strokes: &[Stroke]);

    /// Draw one freshly appended segment on top of what is already shown.
    fn draw_segment(&mut self, stroke: &Stroke, segment: &Segment);

    /// Replace the cursor overlay.
    fn draw_cursors(&mut self, cursors: &HashMap<String, Cursor>);

    /// Show the current room roster.
    fn draw_roster(&mut self, _users: &[User]) {}
}

/// Renderer that draws nothing. For headless participants.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn redraw(&mut self, _strokes: &[Stroke]) {}
    fn draw_segment(&mut self, _stroke: &Stroke, _segment: &Segment) {}
    fn draw_cursors(&mut self, _cursors: &HashMap<String, Cursor>) {}
}

/// How a stroke's pixels combine with what is already drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Composite {
    /// Paint over existing content.
    SourceOver,
    /// Clear existing content under the stroke.
    DestinationOut,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Paint {
    pub color: String,
    pub width: f64,
    pub composite: Composite,
}

/// Points to connect, in order: the first segment's start, then every end.
/// Empty for a stroke with no segments.
#[must_use]
pub fn polyline(stroke: &Stroke) -> Vec<Point> {
    let Some(first) = stroke.segments.first() else {
        return Vec::new();
    };
    std::iter::once(first.start).chain(stroke.segments.iter().map(|s| s.end)).collect()
}

#[must_use]
pub fn paint(stroke: &Stroke) -> Paint {
    let composite = match stroke.tool {
        Tool::Brush => Composite::SourceOver,
        Tool::Eraser => Composite::DestinationOut,
    };
    Paint { color: stroke.style.color.clone(), width: stroke.style.width, composite }
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;

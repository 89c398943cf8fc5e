//! Geometry model: points, segments, strokes, and the people drawing them.
//!
//! Pure data. Coordinates are surface-local and unbounded; clamping belongs
//! to whoever renders them.

use serde::{Deserialize, Serialize};

/// A position on the drawing surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One straight piece of a stroke.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    #[must_use]
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }
}

/// Drawing tool a stroke was made with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Brush,
    Eraser,
}

/// Visual style of a stroke. Fixed once the stroke exists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    pub color: String,
    pub width: f64,
}

impl Style {
    /// Width must be a positive, finite number.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.width > 0.0
    }
}

impl Default for Style {
    fn default() -> Self {
        Self { color: "#000000".to_owned(), width: 5.0 }
    }
}

/// One continuous drawing action by one user.
///
/// `segments` are kept in drawing order and are never reordered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub tool: Tool,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub timestamp: i64,
}

/// A room participant, alive for the lifetime of one connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub color: String,
    pub connection_id: String,
}

/// Snapshot of a room's drawing state, sent to a client right after it joins.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullState {
    #[serde(default)]
    pub history: Vec<Stroke>,
    #[serde(default)]
    pub redo_stack: Vec<Stroke>,
}

//! Typed protocol events in both directions.
//!
//! DESIGN
//! ======
//! Decoding is two-stage: the envelope is parsed first, then the payload is
//! read according to the event name. That keeps the three failure classes
//! apart (unparsable text, unknown event, malformed payload) so callers can
//! log them distinctly before dropping the frame.

use serde::{Deserialize, Serialize};

use crate::model::{FullState, Point, Stroke, Style, Tool, User};
use crate::{CodecError, Envelope, decode_payload, encode_envelope};

// =============================================================================
// EVENT NAMES
// =============================================================================

pub mod name {
    pub const JOIN_ROOM: &str = "join_room";
    pub const STROKE_START: &str = "stroke_start";
    pub const STROKE_SEGMENT: &str = "stroke_segment";
    pub const STROKE_END: &str = "stroke_end";
    pub const CURSOR: &str = "cursor";
    pub const UNDO: &str = "undo";
    pub const REDO: &str = "redo";

    pub const USER_LIST: &str = "user_list";
    pub const FULL_STATE: &str = "full_state";
    pub const USER_JOINED: &str = "user_joined";
    pub const USER_LEFT: &str = "user_left";
    pub const UNDO_APPLIED: &str = "undo_applied";
    pub const REDO_APPLIED: &str = "redo_applied";
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// `join_room` request. Every field is optional; the server fills defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JoinRoom {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

/// `stroke_start` intent from the client that owns the stroke.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeStart {
    pub stroke_id: String,
    #[serde(default)]
    pub tool: Tool,
    #[serde(default)]
    pub style: Style,
}

/// One segment appended to a stroke. Same shape in both directions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeSegment {
    pub stroke_id: String,
    pub start: Point,
    pub end: Point,
}

/// Stroke boundary marker. Same shape in both directions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeEnd {
    pub stroke_id: String,
}

/// Pointer position reported by a client.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CursorMove {
    pub x: f64,
    pub y: f64,
}

/// Pointer position relayed to the other members of a room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorUpdate {
    pub user_id: String,
    pub user_name: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserList {
    #[serde(default)]
    pub users: Vec<User>,
}

/// Membership change: the user who joined or left, plus the roster after it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RosterChange {
    pub user: User,
    #[serde(default)]
    pub users: Vec<User>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoApplied {
    pub stroke_id: String,
    pub user_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RedoApplied {
    pub stroke: Stroke,
}

#[derive(Serialize)]
struct Empty {}

// =============================================================================
// CLIENT -> SERVER
// =============================================================================

/// Intent events sent by a client.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    JoinRoom(JoinRoom),
    StrokeStart(StrokeStart),
    StrokeSegment(StrokeSegment),
    StrokeEnd(StrokeEnd),
    Cursor(CursorMove),
    Undo,
    Redo,
}

impl ClientEvent {
    /// Wire name of this event.
    #[must_use]
    pub fn event(&self) -> &'static str {
        match self {
            Self::JoinRoom(_) => name::JOIN_ROOM,
            Self::StrokeStart(_) => name::STROKE_START,
            Self::StrokeSegment(_) => name::STROKE_SEGMENT,
            Self::StrokeEnd(_) => name::STROKE_END,
            Self::Cursor(_) => name::CURSOR,
            Self::Undo => name::UNDO,
            Self::Redo => name::REDO,
        }
    }

    /// Decode one text frame.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] for unparsable text, unknown event names, or
    /// payloads that do not match the event.
    pub fn decode(text: &str) -> Result<Self, CodecError> {
        Self::from_envelope(Envelope::parse(text)?)
    }

    /// Interpret an already-parsed envelope.
    ///
    /// # Errors
    ///
    /// See [`ClientEvent::decode`].
    pub fn from_envelope(envelope: Envelope) -> Result<Self, CodecError> {
        let (event, data) = envelope.into_data();
        match event.as_str() {
            name::JOIN_ROOM => decode_payload(name::JOIN_ROOM, data).map(Self::JoinRoom),
            name::STROKE_START => decode_payload(name::STROKE_START, data).map(Self::StrokeStart),
            name::STROKE_SEGMENT => decode_payload(name::STROKE_SEGMENT, data).map(Self::StrokeSegment),
            name::STROKE_END => decode_payload(name::STROKE_END, data).map(Self::StrokeEnd),
            name::CURSOR => decode_payload(name::CURSOR, data).map(Self::Cursor),
            name::UNDO => Ok(Self::Undo),
            name::REDO => Ok(Self::Redo),
            _ => Err(CodecError::UnknownEvent(event)),
        }
    }

    /// Encode as `{event, data}` JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if the payload cannot be serialized.
    pub fn encode(&self) -> Result<String, CodecError> {
        let event = self.event();
        match self {
            Self::JoinRoom(p) => encode_envelope(event, p),
            Self::StrokeStart(p) => encode_envelope(event, p),
            Self::StrokeSegment(p) => encode_envelope(event, p),
            Self::StrokeEnd(p) => encode_envelope(event, p),
            Self::Cursor(p) => encode_envelope(event, p),
            Self::Undo | Self::Redo => encode_envelope(event, &Empty {}),
        }
    }
}

// =============================================================================
// SERVER -> CLIENT
// =============================================================================

/// Authoritative events pushed by the server.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerEvent {
    UserList(UserList),
    FullState(FullState),
    UserJoined(RosterChange),
    UserLeft(RosterChange),
    StrokeStart(Stroke),
    StrokeSegment(StrokeSegment),
    StrokeEnd(StrokeEnd),
    Cursor(CursorUpdate),
    UndoApplied(UndoApplied),
    RedoApplied(RedoApplied),
}

impl ServerEvent {
    /// Wire name of this event.
    #[must_use]
    pub fn event(&self) -> &'static str {
        match self {
            Self::UserList(_) => name::USER_LIST,
            Self::FullState(_) => name::FULL_STATE,
            Self::UserJoined(_) => name::USER_JOINED,
            Self::UserLeft(_) => name::USER_LEFT,
            Self::StrokeStart(_) => name::STROKE_START,
            Self::StrokeSegment(_) => name::STROKE_SEGMENT,
            Self::StrokeEnd(_) => name::STROKE_END,
            Self::Cursor(_) => name::CURSOR,
            Self::UndoApplied(_) => name::UNDO_APPLIED,
            Self::RedoApplied(_) => name::REDO_APPLIED,
        }
    }

    /// Decode one text frame.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] for unparsable text, unknown event names, or
    /// payloads that do not match the event.
    pub fn decode(text: &str) -> Result<Self, CodecError> {
        Self::from_envelope(Envelope::parse(text)?)
    }

    /// Interpret an already-parsed envelope.
    ///
    /// # Errors
    ///
    /// See [`ServerEvent::decode`].
    pub fn from_envelope(envelope: Envelope) -> Result<Self, CodecError> {
        let (event, data) = envelope.into_data();
        match event.as_str() {
            name::USER_LIST => decode_payload(name::USER_LIST, data).map(Self::UserList),
            name::FULL_STATE => decode_payload(name::FULL_STATE, data).map(Self::FullState),
            name::USER_JOINED => decode_payload(name::USER_JOINED, data).map(Self::UserJoined),
            name::USER_LEFT => decode_payload(name::USER_LEFT, data).map(Self::UserLeft),
            name::STROKE_START => decode_payload(name::STROKE_START, data).map(Self::StrokeStart),
            name::STROKE_SEGMENT => decode_payload(name::STROKE_SEGMENT, data).map(Self::StrokeSegment),
            name::STROKE_END => decode_payload(name::STROKE_END, data).map(Self::StrokeEnd),
            name::CURSOR => decode_payload(name::CURSOR, data).map(Self::Cursor),
            name::UNDO_APPLIED => decode_payload(name::UNDO_APPLIED, data).map(Self::UndoApplied),
            name::REDO_APPLIED => decode_payload(name::REDO_APPLIED, data).map(Self::RedoApplied),
            _ => Err(CodecError::UnknownEvent(event)),
        }
    }

    /// Encode as `{event, data}` JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if the payload cannot be serialized.
    pub fn encode(&self) -> Result<String, CodecError> {
        let event = self.event();
        match self {
            Self::UserList(p) => encode_envelope(event, p),
            Self::FullState(p) => encode_envelope(event, p),
            Self::UserJoined(p) | Self::UserLeft(p) => encode_envelope(event, p),
            Self::StrokeStart(p) => encode_envelope(event, p),
            Self::StrokeSegment(p) => encode_envelope(event, p),
            Self::StrokeEnd(p) => encode_envelope(event, p),
            Self::Cursor(p) => encode_envelope(event, p),
            Self::UndoApplied(p) => encode_envelope(event, p),
            Self::RedoApplied(p) => encode_envelope(event, p),
        }
    }
}

#[cfg(test)]
#[path = "events_test.rs"]
mod tests;

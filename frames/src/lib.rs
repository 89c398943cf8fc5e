//! Shared wire protocol for realtime drawing rooms.
//!
//! This crate owns the representation used by both the server and `client`.
//! Every message on the channel is a JSON envelope `{event, data}`; the
//! typed views live in [`events`] and the drawing primitives in [`model`].

pub mod events;
pub mod model;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use events::{
    ClientEvent, CursorMove, CursorUpdate, JoinRoom, RedoApplied, RosterChange, ServerEvent, StrokeEnd,
    StrokeSegment, StrokeStart, UndoApplied, UserList,
};
pub use model::{FullState, Point, Segment, Stroke, Style, Tool, User};

/// Error returned when encoding or decoding an envelope.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The raw text is not a JSON envelope.
    #[error("malformed envelope: {0}")]
    Json(#[source] serde_json::Error),
    /// The envelope parsed, but the event name is not part of the protocol.
    #[error("unknown event: {0}")]
    UnknownEvent(String),
    /// The event is known but its payload does not match the expected shape.
    #[error("malformed payload for {event}: {source}")]
    Payload {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },
    /// Serializing an outbound payload failed.
    #[error("failed to encode {event}: {source}")]
    Encode {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw envelope as read off the wire. `data` is optional on input.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Parse one text frame into an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Json`] when the text is not a JSON object with
    /// a string `event` field.
    pub fn parse(text: &str) -> Result<Self, CodecError> {
        serde_json::from_str(text).map_err(CodecError::Json)
    }

    /// Take the payload, reading a missing or `null` payload as `{}`.
    fn into_data(self) -> (String, Value) {
        let data = if self.data.is_null() { Value::Object(Map::new()) } else { self.data };
        (self.event, data)
    }
}

#[derive(Serialize)]
struct OutboundEnvelope<'a, T: Serialize> {
    event: &'a str,
    data: &'a T,
}

/// Serialize `{event, data}` in one pass.
fn encode_envelope<T: Serialize>(event: &'static str, data: &T) -> Result<String, CodecError> {
    serde_json::to_string(&OutboundEnvelope { event, data }).map_err(|source| CodecError::Encode { event, source })
}

fn decode_payload<T: serde::de::DeserializeOwned>(event: &'static str, data: Value) -> Result<T, CodecError> {
    serde_json::from_value(data).map_err(|source| CodecError::Payload { event, source })
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;

use super::*;
use crate::model::Segment;

fn sample_stroke() -> Stroke {
    Stroke {
        id: "s1".into(),
        user_id: "u1".into(),
        tool: Tool::Brush,
        style: Style { color: "#3498db".into(), width: 4.0 },
        segments: vec![Segment::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0))],
        timestamp: 1_700_000_000_000,
    }
}

fn sample_user(n: u32) -> User {
    User {
        id: format!("u{n}"),
        name: format!("User {n}"),
        color: "#2ecc71".into(),
        connection_id: format!("c{n}"),
    }
}

// =============================================================================
// CLIENT EVENTS
// =============================================================================

#[test]
fn join_room_with_empty_payload_uses_defaults() {
    let event = ClientEvent::decode(r#"{"event":"join_room","data":{}}"#).expect("decode");
    assert_eq!(event, ClientEvent::JoinRoom(JoinRoom::default()));
}

#[test]
fn join_room_reads_camel_case_fields() {
    let event = ClientEvent::decode(r#"{"event":"join_room","data":{"roomId":"r1","userId":"u9","userName":"Ada"}}"#)
        .expect("decode");
    let ClientEvent::JoinRoom(join) = event else {
        panic!("expected join_room");
    };
    assert_eq!(join.room_id.as_deref(), Some("r1"));
    assert_eq!(join.user_id.as_deref(), Some("u9"));
    assert_eq!(join.user_name.as_deref(), Some("Ada"));
}

#[test]
fn stroke_start_defaults_tool_and_style() {
    let event = ClientEvent::decode(r#"{"event":"stroke_start","data":{"strokeId":"s1"}}"#).expect("decode");
    let ClientEvent::StrokeStart(start) = event else {
        panic!("expected stroke_start");
    };
    assert_eq!(start.stroke_id, "s1");
    assert_eq!(start.tool, Tool::Brush);
    assert_eq!(start.style, Style::default());
}

#[test]
fn stroke_start_without_id_is_malformed() {
    let err = ClientEvent::decode(r#"{"event":"stroke_start","data":{"tool":"brush"}}"#).expect_err("id required");
    assert!(matches!(err, CodecError::Payload { event: "stroke_start", .. }));
}

#[test]
fn stroke_start_with_unknown_tool_is_malformed() {
    let err = ClientEvent::decode(r#"{"event":"stroke_start","data":{"strokeId":"s1","tool":"laser"}}"#)
        .expect_err("tool is an enum");
    assert!(matches!(err, CodecError::Payload { .. }));
}

#[test]
fn stroke_segment_reads_points() {
    let event = ClientEvent::decode(
        r#"{"event":"stroke_segment","data":{"strokeId":"s1","start":{"x":0,"y":0},"end":{"x":10.5,"y":-3}}}"#,
    )
    .expect("decode");
    assert_eq!(
        event,
        ClientEvent::StrokeSegment(StrokeSegment {
            stroke_id: "s1".into(),
            start: Point::new(0.0, 0.0),
            end: Point::new(10.5, -3.0),
        })
    );
}

#[test]
fn cursor_requires_both_coordinates() {
    let err = ClientEvent::decode(r#"{"event":"cursor","data":{"x":1}}"#).expect_err("y required");
    assert!(matches!(err, CodecError::Payload { event: "cursor", .. }));
}

#[test]
fn undo_and_redo_accept_missing_data() {
    assert_eq!(ClientEvent::decode(r#"{"event":"undo"}"#).expect("undo"), ClientEvent::Undo);
    assert_eq!(ClientEvent::decode(r#"{"event":"redo","data":{}}"#).expect("redo"), ClientEvent::Redo);
}

#[test]
fn unknown_client_event_is_reported_by_name() {
    let err = ClientEvent::decode(r#"{"event":"clear_canvas","data":{}}"#).expect_err("unknown");
    assert!(matches!(err, CodecError::UnknownEvent(ref name) if name == "clear_canvas"));
}

#[test]
fn malformed_client_text_is_a_json_error() {
    let err = ClientEvent::decode("{event: stroke_start").expect_err("broken json");
    assert!(matches!(err, CodecError::Json(_)));
}

#[test]
fn undo_encodes_empty_object_payload() {
    let text = ClientEvent::Undo.encode().expect("encode");
    assert_eq!(text, r#"{"event":"undo","data":{}}"#);
}

#[test]
fn join_room_encoding_omits_absent_fields() {
    let join = ClientEvent::JoinRoom(JoinRoom { room_id: Some("default".into()), ..JoinRoom::default() });
    assert_eq!(join.encode().expect("encode"), r#"{"event":"join_room","data":{"roomId":"default"}}"#);
}

#[test]
fn client_event_names_match_wire_protocol() {
    let cases = [
        (ClientEvent::JoinRoom(JoinRoom::default()), "join_room"),
        (ClientEvent::StrokeEnd(StrokeEnd { stroke_id: "s".into() }), "stroke_end"),
        (ClientEvent::Cursor(CursorMove { x: 0.0, y: 0.0 }), "cursor"),
        (ClientEvent::Undo, "undo"),
        (ClientEvent::Redo, "redo"),
    ];
    for (event, expected) in cases {
        assert_eq!(event.event(), expected);
    }
}

// =============================================================================
// SERVER EVENTS
// =============================================================================

#[test]
fn server_stroke_start_carries_full_stroke() {
    let stroke = sample_stroke();
    let text = ServerEvent::StrokeStart(stroke.clone()).encode().expect("encode");
    let value: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!(value["event"], "stroke_start");
    assert_eq!(value["data"]["id"], "s1");
    assert_eq!(value["data"]["userId"], "u1");
    assert_eq!(ServerEvent::decode(&text).expect("decode"), ServerEvent::StrokeStart(stroke));
}

#[test]
fn undo_applied_uses_camel_case_keys() {
    let event = ServerEvent::UndoApplied(UndoApplied { stroke_id: "s3".into(), user_id: "u2".into() });
    let text = event.encode().expect("encode");
    assert_eq!(text, r#"{"event":"undo_applied","data":{"strokeId":"s3","userId":"u2"}}"#);
}

#[test]
fn redo_applied_wraps_stroke_under_stroke_key() {
    let event = ServerEvent::RedoApplied(RedoApplied { stroke: sample_stroke() });
    let value: serde_json::Value = serde_json::from_str(&event.encode().expect("encode")).expect("json");
    assert_eq!(value["data"]["stroke"]["segments"][0]["start"]["x"], 0.0);
}

#[test]
fn full_state_encodes_redo_stack_in_camel_case() {
    let event = ServerEvent::FullState(FullState { history: vec![sample_stroke()], redo_stack: Vec::new() });
    let value: serde_json::Value = serde_json::from_str(&event.encode().expect("encode")).expect("json");
    assert!(value["data"]["redoStack"].as_array().is_some_and(Vec::is_empty));
    assert_eq!(value["data"]["history"][0]["id"], "s1");
}

#[test]
fn user_joined_and_user_left_share_payload_shape() {
    let change = RosterChange { user: sample_user(2), users: vec![sample_user(1), sample_user(2)] };
    let joined = ServerEvent::UserJoined(change.clone()).encode().expect("encode");
    let left = ServerEvent::UserLeft(change.clone()).encode().expect("encode");
    assert_eq!(ServerEvent::decode(&joined).expect("decode"), ServerEvent::UserJoined(change.clone()));
    assert_eq!(ServerEvent::decode(&left).expect("decode"), ServerEvent::UserLeft(change));
}

#[test]
fn cursor_update_decodes_from_relay_shape() {
    let event = ServerEvent::decode(r#"{"event":"cursor","data":{"userId":"u1","userName":"Ada","x":5,"y":6}}"#)
        .expect("decode");
    assert_eq!(
        event,
        ServerEvent::Cursor(CursorUpdate { user_id: "u1".into(), user_name: "Ada".into(), x: 5.0, y: 6.0 })
    );
}

#[test]
fn unknown_server_event_is_reported_by_name() {
    let err = ServerEvent::decode(r#"{"event":"room:join","data":{}}"#).expect_err("unknown");
    assert!(matches!(err, CodecError::UnknownEvent(_)));
}

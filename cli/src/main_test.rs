use super::*;
use frames::{ClientEvent, FullState, ServerEvent};

#[test]
fn parse_points_reads_pairs_in_order() {
    let points = parse_points("0,0  10,5\t20.5,-3").expect("valid points");
    assert_eq!(points, vec![Point::new(0.0, 0.0), Point::new(10.0, 5.0), Point::new(20.5, -3.0)]);
}

#[test]
fn parse_points_rejects_bad_pairs() {
    assert!(matches!(parse_points("1,2 3"), Err(CliError::InvalidPoint(p)) if p == "3"));
    assert!(matches!(parse_points("a,1"), Err(CliError::InvalidPoint(_))));
    assert!(matches!(parse_points("1,NaN"), Err(CliError::InvalidPoint(_))));
    assert!(matches!(parse_points("   "), Err(CliError::NoPoints)));
}

#[test]
fn draw_args_parse_with_defaults() {
    let cli = Cli::try_parse_from(["inkroom-cli", "draw", "--points", "1,1 2,2"]).expect("parse");
    assert_eq!(cli.url, "ws://127.0.0.1:3000/ws");
    let Command::Draw(draw) = cli.command else {
        panic!("expected draw, got {:?}", cli.command);
    };
    assert_eq!(draw.room.room, "default");
    assert_eq!(draw.color, "#000000");
    assert!((draw.width - 5.0).abs() < f64::EPSILON);
    assert!(!draw.eraser);
}

#[test]
fn room_flag_and_identity_feed_client_config() {
    let cli = Cli::try_parse_from(["inkroom-cli", "--user-name", "Ada", "--user-id", "ada-1", "undo", "--room", "lab"])
        .expect("parse");
    let Command::Undo(room) = &cli.command else {
        panic!("expected undo, got {:?}", cli.command);
    };
    let config = client_config(&cli, room);
    assert_eq!(config.room_id, "lab");
    assert_eq!(config.user_id, "ada-1");
    assert_eq!(config.user_name.as_deref(), Some("Ada"));
}

fn joined(full: FullState) -> SyncClient<QuietRenderer> {
    let mut client = SyncClient::new(ClientConfig::default(), QuietRenderer);
    client.on_open();
    client.apply(ServerEvent::FullState(full));
    client.drain_outbound();
    client
}

fn stroke(id: &str) -> Stroke {
    Stroke {
        id: id.into(),
        user_id: "u1".into(),
        tool: Tool::Brush,
        style: Style::default(),
        segments: Vec::new(),
        timestamp: 0,
    }
}

#[test]
fn trace_stroke_turns_every_point_into_an_endpoint() {
    let mut client = joined(FullState::default());
    let points = [Point::new(0.0, 0.0), Point::new(4.0, 0.0), Point::new(4.0, 4.0)];
    let id = trace_stroke(&mut client, &points, Instant::now()).expect("hydrated client draws");

    let stroke = client.replica().stroke(&id).expect("local stroke");
    let ends: Vec<Point> = stroke.segments.iter().map(|s| s.end).collect();
    assert_eq!(ends, points.to_vec());
    assert!(!client.is_drawing());
}

#[test]
fn trace_stroke_waits_for_room_state() {
    let mut client = SyncClient::new(ClientConfig::default(), QuietRenderer);
    assert_eq!(trace_stroke(&mut client, &[Point::new(1.0, 1.0)], Instant::now()), None);
    assert!(client.replica().strokes().is_empty());
}

#[test]
fn history_requests_are_skipped_when_nothing_to_act_on() {
    let mut client = joined(FullState::default());
    assert_eq!(request_history(&mut client, History::Undo), None);
    assert_eq!(request_history(&mut client, History::Redo), None);
    assert_eq!(client.pending_outbound(), 0);
}

#[test]
fn redo_is_sent_while_the_room_has_undone_strokes() {
    let mut client = joined(FullState { history: vec![stroke("s1")], redo_stack: vec![stroke("s2")] });
    assert_eq!(request_history(&mut client, History::Redo), Some(1));
    assert_eq!(request_history(&mut client, History::Undo), Some(1));
    let sent: Vec<&str> = client.drain_outbound().iter().map(ClientEvent::event).collect();
    assert_eq!(sent, ["redo", "undo"]);
}

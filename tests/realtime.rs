//! End-to-end room behaviour over real websockets.

use std::net::SocketAddr;

use frames::{
    ClientEvent, CursorMove, JoinRoom, Point, ServerEvent, StrokeEnd, StrokeSegment, StrokeStart, Style, Tool,
};
use futures_util::{SinkExt, StreamExt};
use inkroom::config::ServerConfig;
use inkroom::services::room::PALETTE;
use inkroom::state::AppState;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Duration, sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

async fn spawn_server() -> (SocketAddr, AppState) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let state = AppState::new(ServerConfig::default());
    let served = state.clone();
    tokio::spawn(async move {
        inkroom::serve(listener, served).await.expect("server failed");
    });
    (addr, state)
}

struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await.expect("ws connect");
        Self { ws }
    }

    /// Connect, join, and consume the `user_list` + `full_state` replies.
    async fn join(addr: SocketAddr, room_id: &str, user_name: &str) -> (Self, Vec<ServerEvent>) {
        let mut client = Self::connect(addr).await;
        client
            .send(&ClientEvent::JoinRoom(JoinRoom {
                room_id: Some(room_id.into()),
                user_id: None,
                user_name: Some(user_name.into()),
            }))
            .await;
        let replies = vec![client.recv().await, client.recv().await];
        (client, replies)
    }

    async fn send(&mut self, event: &ClientEvent) {
        let text = event.encode().expect("encode");
        self.ws.send(Message::text(text)).await.expect("ws send");
    }

    async fn recv(&mut self) -> ServerEvent {
        loop {
            let msg = timeout(Duration::from_secs(2), self.ws.next())
                .await
                .expect("timed out waiting for server event")
                .expect("stream ended")
                .expect("ws error");
            if let Message::Text(text) = msg {
                return ServerEvent::decode(text.as_str()).expect("server event should decode");
            }
        }
    }

    async fn assert_silent(&mut self) {
        let next = timeout(Duration::from_millis(150), self.ws.next()).await;
        assert!(next.is_err(), "expected no frame, got {next:?}");
    }

    async fn close(mut self) {
        self.ws.close(None).await.expect("ws close");
    }
}

fn stroke_start(id: &str) -> ClientEvent {
    ClientEvent::StrokeStart(StrokeStart { stroke_id: id.into(), tool: Tool::Brush, style: Style::default() })
}

async fn wait_for_room_gone(state: &AppState, room_id: &str) {
    timeout(Duration::from_secs(2), async {
        while state.room(room_id).await.is_some() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("room should be destroyed after last member leaves");
}

#[tokio::test]
async fn peer_observes_stroke_in_order() {
    let (addr, _state) = spawn_server().await;
    let (mut a, _) = TestClient::join(addr, "r1", "Ada").await;
    let (mut b, _) = TestClient::join(addr, "r1", "Bob").await;
    assert!(matches!(a.recv().await, ServerEvent::UserJoined(_)));

    a.send(&stroke_start("s1")).await;
    a.send(&ClientEvent::StrokeSegment(StrokeSegment {
        stroke_id: "s1".into(),
        start: Point::new(0.0, 0.0),
        end: Point::new(10.0, 10.0),
    }))
    .await;
    a.send(&ClientEvent::StrokeEnd(StrokeEnd { stroke_id: "s1".into() })).await;

    assert!(matches!(b.recv().await, ServerEvent::StrokeStart(s) if s.id == "s1"));
    let ServerEvent::StrokeSegment(segment) = b.recv().await else {
        panic!("expected stroke_segment");
    };
    assert_eq!((segment.start, segment.end), (Point::new(0.0, 0.0), Point::new(10.0, 10.0)));
    assert_eq!(b.recv().await, ServerEvent::StrokeEnd(StrokeEnd { stroke_id: "s1".into() }));
    a.assert_silent().await;
}

#[tokio::test]
async fn undo_reaches_caller_and_redo_restores_tail() {
    let (addr, state) = spawn_server().await;
    let (mut a, _) = TestClient::join(addr, "r1", "Ada").await;
    let (mut b, _) = TestClient::join(addr, "r1", "Bob").await;
    a.recv().await;

    for id in ["s1", "s2", "s3"] {
        a.send(&stroke_start(id)).await;
        b.recv().await;
    }

    a.send(&ClientEvent::Undo).await;
    for client in [&mut a, &mut b] {
        let ServerEvent::UndoApplied(undo) = client.recv().await else {
            panic!("expected undo_applied");
        };
        assert_eq!(undo.stroke_id, "s3");
    }

    b.send(&ClientEvent::Redo).await;
    for client in [&mut a, &mut b] {
        let ServerEvent::RedoApplied(redo) = client.recv().await else {
            panic!("expected redo_applied");
        };
        assert_eq!(redo.stroke.id, "s3");
    }

    let room = state.room("r1").await.expect("room exists");
    let ids: Vec<String> = room.lock().await.drawing.history().iter().map(|s| s.id.clone()).collect();
    assert_eq!(ids, ["s1", "s2", "s3"]);
}

#[tokio::test]
async fn late_joiner_hydrates_from_current_history() {
    let (addr, _state) = spawn_server().await;
    let (mut a, _) = TestClient::join(addr, "r1", "Ada").await;
    for id in ["s1", "s2"] {
        a.send(&stroke_start(id)).await;
    }
    a.send(&ClientEvent::Undo).await;
    a.recv().await;

    let (_late, replies) = TestClient::join(addr, "r1", "Late").await;
    let ServerEvent::FullState(full) = &replies[1] else {
        panic!("expected full_state");
    };
    assert_eq!(full.history.len(), 1);
    assert_eq!(full.history[0].id, "s1");
    assert_eq!(full.redo_stack[0].id, "s2");
}

#[tokio::test]
async fn room_is_fresh_after_last_member_disconnects() {
    let (addr, state) = spawn_server().await;
    let (mut a, _) = TestClient::join(addr, "r1", "Ada").await;
    a.send(&stroke_start("s1")).await;
    a.close().await;
    wait_for_room_gone(&state, "r1").await;

    let (_b, replies) = TestClient::join(addr, "r1", "Bob").await;
    assert_eq!(replies[1], ServerEvent::FullState(frames::FullState::default()));
}

#[tokio::test]
async fn disconnect_announces_user_left() {
    let (addr, _state) = spawn_server().await;
    let (mut a, _) = TestClient::join(addr, "r1", "Ada").await;
    let (b, _) = TestClient::join(addr, "r1", "Bob").await;
    a.recv().await;

    b.close().await;
    let ServerEvent::UserLeft(change) = a.recv().await else {
        panic!("expected user_left");
    };
    assert_eq!(change.user.name, "Bob");
    assert_eq!(change.users.len(), 1);
}

#[tokio::test]
async fn colors_follow_join_order() {
    let (addr, _state) = spawn_server().await;
    let mut clients = Vec::new();
    for n in 1..=9 {
        let name = format!("c{n}");
        let (client, replies) = TestClient::join(addr, "palette", &name).await;
        let ServerEvent::UserList(list) = &replies[0] else {
            panic!("expected user_list");
        };
        let me = list.users.iter().find(|u| u.name == name).expect("own user listed");
        assert_eq!(me.color, PALETTE[(n - 1) % 8], "join #{n}");
        clients.push(client);
    }
}

#[tokio::test]
async fn binary_frames_and_garbage_are_handled() {
    let (addr, _state) = spawn_server().await;
    let (mut a, _) = TestClient::join(addr, "r1", "Ada").await;
    let (mut b, _) = TestClient::join(addr, "r1", "Bob").await;
    a.recv().await;

    a.ws.send(Message::text("{{{ definitely not json")).await.expect("ws send");
    let cursor = ClientEvent::Cursor(CursorMove { x: 3.0, y: 4.0 }).encode().expect("encode");
    a.ws.send(Message::binary(cursor.into_bytes())).await.expect("ws send");

    let ServerEvent::Cursor(update) = b.recv().await else {
        panic!("expected cursor");
    };
    assert_eq!(update.user_name, "Ada");
    assert_eq!((update.x, update.y), (3.0, 4.0));
}

#[tokio::test]
async fn healthz_responds_ok() {
    let (addr, _state) = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.expect("tcp connect");
    stream
        .write_all(b"GET /healthz HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .expect("write request");
    let mut response = String::new();
    stream.read_to_string(&mut response).await.expect("read response");
    assert!(response.starts_with("HTTP/1.1 200"), "unexpected response: {response}");
}

use super::*;
use crate::state::test_helpers;
use serde_json::json;
use tokio::time::{Duration, timeout};

fn test_user() -> SessionUser {
    SessionUser {
        id: Uuid::new_v4(),
        name: "Test User".into(),
        email: "test@example.com".into(),
        color: "#FF6B6B".into(),
    }
}

async fn dispatch(
    state: &AppState,
    current_board: &mut Option<Uuid>,
    client_id: Uuid,
    user: &SessionUser,
    client_tx: &mpsc::Sender<Frame>,
    frame: Frame,
) -> Vec<Frame> {
    let text = serde_json::to_string(&frame).expect("serialize frame");
    process_inbound_text(state, current_board, client_id, user, client_tx, &text).await
}

async fn recv_broadcast(rx: &mut mpsc::Receiver<Frame>) -> Frame {
    timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("broadcast receive timed out")
        .expect("broadcast channel closed unexpectedly")
}

async fn assert_no_broadcast(rx: &mut mpsc::Receiver<Frame>) {
    assert!(
        timeout(Duration::from_millis(80), rx.recv()).await.is_err(),
        "expected no broadcast frame"
    );
}

#[tokio::test]
async fn invalid_json_yields_gateway_error() {
    let state = test_helpers::test_app_state();
    let (tx, _rx) = mpsc::channel(8);
    let mut current = None;

    let frames =
        process_inbound_text(&state, &mut current, Uuid::new_v4(), &test_user(), &tx, "not json at all").await;

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].syscall, "gateway:error");
}

#[tokio::test]
async fn unknown_prefix_is_rejected() {
    let state = test_helpers::test_app_state();
    let (tx, _rx) = mpsc::channel(8);
    let mut current = None;

    let req = Frame::request("teleport:now", Data::new());
    let frames = dispatch(&state, &mut current, Uuid::new_v4(), &test_user(), &tx, req).await;

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].status, Status::Error);
    assert_eq!(
        frames[0].data.get("message").and_then(|v| v.as_str()),
        Some("unknown prefix: teleport")
    );
}

#[tokio::test]
async fn cell_write_requires_a_joined_room() {
    let state = test_helpers::test_app_state();
    let (tx, _rx) = mpsc::channel(8);
    let mut current = None;

    let req = Frame::request("cell:write", Data::new()).with_data(frames::FRAME_SCENE, "{}");
    let frames = dispatch(&state, &mut current, Uuid::new_v4(), &test_user(), &tx, req).await;

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].status, Status::Error);
    assert_eq!(
        frames[0].data.get("message").and_then(|v| v.as_str()),
        Some("must join a room first")
    );
}

#[tokio::test]
async fn presence_before_join_is_silently_done() {
    let state = test_helpers::test_app_state();
    let (tx, _rx) = mpsc::channel(8);
    let mut current = None;

    let req = Frame::request("presence:update", Data::new()).with_data("cursor", json!({"x": 1.0, "y": 2.0}));
    let frames = dispatch(&state, &mut current, Uuid::new_v4(), &test_user(), &tx, req).await;

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].status, Status::Done);
}

#[tokio::test]
async fn cell_write_replies_seq_and_broadcasts_to_peers_only() {
    let state = test_helpers::test_app_state();
    let board_id = test_helpers::seed_room(&state).await;
    let sender = Uuid::new_v4();
    let peer = Uuid::new_v4();
    let mut sender_rx = test_helpers::attach_client(&state, board_id, sender).await;
    let mut peer_rx = test_helpers::attach_client(&state, board_id, peer).await;
    let (tx, _rx) = mpsc::channel(8);
    let mut current = Some(board_id);

    let scene = r#"{"objects":[{"type":"rect","left":10.0}],"version":"1.0"}"#;
    let req = Frame::request("cell:write", Data::new())
        .with_board_id(board_id)
        .with_data(frames::FRAME_SCENE, scene);
    let replies = dispatch(&state, &mut current, sender, &test_user(), &tx, req).await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].status, Status::Done);
    assert_eq!(replies[0].data.get(frames::FRAME_SEQ).and_then(serde_json::Value::as_i64), Some(1));

    let notif = recv_broadcast(&mut peer_rx).await;
    assert_eq!(notif.syscall, "cell:write");
    assert_eq!(notif.status, Status::Request);
    assert_eq!(notif.data.get(frames::FRAME_SCENE).and_then(|v| v.as_str()), Some(scene));
    assert_eq!(notif.data.get(frames::FRAME_SEQ).and_then(serde_json::Value::as_i64), Some(1));

    assert_no_broadcast(&mut sender_rx).await;
}

#[tokio::test]
async fn cell_read_returns_current_content() {
    let state = test_helpers::test_app_state();
    let scene = r#"{"objects":[],"version":"1.0"}"#;
    let board_id = test_helpers::seed_room_with_scene(&state, scene).await;
    let (tx, _rx) = mpsc::channel(8);
    let mut current = Some(board_id);

    let req = Frame::request("cell:read", Data::new()).with_board_id(board_id);
    let replies = dispatch(&state, &mut current, Uuid::new_v4(), &test_user(), &tx, req).await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].status, Status::Done);
    assert_eq!(replies[0].data.get(frames::FRAME_SCENE).and_then(|v| v.as_str()), Some(scene));
    assert_eq!(replies[0].data.get(frames::FRAME_SEQ).and_then(serde_json::Value::as_i64), Some(1));
}

#[tokio::test]
async fn successive_writes_bump_seq_and_last_write_wins() {
    let state = test_helpers::test_app_state();
    let board_id = test_helpers::seed_room(&state).await;
    let (tx, _rx) = mpsc::channel(8);
    let mut current = Some(board_id);
    let user = test_user();

    for (i, scene) in ["\"one\"", "\"two\""].iter().enumerate() {
        let req = Frame::request("cell:write", Data::new()).with_data(frames::FRAME_SCENE, *scene);
        let replies = dispatch(&state, &mut current, Uuid::new_v4(), &user, &tx, req).await;
        let seq = replies[0].data.get(frames::FRAME_SEQ).and_then(serde_json::Value::as_i64);
        assert_eq!(seq, Some(i64::try_from(i).unwrap() + 1));
    }

    let req = Frame::request("cell:read", Data::new());
    let replies = dispatch(&state, &mut current, Uuid::new_v4(), &user, &tx, req).await;
    assert_eq!(replies[0].data.get(frames::FRAME_SCENE).and_then(|v| v.as_str()), Some("\"two\""));
}

#[tokio::test]
async fn presence_update_broadcasts_enriched_identity() {
    let state = test_helpers::test_app_state();
    let board_id = test_helpers::seed_room(&state).await;
    let sender = Uuid::new_v4();
    let peer = Uuid::new_v4();
    let mut sender_rx = test_helpers::attach_client(&state, board_id, sender).await;
    let mut peer_rx = test_helpers::attach_client(&state, board_id, peer).await;
    let (tx, _rx) = mpsc::channel(8);
    let mut current = Some(board_id);

    let req = Frame::request("presence:update", Data::new()).with_data("cursor", json!({"x": 3.0, "y": 4.0}));
    let replies = dispatch(&state, &mut current, sender, &test_user(), &tx, req).await;
    // Presence produces no sender reply at all.
    assert!(replies.is_empty());

    let notif = recv_broadcast(&mut peer_rx).await;
    assert_eq!(notif.syscall, "presence:update");
    assert_eq!(
        notif.data.get("client_id").and_then(|v| v.as_str()),
        Some(sender.to_string().as_str())
    );
    // Identity filled from the room registry.
    assert_eq!(notif.data.get("name").and_then(|v| v.as_str()), Some("Test User"));
    assert!((notif.data.get("cursor").unwrap()["x"].as_f64().unwrap() - 3.0).abs() < f64::EPSILON);

    assert_no_broadcast(&mut sender_rx).await;
}

#[tokio::test]
async fn null_cursor_passes_through() {
    let state = test_helpers::test_app_state();
    let board_id = test_helpers::seed_room(&state).await;
    let sender = Uuid::new_v4();
    let peer = Uuid::new_v4();
    let mut peer_rx = test_helpers::attach_client(&state, board_id, peer).await;
    let (tx, _rx) = mpsc::channel(8);
    let mut current = Some(board_id);

    let req = Frame::request("presence:update", Data::new()).with_data("cursor", serde_json::Value::Null);
    let _ = dispatch(&state, &mut current, sender, &test_user(), &tx, req).await;

    let notif = recv_broadcast(&mut peer_rx).await;
    assert!(notif.data.get("cursor").unwrap().is_null());
}

#[tokio::test]
async fn room_part_without_join_is_done() {
    let state = test_helpers::test_app_state();
    let (tx, _rx) = mpsc::channel(8);
    let mut current = None;

    let req = Frame::request("room:part", Data::new());
    let replies = dispatch(&state, &mut current, Uuid::new_v4(), &test_user(), &tx, req).await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].status, Status::Done);
}

#[tokio::test]
async fn room_part_announces_to_peers_and_evicts() {
    let state = test_helpers::test_app_state();
    let board_id = test_helpers::seed_room(&state).await;
    let leaver = Uuid::new_v4();
    let peer = Uuid::new_v4();
    let _leaver_rx = test_helpers::attach_client(&state, board_id, leaver).await;
    let mut peer_rx = test_helpers::attach_client(&state, board_id, peer).await;
    let (tx, _rx) = mpsc::channel(8);
    let mut current = Some(board_id);

    let req = Frame::request("room:part", Data::new());
    let replies = dispatch(&state, &mut current, leaver, &test_user(), &tx, req).await;
    assert_eq!(replies[0].status, Status::Done);
    assert!(current.is_none());

    let notif = recv_broadcast(&mut peer_rx).await;
    assert_eq!(notif.syscall, "room:part");
    assert_eq!(
        notif.data.get("client_id").and_then(|v| v.as_str()),
        Some(leaver.to_string().as_str())
    );

    let rooms = state.rooms.read().await;
    let room = rooms.get(&board_id).expect("room retained for remaining peer");
    assert!(!room.clients.contains_key(&leaver));
}

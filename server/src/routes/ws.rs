//! WebSocket handler — bidirectional frame relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming client frames → parse + dispatch by syscall prefix
//! - Broadcast frames from room peers → forward to client
//!
//! Handler functions are pure business logic — they validate, mutate
//! state, and return an `Outcome`. The dispatch layer owns all outbound
//! concerns: reply to sender and broadcast to peers.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:connected` with `client_id` + identity
//! 2. Client sends frames → dispatch → handler returns Outcome
//! 3. Dispatch applies Outcome (reply / broadcast / both)
//! 4. Close → broadcast `room:part` → cleanup

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use frames::{Data, Frame, Status, encode_frame};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services;
use crate::services::session::SessionUser;
use crate::state::AppState;

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what — handlers never send frames directly.
enum Outcome {
    /// Send done+data to sender only.
    Reply(Data),
    /// Send empty done to sender only.
    Done,
    /// Reply to sender with one payload, broadcast different data to
    /// peers excluding the sender.
    ReplyAndBroadcast { reply: Data, broadcast: Data },
    /// Broadcast data to all room peers EXCLUDING sender. No reply.
    /// Used for presence (ephemeral, never persisted).
    BroadcastExcludeSender(Data),
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(ticket) = params.get("ticket") else {
        return (StatusCode::UNAUTHORIZED, "ticket required").into_response();
    };

    let user_id = match services::session::consume_ws_ticket(&state.pool, ticket).await {
        Ok(Some(uid)) => uid,
        Ok(None) => return (StatusCode::UNAUTHORIZED, "invalid or expired ticket").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "ws ticket validation failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "ticket validation error").into_response();
        }
    };

    let user = match services::session::fetch_user(&state.pool, user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return (StatusCode::UNAUTHORIZED, "unknown user").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "ws user lookup failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "user lookup error").into_response();
        }
    };

    ws.on_upgrade(move |socket| run_ws(socket, state, user))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, user: SessionUser) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for receiving broadcast frames from peers.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(256);

    let welcome = Frame::request("session:connected", Data::new())
        .with_data("client_id", client_id.to_string())
        .with_data("user_id", user.id.to_string())
        .with_data("name", user.name.clone())
        .with_data("color", user.color.clone());
    if send_frame(&mut socket, &welcome).await.is_err() {
        return;
    }

    info!(%client_id, user_id = %user.id, "ws: client connected");

    // Track which board room this client has joined.
    let mut current_board: Option<Uuid> = None;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let replies = process_inbound_text(&state, &mut current_board, client_id, &user, &client_tx, &text).await;
                        for frame in replies {
                            let _ = send_frame(&mut socket, &frame).await;
                        }
                    }
                    Message::Binary(bytes) => {
                        match frames::decode_frame(&bytes) {
                            Ok(req) => {
                                let replies = process_inbound_frame(&state, &mut current_board, client_id, &user, &client_tx, req).await;
                                for frame in replies {
                                    let _ = send_frame(&mut socket, &frame).await;
                                }
                            }
                            Err(e) => {
                                warn!(%client_id, error = %e, "ws: invalid binary frame");
                                let err = Frame::request("gateway:error", Data::new())
                                    .with_data("message", format!("invalid frame: {e}"));
                                let _ = send_frame(&mut socket, &err).await;
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    // Broadcast room:part to peers BEFORE cleanup (part_room may evict state).
    if let Some(board_id) = current_board {
        let part_frame = Frame::request("room:part", Data::new())
            .with_board_id(board_id)
            .with_data("client_id", client_id.to_string())
            .with_data("user_id", user.id.to_string());
        services::room::broadcast(&state, board_id, &part_frame, Some(client_id)).await;

        services::room::part_room(&state, board_id, client_id).await;
    }
    info!(%client_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse one inbound text frame and return the frames owed to the sender.
async fn process_inbound_text(
    state: &AppState,
    current_board: &mut Option<Uuid>,
    client_id: Uuid,
    user: &SessionUser,
    client_tx: &mpsc::Sender<Frame>,
    text: &str,
) -> Vec<Frame> {
    let req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound frame");
            let err = Frame::request("gateway:error", Data::new()).with_data("message", format!("invalid json: {e}"));
            return vec![err];
        }
    };
    process_inbound_frame(state, current_board, client_id, user, client_tx, req).await
}

/// Dispatch one parsed frame and apply the handler's outcome.
///
/// Kept separate from the websocket transport so tests can exercise
/// dispatch and broadcast behavior end-to-end over plain channels.
async fn process_inbound_frame(
    state: &AppState,
    current_board: &mut Option<Uuid>,
    client_id: Uuid,
    user: &SessionUser,
    client_tx: &mpsc::Sender<Frame>,
    mut req: Frame,
) -> Vec<Frame> {
    // Stamp the authenticated user_id as `from`.
    req.from = Some(user.id.to_string());

    let prefix = req.prefix();
    let is_presence = prefix == "presence";
    if !is_presence {
        info!(%client_id, id = %req.id, syscall = %req.syscall, status = ?req.status, "ws: recv frame");
    }

    let result = match prefix {
        "room" => handle_room(state, current_board, client_id, user, client_tx, &req).await,
        "cell" => handle_cell(state, *current_board, &req).await,
        "presence" => Ok(handle_presence(state, *current_board, client_id, &req).await),
        _ => Err(req.error(format!("unknown prefix: {prefix}"))),
    };

    let board_id = *current_board;
    match result {
        Ok(Outcome::Reply(data)) => {
            vec![req.done_with(data)]
        }
        Ok(Outcome::Done) => {
            vec![req.done()]
        }
        Ok(Outcome::ReplyAndBroadcast { reply, broadcast }) => {
            let sender_frame = req.done_with(reply);
            if let Some(bid) = board_id {
                let notif = Frame::request(&req.syscall, broadcast).with_board_id(bid);
                services::room::broadcast(state, bid, &notif, Some(client_id)).await;
            }
            vec![sender_frame]
        }
        Ok(Outcome::BroadcastExcludeSender(data)) => {
            if let Some(bid) = board_id {
                let frame = Frame::request(&req.syscall, data).with_board_id(bid);
                services::room::broadcast(state, bid, &frame, Some(client_id)).await;
            }
            vec![]
        }
        Err(err_frame) => {
            vec![err_frame]
        }
    }
}

// =============================================================================
// ROOM HANDLERS
// =============================================================================

async fn handle_room(
    state: &AppState,
    current_board: &mut Option<Uuid>,
    client_id: Uuid,
    user: &SessionUser,
    client_tx: &mpsc::Sender<Frame>,
    req: &Frame,
) -> Result<Outcome, Frame> {
    match req.op() {
        "join" => {
            let Some(board_id) = req.board_id.or_else(|| {
                req.data
                    .get("board_id")
                    .and_then(|v| v.as_str())
                    .and_then(|s| s.parse().ok())
            }) else {
                return Err(req.error("board_id required"));
            };

            // Part current room if already joined.
            if let Some(old_board) = current_board.take() {
                services::room::part_room(state, old_board, client_id).await;
            }

            match services::room::join_room(
                state,
                board_id,
                user.id,
                &user.name,
                &user.color,
                client_id,
                client_tx.clone(),
            )
            .await
            {
                Ok((scene, seq)) => {
                    *current_board = Some(board_id);

                    let mut reply = Data::new();
                    reply.insert(frames::FRAME_SCENE.into(), serde_json::json!(scene));
                    reply.insert(frames::FRAME_SEQ.into(), serde_json::json!(seq));

                    let mut broadcast = Data::new();
                    broadcast.insert("client_id".into(), serde_json::json!(client_id));
                    broadcast.insert("user_id".into(), serde_json::json!(user.id));
                    broadcast.insert("name".into(), serde_json::json!(user.name));
                    broadcast.insert("color".into(), serde_json::json!(user.color));

                    Ok(Outcome::ReplyAndBroadcast { reply, broadcast })
                }
                Err(e) => Err(req.error_from(&e)),
            }
        }
        "part" => {
            let Some(board_id) = current_board.take() else {
                return Ok(Outcome::Done);
            };

            let part_frame = Frame::request("room:part", Data::new())
                .with_board_id(board_id)
                .with_data("client_id", client_id.to_string())
                .with_data("user_id", user.id.to_string());
            services::room::broadcast(state, board_id, &part_frame, Some(client_id)).await;
            services::room::part_room(state, board_id, client_id).await;
            Ok(Outcome::Done)
        }
        op => Err(req.error(format!("unknown room op: {op}"))),
    }
}

// =============================================================================
// CELL HANDLERS
// =============================================================================

async fn handle_cell(state: &AppState, current_board: Option<Uuid>, req: &Frame) -> Result<Outcome, Frame> {
    let Some(board_id) = current_board else {
        return Err(req.error("must join a room first"));
    };

    match req.op() {
        "write" => {
            let Some(scene) = req.data.get(frames::FRAME_SCENE).and_then(|v| v.as_str()) else {
                return Err(req.error("scene required"));
            };

            match services::room::write_cell(state, board_id, scene.to_string()).await {
                Ok(seq) => {
                    let mut reply = Data::new();
                    reply.insert(frames::FRAME_SEQ.into(), serde_json::json!(seq));

                    let mut broadcast = Data::new();
                    broadcast.insert(frames::FRAME_SCENE.into(), serde_json::json!(scene));
                    broadcast.insert(frames::FRAME_SEQ.into(), serde_json::json!(seq));

                    Ok(Outcome::ReplyAndBroadcast { reply, broadcast })
                }
                Err(e) => Err(req.error_from(&e)),
            }
        }
        "read" => match services::room::read_cell(state, board_id).await {
            Ok((scene, seq)) => {
                let mut data = Data::new();
                data.insert(frames::FRAME_SCENE.into(), serde_json::json!(scene));
                data.insert(frames::FRAME_SEQ.into(), serde_json::json!(seq));
                Ok(Outcome::Reply(data))
            }
            Err(e) => Err(req.error_from(&e)),
        },
        op => Err(req.error(format!("unknown cell op: {op}"))),
    }
}

// =============================================================================
// PRESENCE HANDLER
// =============================================================================

async fn handle_presence(state: &AppState, current_board: Option<Uuid>, client_id: Uuid, req: &Frame) -> Outcome {
    let Some(board_id) = current_board else {
        // Silently ignore presence before joining.
        return Outcome::Done;
    };

    let cursor = req.data.get("cursor").cloned().unwrap_or(serde_json::Value::Null);

    // Fill identity from the room registry; the client may omit it.
    let identity = services::room::client_identity(state, board_id, client_id).await;
    let name = req
        .data
        .get("name")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| identity.as_ref().map(|c| c.user_name.clone()))
        .unwrap_or_else(|| "anonymous".into());
    let color = req
        .data
        .get("color")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| identity.as_ref().map(|c| c.user_color.clone()))
        .unwrap_or_else(|| "#FF6B6B".into());

    let mut data = Data::new();
    data.insert("client_id".into(), serde_json::json!(client_id));
    data.insert("cursor".into(), cursor);
    data.insert("name".into(), serde_json::json!(name));
    data.insert("color".into(), serde_json::json!(color));

    Outcome::BroadcastExcludeSender(data)
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let is_presence = frame.syscall.starts_with("presence:");
    if !is_presence {
        if frame.status == Status::Error {
            let code = frame.data.get("code").and_then(|v| v.as_str()).unwrap_or("-");
            let message = frame.data.get("message").and_then(|v| v.as_str()).unwrap_or("-");
            warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
        } else {
            info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
        }
    }

    socket
        .send(Message::Binary(encode_frame(frame).into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;

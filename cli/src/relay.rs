//! Networked implementations of the engine's remote collaborators.
//!
//! DESIGN
//! ======
//! `RelayClient` speaks binary frames over one websocket: a writer task
//! drains an outbound queue, a reader task routes inbound frames either
//! to the pending request that owns them (by `parent_id`) or onto the
//! cell-change/peer-presence broadcast channels the engine subscribes
//! to. `HttpBoardStore` covers the durable side over the REST API.

#[cfg(test)]
#[path = "relay_test.rs"]
mod relay_test;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use engine::{BoardRecord, BoardStore, PeerEvent, PresenceChannel, PresenceRecord, RemoteError, SharedCell};
use frames::{Data, Frame, Status};
use futures_util::{SinkExt, Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::warn;
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("timed out waiting for websocket frame")]
    Timeout,
    #[error("server returned error for {syscall}: {message}")]
    ServerError { syscall: String, message: String },
    #[error("missing expected field `{0}`")]
    MissingField(&'static str),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

// =============================================================================
// RELAY CLIENT
// =============================================================================

type PendingMap = Arc<Mutex<HashMap<Uuid, oneshot::Sender<Frame>>>>;

/// One websocket connection to the relay: shared cell + presence channel.
pub struct RelayClient {
    out_tx: mpsc::Sender<Frame>,
    pending: PendingMap,
    cell_changes: broadcast::Sender<String>,
    peer_events: broadcast::Sender<PeerEvent>,
    client_id: Uuid,
    board_id: Uuid,
}

impl RelayClient {
    /// Connect, wait for `session:connected`, and join the board room.
    /// Returns the client plus the room's current `(scene, seq)`.
    ///
    /// # Errors
    ///
    /// Fails on connect errors, a closed socket, or an error reply to the
    /// join request.
    pub async fn connect(ws_url: &str, board_id: Uuid) -> Result<(Self, String, i64), RelayError> {
        let (ws, _) = connect_async(ws_url)
            .await
            .map_err(|e| RelayError::WsConnect(Box::new(e)))?;
        let (mut sink, mut stream) = ws.split();

        // First frame is the welcome carrying our connection identity.
        let welcome = next_frame(&mut stream).await?;
        if welcome.syscall != "session:connected" {
            return Err(RelayError::MissingField("session:connected"));
        }
        let client_id = welcome
            .data
            .get("client_id")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .ok_or(RelayError::MissingField("client_id"))?;

        // Join before spawning the reader so the reply is ours to consume.
        let join = Frame::request("room:join", Data::new()).with_board_id(board_id);
        let join_id = join.id;
        sink.send(Message::Binary(frames::encode_frame(&join).into()))
            .await
            .map_err(|_| RelayError::WsClosed)?;

        let reply = loop {
            let frame = next_frame(&mut stream).await?;
            if frame.parent_id == Some(join_id) {
                break frame;
            }
        };
        if reply.status == Status::Error {
            return Err(server_error(&reply));
        }
        let scene = reply
            .data
            .get(frames::FRAME_SCENE)
            .and_then(|v| v.as_str())
            .ok_or(RelayError::MissingField("scene"))?
            .to_string();
        let seq = reply
            .data
            .get(frames::FRAME_SEQ)
            .and_then(serde_json::Value::as_i64)
            .unwrap_or(0);

        let (out_tx, mut out_rx) = mpsc::channel::<Frame>(CHANNEL_CAPACITY);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (cell_changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (peer_events, _) = broadcast::channel(CHANNEL_CAPACITY);

        // Writer task: drain the outbound queue.
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if sink
                    .send(Message::Binary(frames::encode_frame(&frame).into()))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });

        // Reader task: route replies and broadcasts.
        {
            let pending = Arc::clone(&pending);
            let cell_changes = cell_changes.clone();
            let peer_events = peer_events.clone();
            tokio::spawn(async move {
                while let Some(Ok(msg)) = stream.next().await {
                    let Message::Binary(bytes) = msg else { continue };
                    let Ok(frame) = frames::decode_frame(&bytes) else {
                        warn!("relay: undecodable frame dropped");
                        continue;
                    };
                    route_inbound(&pending, &cell_changes, &peer_events, frame).await;
                }
            });
        }

        let client = Self { out_tx, pending, cell_changes, peer_events, client_id, board_id };
        Ok((client, scene, seq))
    }

    /// Send a request and await its terminal reply.
    async fn request(&self, frame: Frame) -> Result<Frame, RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.lock().await.insert(frame.id, reply_tx);

        let id = frame.id;
        if self.out_tx.send(frame).await.is_err() {
            self.pending.lock().await.remove(&id);
            return Err(RelayError::WsClosed);
        }

        let reply = tokio::time::timeout(REQUEST_TIMEOUT, reply_rx).await;
        match reply {
            Ok(Ok(frame)) if frame.status == Status::Error => Err(server_error(&frame)),
            Ok(Ok(frame)) => Ok(frame),
            Ok(Err(_)) => Err(RelayError::WsClosed),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(RelayError::Timeout)
            }
        }
    }

    /// Fire-and-forget send for ephemeral traffic.
    async fn send(&self, frame: Frame) {
        if self.out_tx.send(frame).await.is_err() {
            warn!("relay: send on closed connection");
        }
    }
}

async fn route_inbound(
    pending: &PendingMap,
    cell_changes: &broadcast::Sender<String>,
    peer_events: &broadcast::Sender<PeerEvent>,
    frame: Frame,
) {
    if let Some(parent_id) = frame.parent_id {
        if let Some(tx) = pending.lock().await.remove(&parent_id) {
            let _ = tx.send(frame);
            return;
        }
    }

    match frame.syscall.as_str() {
        "cell:write" => {
            if let Some(scene) = frame.data.get(frames::FRAME_SCENE).and_then(|v| v.as_str()) {
                let _ = cell_changes.send(scene.to_string());
            }
        }
        "presence:update" => {
            if let Some(event) = presence_event(&frame) {
                let _ = peer_events.send(event);
            }
        }
        "room:part" => {
            if let Some(client_id) = frame
                .data
                .get("client_id")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse().ok())
            {
                let _ = peer_events.send(PeerEvent::Left { client_id });
            }
        }
        _ => {}
    }
}

/// Map a presence broadcast into a roster event.
fn presence_event(frame: &Frame) -> Option<PeerEvent> {
    let client_id = frame
        .data
        .get("client_id")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())?;

    let record: PresenceRecord = serde_json::from_value(serde_json::json!({
        "cursor": frame.data.get("cursor").cloned().unwrap_or(serde_json::Value::Null),
        "name": frame.data.get("name").cloned().unwrap_or_else(|| "anonymous".into()),
        "color": frame.data.get("color").cloned().unwrap_or_else(|| "#FF6B6B".into()),
    }))
    .ok()?;

    Some(PeerEvent::Update { client_id, record })
}

fn server_error(frame: &Frame) -> RelayError {
    RelayError::ServerError {
        syscall: frame.syscall.clone(),
        message: frame
            .data
            .get(frames::FRAME_MESSAGE)
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
            .to_string(),
    }
}

async fn next_frame<S>(stream: &mut S) -> Result<Frame, RelayError>
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(REQUEST_TIMEOUT, stream.next())
            .await
            .map_err(|_| RelayError::Timeout)?
            .ok_or(RelayError::WsClosed)?
            .map_err(|_| RelayError::WsClosed)?;

        if let Message::Binary(bytes) = msg {
            if let Ok(frame) = frames::decode_frame(&bytes) {
                return Ok(frame);
            }
        }
    }
}

// =============================================================================
// ENGINE TRAIT IMPLEMENTATIONS
// =============================================================================

#[async_trait]
impl SharedCell for RelayClient {
    async fn read(&self) -> Result<String, RemoteError> {
        let req = Frame::request("cell:read", Data::new()).with_board_id(self.board_id);
        let reply = self
            .request(req)
            .await
            .map_err(|e| RemoteError::Cell(e.to_string()))?;
        reply
            .data
            .get(frames::FRAME_SCENE)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| RemoteError::Cell("cell:read reply missing scene".into()))
    }

    async fn write(&self, json: String) -> Result<(), RemoteError> {
        let req = Frame::request("cell:write", Data::new())
            .with_board_id(self.board_id)
            .with_data(frames::FRAME_SCENE, json);
        self.request(req)
            .await
            .map(|_| ())
            .map_err(|e| RemoteError::Cell(e.to_string()))
    }

    fn changes(&self) -> broadcast::Receiver<String> {
        self.cell_changes.subscribe()
    }
}

#[async_trait]
impl PresenceChannel for RelayClient {
    fn client_id(&self) -> Uuid {
        self.client_id
    }

    async fn publish(&self, record: PresenceRecord) -> Result<(), RemoteError> {
        let cursor = record
            .cursor
            .map_or(serde_json::Value::Null, |c| serde_json::json!({"x": c.x, "y": c.y}));
        let req = Frame::request("presence:update", Data::new())
            .with_board_id(self.board_id)
            .with_data("cursor", cursor)
            .with_data("name", record.name)
            .with_data("color", record.color);
        self.send(req).await;
        Ok(())
    }

    fn peers(&self) -> broadcast::Receiver<PeerEvent> {
        self.peer_events.subscribe()
    }

    async fn disconnect(&self) -> Result<(), RemoteError> {
        let req = Frame::request("room:part", Data::new()).with_board_id(self.board_id);
        self.send(req).await;
        Ok(())
    }
}

// =============================================================================
// HTTP BOARD STORE
// =============================================================================

/// Durable board access over the REST API.
pub struct HttpBoardStore {
    http: reqwest::Client,
    base_url: String,
    session_cookie: String,
}

#[derive(Deserialize)]
struct BoardResponse {
    id: Uuid,
    name: String,
    owner_id: Option<Uuid>,
    created_at: i64,
    updated_at: i64,
    data: String,
}

impl HttpBoardStore {
    #[must_use]
    pub fn new(base_url: &str, session_token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session_cookie: format!("session_token={session_token}"),
        }
    }
}

#[async_trait]
impl BoardStore for HttpBoardStore {
    async fn fetch_board(&self, id: Uuid) -> Result<Option<BoardRecord>, RemoteError> {
        let response = self
            .http
            .get(format!("{}/api/board/{id}", self.base_url))
            .header(reqwest::header::COOKIE, &self.session_cookie)
            .send()
            .await
            .map_err(|e| RemoteError::Store(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(RemoteError::Store(format!("board fetch failed: {}", response.status())));
        }

        let board: BoardResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Store(e.to_string()))?;
        Ok(Some(BoardRecord {
            id: board.id,
            name: board.name,
            owner_id: board.owner_id,
            created_at: board.created_at,
            updated_at: board.updated_at,
            data: board.data,
        }))
    }

    async fn update_board_data(&self, id: Uuid, data: &str) -> Result<(), RemoteError> {
        let response = self
            .http
            .patch(format!("{}/api/board/{id}", self.base_url))
            .header(reqwest::header::COOKIE, &self.session_cookie)
            .json(&serde_json::json!({ "data": data }))
            .send()
            .await
            .map_err(|e| RemoteError::Store(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RemoteError::Store(format!("board update failed: {}", response.status())));
        }
        Ok(())
    }
}

// =============================================================================
// URL HELPERS
// =============================================================================

/// Derive the websocket endpoint from an HTTP base URL and a ticket.
#[must_use]
pub fn ws_url(base_url: &str, ticket: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        format!("ws://{base}")
    };
    format!("{ws_base}/api/ws?ticket={ticket}")
}

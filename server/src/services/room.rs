//! Room service — the server side of the shared storage cell.
//!
//! DESIGN
//! ======
//! A room exists in memory while any client is connected. Its cell value
//! is one JSON string mutated by `write_cell` with last-writer-wins
//! semantics: writers always replace the whole document, the sequence
//! number only observes change, it never orders writers. Rooms start
//! unseeded (`"{}"`) so the first joining client runs its durable-record
//! fallback and seeds the cell itself.
//!
//! ERROR HANDLING
//! ==============
//! On last-client part, a dirty cell is flushed before eviction. If that
//! flush fails, the room is kept in memory with its dirty flag intact so
//! the persistence worker can retry instead of losing edits.

use frames::Frame;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::services::board::{self, BoardError};
use crate::state::{AppState, ConnectedClient, RoomState};

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room not loaded: {0}")]
    NotLoaded(Uuid),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl frames::ErrorCode for RoomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotLoaded(_) => "E_ROOM_NOT_LOADED",
            Self::Board(e) => e.error_code(),
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_)) || matches!(self, Self::Board(BoardError::Database(_)))
    }
}

// =============================================================================
// JOIN / PART
// =============================================================================

/// Join a room, creating it if this is the first client. Returns the
/// current cell content and sequence.
///
/// # Errors
///
/// Propagates access failures (`E_BOARD_NOT_FOUND`, `E_FORBIDDEN`) and
/// database errors.
pub async fn join_room(
    state: &AppState,
    board_id: Uuid,
    user_id: Uuid,
    user_name: &str,
    user_color: &str,
    client_id: Uuid,
    tx: mpsc::Sender<Frame>,
) -> Result<(String, i64), RoomError> {
    board::ensure_board_access(&state.pool, board_id, user_id).await?;

    let mut rooms = state.rooms.write().await;
    let room = rooms.entry(board_id).or_insert_with(RoomState::new);

    room.clients.insert(client_id, tx);
    room.users.insert(
        client_id,
        ConnectedClient {
            user_id,
            user_name: user_name.to_owned(),
            user_color: user_color.to_owned(),
        },
    );

    info!(%board_id, %client_id, clients = room.clients.len(), "client joined room");
    Ok((room.scene_json.clone(), room.seq))
}

/// Leave a room. If this was the last client, flush a dirty cell and
/// evict the room from memory.
pub async fn part_room(state: &AppState, board_id: Uuid, client_id: Uuid) {
    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(&board_id) else {
        return;
    };

    room.clients.remove(&client_id);
    room.users.remove(&client_id);
    info!(%board_id, %client_id, remaining = room.clients.len(), "client left room");

    if !room.clients.is_empty() {
        return;
    }

    if !room.dirty {
        rooms.remove(&board_id);
        info!(%board_id, "evicted room from memory");
        return;
    }

    // Snapshot under the lock, flush outside it, ack only on success.
    let scene_json = room.scene_json.clone();
    let flushed_seq = room.seq;
    drop(rooms);

    let flush_result = board::flush_board_data(&state.pool, board_id, &scene_json).await;

    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(&board_id) else {
        return;
    };
    if !room.clients.is_empty() {
        // Someone rejoined while we were flushing; leave the room alone.
        return;
    }

    match flush_result {
        Ok(()) => {
            if room.seq == flushed_seq {
                rooms.remove(&board_id);
                info!(%board_id, "evicted room from memory");
            } else {
                tracing::warn!(%board_id, "retaining room after final flush: newer writes exist");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, %board_id, "final flush failed; room retained for retry");
        }
    }
}

// =============================================================================
// CELL
// =============================================================================

/// Overwrite the cell with a full serialization. Returns the new sequence.
///
/// # Errors
///
/// Returns `NotLoaded` when no room is live for the board.
pub async fn write_cell(state: &AppState, board_id: Uuid, scene_json: String) -> Result<i64, RoomError> {
    let mut rooms = state.rooms.write().await;
    let room = rooms
        .get_mut(&board_id)
        .ok_or(RoomError::NotLoaded(board_id))?;

    room.scene_json = scene_json;
    room.seq += 1;
    room.dirty = true;
    Ok(room.seq)
}

/// Read the current cell content and sequence.
///
/// # Errors
///
/// Returns `NotLoaded` when no room is live for the board.
pub async fn read_cell(state: &AppState, board_id: Uuid) -> Result<(String, i64), RoomError> {
    let rooms = state.rooms.read().await;
    let room = rooms.get(&board_id).ok_or(RoomError::NotLoaded(board_id))?;
    Ok((room.scene_json.clone(), room.seq))
}

/// Presence identity of a connected client, if known.
pub async fn client_identity(state: &AppState, board_id: Uuid, client_id: Uuid) -> Option<ConnectedClient> {
    let rooms = state.rooms.read().await;
    rooms.get(&board_id)?.users.get(&client_id).cloned()
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Broadcast a frame to all clients in a room, optionally excluding one.
pub async fn broadcast(state: &AppState, board_id: Uuid, frame: &Frame, exclude: Option<Uuid>) {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(&board_id) else {
        return;
    };

    for (client_id, tx) in &room.clients {
        if exclude == Some(*client_id) {
            continue;
        }
        // Best-effort: if a client's channel is full, skip it.
        let _ = tx.try_send(frame.clone());
    }
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;

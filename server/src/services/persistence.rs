//! Persistence service — background flush for dirty room cells.
//!
//! DESIGN
//! ======
//! A background task snapshots every dirty room's cell under the lock,
//! performs the Postgres writes lock-free, then clears each dirty flag
//! only if the cell has not moved since the snapshot. Repeated flushes
//! of the same content are acceptable; silent data loss is not.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::services::board;
use crate::state::AppState;

const DEFAULT_SCENE_FLUSH_INTERVAL_MS: u64 = 1000;

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Spawn the background persistence task. Returns a handle for shutdown.
pub fn spawn_persistence_task(state: AppState) -> JoinHandle<()> {
    let flush_interval_ms = env_parse("SCENE_FLUSH_INTERVAL_MS", DEFAULT_SCENE_FLUSH_INTERVAL_MS);
    info!(flush_interval_ms, "scene persistence flush configured");
    tokio::spawn(async move {
        loop {
            flush_all_dirty(&state).await;
            tokio::time::sleep(Duration::from_millis(flush_interval_ms)).await;
        }
    })
}

#[derive(Debug)]
struct DirtyFlushBatch {
    board_id: Uuid,
    scene_json: String,
    flushed_seq: i64,
}

async fn flush_all_dirty(state: &AppState) {
    // Snapshot dirty cells under the lock; write lock-free.
    let batches = {
        let rooms = state.rooms.read().await;
        rooms
            .iter()
            .filter(|(_, room)| room.dirty)
            .map(|(board_id, room)| DirtyFlushBatch {
                board_id: *board_id,
                scene_json: room.scene_json.clone(),
                flushed_seq: room.seq,
            })
            .collect::<Vec<_>>()
    };

    for batch in batches {
        match board::flush_board_data(&state.pool, batch.board_id, &batch.scene_json).await {
            Ok(()) => {
                ack_flushed(state, batch.board_id, batch.flushed_seq).await;
            }
            Err(e) => {
                error!(error = %e, board_id = %batch.board_id, "persistence flush failed");
            }
        }
    }
}

/// Clear the dirty flag unless the cell moved after the snapshot.
async fn ack_flushed(state: &AppState, board_id: Uuid, flushed_seq: i64) {
    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(&board_id) else {
        return;
    };
    if room.seq == flushed_seq {
        room.dirty = false;
    }
}

#[cfg(test)]
pub(crate) async fn flush_all_dirty_for_tests(state: &AppState) {
    flush_all_dirty(state).await;
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;

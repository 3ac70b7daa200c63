//! In-process implementations of the remote collaborators.
//!
//! These back tests and single-user sessions: a shared cell that fans
//! change notifications out over a broadcast channel, a board store over
//! a locked map, and a presence hub that connections attach to. The cell
//! echoes a writer's own update back to it, matching the hosted relay's
//! behavior, so the sync bridge's echo suppression is exercised even in
//! memory.

#[cfg(test)]
#[path = "memory_test.rs"]
mod memory_test;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};
use uuid::Uuid;

use crate::presence::{PeerEvent, PresenceRecord};
use crate::remote::{BoardRecord, BoardStore, PresenceChannel, RemoteError, SharedCell};

const CHANNEL_CAPACITY: usize = 256;

fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// SHARED CELL
// =============================================================================

/// One board room's shared storage cell, held in process memory.
pub struct InMemoryCell {
    value: Mutex<String>,
    changes: broadcast::Sender<String>,
}

impl InMemoryCell {
    /// Fresh cell holding the placeholder document.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { value: Mutex::new("{}".to_string()), changes }
    }

    /// Cell pre-seeded with content, for bootstrap tests.
    #[must_use]
    pub fn with_content(json: impl Into<String>) -> Self {
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { value: Mutex::new(json.into()), changes }
    }
}

impl Default for InMemoryCell {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SharedCell for InMemoryCell {
    async fn read(&self) -> Result<String, RemoteError> {
        Ok(self.value.lock().await.clone())
    }

    async fn write(&self, json: String) -> Result<(), RemoteError> {
        *self.value.lock().await = json.clone();
        // No receivers is fine: a lone session still writes.
        let _ = self.changes.send(json);
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }
}

// =============================================================================
// BOARD STORE
// =============================================================================

/// Durable board records in a locked map.
pub struct InMemoryBoardStore {
    boards: Mutex<HashMap<Uuid, BoardRecord>>,
}

impl InMemoryBoardStore {
    #[must_use]
    pub fn new() -> Self {
        Self { boards: Mutex::new(HashMap::new()) }
    }

    /// Create a board record and return its id.
    pub async fn create_board(&self, name: &str, data: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = now_ms();
        let record = BoardRecord {
            id,
            name: name.to_string(),
            owner_id: None,
            created_at: now,
            updated_at: now,
            data: data.to_string(),
        };
        self.boards.lock().await.insert(id, record);
        id
    }
}

impl Default for InMemoryBoardStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BoardStore for InMemoryBoardStore {
    async fn fetch_board(&self, id: Uuid) -> Result<Option<BoardRecord>, RemoteError> {
        Ok(self.boards.lock().await.get(&id).cloned())
    }

    async fn update_board_data(&self, id: Uuid, data: &str) -> Result<(), RemoteError> {
        let mut boards = self.boards.lock().await;
        let record = boards
            .get_mut(&id)
            .ok_or_else(|| RemoteError::Store(format!("board not found: {id}")))?;
        record.data = data.to_string();
        record.updated_at = now_ms();
        Ok(())
    }
}

// =============================================================================
// PRESENCE
// =============================================================================

/// Presence fan-out hub for one board room. Each session connects with
/// its own client id and gets a channel bound to that identity.
pub struct InMemoryPresenceHub {
    events: broadcast::Sender<PeerEvent>,
}

impl InMemoryPresenceHub {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { events }
    }

    /// Attach a connection to the hub.
    #[must_use]
    pub fn connect(self: &Arc<Self>, client_id: Uuid) -> InMemoryPresence {
        InMemoryPresence { client_id, hub: Arc::clone(self) }
    }
}

impl Default for InMemoryPresenceHub {
    fn default() -> Self {
        Self::new()
    }
}

/// One connection's handle on the presence hub.
pub struct InMemoryPresence {
    client_id: Uuid,
    hub: Arc<InMemoryPresenceHub>,
}

#[async_trait]
impl PresenceChannel for InMemoryPresence {
    fn client_id(&self) -> Uuid {
        self.client_id
    }

    async fn publish(&self, record: PresenceRecord) -> Result<(), RemoteError> {
        let _ = self
            .hub
            .events
            .send(PeerEvent::Update { client_id: self.client_id, record });
        Ok(())
    }

    fn peers(&self) -> broadcast::Receiver<PeerEvent> {
        self.hub.events.subscribe()
    }

    async fn disconnect(&self) -> Result<(), RemoteError> {
        let _ = self.hub.events.send(PeerEvent::Left { client_id: self.client_id });
        Ok(())
    }
}

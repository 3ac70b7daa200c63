//! External collaborators of a board session.
//!
//! DESIGN
//! ======
//! The engine never talks to a concrete backend. The shared storage cell,
//! the durable board store, and the presence channel are injected trait
//! objects constructed at session start and dropped at teardown — no
//! module-level client singletons. [`crate::memory`] provides in-process
//! implementations; the relay client provides networked ones.

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::presence::{PeerEvent, PresenceRecord};

/// Failure from a remote collaborator. Nothing here is fatal to the
/// session: callers log and degrade to "local state unchanged".
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    #[error("shared cell error: {0}")]
    Cell(String),
    #[error("board store error: {0}")]
    Store(String),
    #[error("presence channel error: {0}")]
    Presence(String),
}

/// Durable board record owned by the board directory.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BoardRecord {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Option<Uuid>,
    /// Milliseconds since Unix epoch.
    pub created_at: i64,
    /// Milliseconds since Unix epoch.
    pub updated_at: i64,
    /// Serialized scene JSON.
    pub data: String,
}

/// The shared storage cell: one JSON string per board room, owned jointly
/// by all connected sessions, last-writer-wins. The only ordering
/// guarantee is that every write is eventually observed.
#[async_trait]
pub trait SharedCell: Send + Sync {
    /// Current cell content. A fresh room holds a placeholder document.
    async fn read(&self) -> Result<String, RemoteError>;

    /// Overwrite the cell with the full local serialization. Never
    /// read-modify-write.
    async fn write(&self, json: String) -> Result<(), RemoteError>;

    /// Change notifications carrying the new cell content. Includes the
    /// echo of this session's own writes; the sync bridge filters those
    /// by comparing against its last known serialization.
    fn changes(&self) -> broadcast::Receiver<String>;
}

/// Durable per-board persistence, read once at bootstrap and written by
/// auto-save and teardown.
#[async_trait]
pub trait BoardStore: Send + Sync {
    async fn fetch_board(&self, id: Uuid) -> Result<Option<BoardRecord>, RemoteError>;

    async fn update_board_data(&self, id: Uuid, data: &str) -> Result<(), RemoteError>;
}

/// Ephemeral presence fan-out for one connection.
#[async_trait]
pub trait PresenceChannel: Send + Sync {
    /// Connection identity assigned by the transport. Peer events carry
    /// this id; the session uses it to ignore its own echoes.
    fn client_id(&self) -> Uuid;

    /// Publish this session's presence to peers.
    async fn publish(&self, record: PresenceRecord) -> Result<(), RemoteError>;

    /// Peer presence updates and departures, keyed by connection identity.
    fn peers(&self) -> broadcast::Receiver<PeerEvent>;

    /// Announce departure. Called once at session teardown.
    async fn disconnect(&self) -> Result<(), RemoteError> {
        Ok(())
    }
}

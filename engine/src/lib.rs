//! Board session engine: local edits, remote sync, and undo history.
//!
//! ARCHITECTURE
//! ============
//! A [`session::BoardSession`] owns one board's editing state for one
//! participant. It composes:
//!
//! - [`adapter::SceneHost`] — the scene model adapter: in-memory scene,
//!   explicit init gate, mutation events, render notifications.
//! - [`history::History`] — bounded linear undo/redo over full-scene
//!   snapshots, local to the session.
//! - the remote sync bridge (in [`session`]) — keeps the scene and the
//!   shared storage cell eventually consistent without echo loops,
//!   last-writer-wins at whole-document granularity.
//! - [`presence::Roster`] — peer cursors keyed by connection.
//!
//! External collaborators (the shared cell, the durable board store, the
//! presence channel) are injected trait objects with explicit lifecycle:
//! constructed at session start, dropped at teardown. In-memory
//! implementations live in [`memory`] for tests and single-user use.

pub mod adapter;
pub mod history;
pub mod memory;
pub mod mode;
pub mod presence;
pub mod remote;
pub mod session;

pub use adapter::{SceneEvent, SceneHost};
pub use history::{HISTORY_LIMIT, History};
pub use mode::{Mode, ModeError};
pub use presence::{Cursor, PeerEvent, PresenceRecord, Roster};
pub use remote::{BoardRecord, BoardStore, PresenceChannel, RemoteError, SharedCell};
pub use session::{BoardSession, SessionOptions};

/// Error type for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The scene host has not completed its initialization phase.
    #[error("scene host not initialized")]
    NotReady,
    /// The session is mid-transition (applying a remote update or
    /// restoring history) and cannot start another.
    #[error(transparent)]
    Busy(#[from] ModeError),
    /// A remote collaborator (cell, store, presence) failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

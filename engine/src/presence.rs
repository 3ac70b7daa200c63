//! Presence: cursor broadcasting and the peer roster.
//!
//! Presence is ephemeral per-connection state — never persisted, gone on
//! disconnect. Each session picks a random color from a fixed palette at
//! connect time; there is no server-side negotiation, and collisions are
//! accepted.

#[cfg(test)]
#[path = "presence_test.rs"]
mod presence_test;

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cursor color palette shared by all clients.
pub const CURSOR_COLORS: [&str; 7] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7", "#DDA0DD", "#98D8C8",
];

/// Pick a random presence color for a new session.
#[must_use]
pub fn random_color() -> String {
    let idx = rand::rng().random_range(0..CURSOR_COLORS.len());
    CURSOR_COLORS[idx].to_string()
}

/// Pointer position over the canvas surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub x: f64,
    pub y: f64,
}

/// One participant's published presence. `cursor` is `None` when the
/// pointer has left the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub cursor: Option<Cursor>,
    pub name: String,
    pub color: String,
}

impl PresenceRecord {
    #[must_use]
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self { cursor: None, name: name.into(), color: color.into() }
    }

    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.cursor = Some(Cursor { x, y });
        self
    }
}

/// Presence traffic on the peer channel.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    Update { client_id: Uuid, record: PresenceRecord },
    Left { client_id: Uuid },
}

/// Peer presence keyed by connection identity.
///
/// Entries with a null cursor stay in the roster (the participant is
/// still connected) but are excluded from [`Roster::visible_cursors`].
#[derive(Debug, Default)]
pub struct Roster {
    peers: HashMap<Uuid, PresenceRecord>,
}

impl Roster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one peer event.
    pub fn apply(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::Update { client_id, record } => {
                self.peers.insert(client_id, record);
            }
            PeerEvent::Left { client_id } => {
                self.peers.remove(&client_id);
            }
        }
    }

    /// Connected peer count, whether or not their cursor is visible.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Peers with a live cursor to render, sorted by connection id for a
    /// stable draw order.
    #[must_use]
    pub fn visible_cursors(&self) -> Vec<(Uuid, &PresenceRecord)> {
        let mut cursors: Vec<(Uuid, &PresenceRecord)> = self
            .peers
            .iter()
            .filter(|(_, record)| record.cursor.is_some())
            .map(|(id, record)| (*id, record))
            .collect();
        cursors.sort_by_key(|(id, _)| *id);
        cursors
    }
}

//! Bounded linear undo/redo over full-scene snapshots.
//!
//! DESIGN
//! ======
//! Each entry is a complete serialized scene, not a diff. `commit` stores
//! the snapshot taken immediately before a mutation, so N undos walk back
//! through N mutations to the bootstrap state. The past stack is capped
//! at the 20 most recent entries with FIFO eviction; any new commit
//! invalidates the redo stack.
//!
//! The stack is local to one session and dies with it.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use std::collections::VecDeque;

/// Maximum retained past snapshots.
pub const HISTORY_LIMIT: usize = 20;

/// Undo/redo stacks of serialized scene snapshots.
#[derive(Debug, Default)]
pub struct History {
    past: VecDeque<String>,
    future: VecDeque<String>,
}

impl History {
    /// Create empty stacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the pre-mutation snapshot. Evicts the oldest entry past the
    /// cap and clears the redo stack.
    pub fn commit(&mut self, snapshot: String) {
        self.past.push_back(snapshot);
        while self.past.len() > HISTORY_LIMIT {
            self.past.pop_front();
        }
        self.future.clear();
    }

    /// Step back: returns the snapshot to restore, recording `current` for
    /// redo. `None` when there is nothing to undo.
    pub fn undo(&mut self, current: String) -> Option<String> {
        let previous = self.past.pop_back()?;
        self.future.push_front(current);
        Some(previous)
    }

    /// Step forward: returns the snapshot to restore, recording `current`
    /// for undo. `None` when there is nothing to redo.
    pub fn redo(&mut self, current: String) -> Option<String> {
        let next = self.future.pop_front()?;
        self.past.push_back(current);
        Some(next)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Number of past snapshots currently retained.
    #[must_use]
    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    /// Number of redo snapshots currently retained.
    #[must_use]
    pub fn future_len(&self) -> usize {
        self.future.len()
    }
}

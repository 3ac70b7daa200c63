//! Scene model adapter: the in-memory scene behind an explicit init gate.
//!
//! DESIGN
//! ======
//! `SceneHost` wraps the scene document the way the board view wraps its
//! rendering library: nothing works until the asynchronous initialization
//! phase completes, loading a malformed document is logged and skipped
//! rather than crashing the session, and every successful load or
//! mutation bumps a render counter (the stand-in for the visual surface
//! repaint) and emits a payload-free "scene changed" event.

#[cfg(test)]
#[path = "adapter_test.rs"]
mod adapter_test;

use scene::{SceneDocument, SceneObject};
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::warn;

use crate::EngineError;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Payload-free mutation notification. Observers get no guarantee beyond
/// "the scene changed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    Added,
    Modified,
    Removed,
    Loaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadyState {
    NotReady,
    Ready,
}

/// The scene model adapter.
pub struct SceneHost {
    state: ReadyState,
    doc: SceneDocument,
    events: broadcast::Sender<SceneEvent>,
    renders: u64,
}

impl SceneHost {
    /// Create a host in the `NotReady` state. Mutations and loads are
    /// rejected until [`SceneHost::init`] runs.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { state: ReadyState::NotReady, doc: SceneDocument::new(), events, renders: 0 }
    }

    /// Complete the initialization phase and start accepting operations.
    pub fn init(&mut self) {
        self.state = ReadyState::Ready;
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == ReadyState::Ready
    }

    fn ensure_ready(&self) -> Result<(), EngineError> {
        match self.state {
            ReadyState::Ready => Ok(()),
            ReadyState::NotReady => Err(EngineError::NotReady),
        }
    }

    /// Subscribe to mutation events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SceneEvent> {
        self.events.subscribe()
    }

    /// Number of visual-surface repaints triggered so far.
    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.renders
    }

    /// Current document, read-only.
    #[must_use]
    pub fn document(&self) -> &SceneDocument {
        &self.doc
    }

    /// Serialize the current scene to JSON.
    #[must_use]
    pub fn serialize_scene(&self) -> String {
        self.doc.to_json()
    }

    /// Replace the scene from a JSON document.
    ///
    /// Placeholder documents (`"{}"`, empty) are a no-op; malformed JSON
    /// is logged and skipped, leaving the scene unchanged. Returns whether
    /// the document was actually replaced.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotReady`] before initialization.
    pub fn load_scene(&mut self, json: &str) -> Result<bool, EngineError> {
        self.ensure_ready()?;

        if SceneDocument::is_placeholder(json) {
            return Ok(false);
        }

        match SceneDocument::from_json(json) {
            Ok(doc) => {
                self.doc = doc;
                self.render();
                let _ = self.events.send(SceneEvent::Loaded);
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "scene load skipped: malformed document");
                Ok(false)
            }
        }
    }

    /// Append an object to the scene.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotReady`] before initialization.
    pub fn add_object(&mut self, obj: SceneObject) -> Result<(), EngineError> {
        self.ensure_ready()?;
        self.doc.objects.push(obj);
        self.render();
        let _ = self.events.send(SceneEvent::Added);
        Ok(())
    }

    /// Merge attribute updates into the object at `index`. Keys with null
    /// values are removed. Returns `false` when the index is out of range.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotReady`] before initialization.
    pub fn update_object(&mut self, index: usize, patch: &Map<String, Value>) -> Result<bool, EngineError> {
        self.ensure_ready()?;
        let Some(obj) = self.doc.objects.get_mut(index) else {
            return Ok(false);
        };

        for (k, v) in patch {
            if v.is_null() {
                obj.attrs.remove(k);
            } else {
                obj.attrs.insert(k.clone(), v.clone());
            }
        }

        self.render();
        let _ = self.events.send(SceneEvent::Modified);
        Ok(true)
    }

    /// Remove the object at `index`. Returns `false` when out of range.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotReady`] before initialization.
    pub fn remove_object(&mut self, index: usize) -> Result<bool, EngineError> {
        self.ensure_ready()?;
        if index >= self.doc.objects.len() {
            return Ok(false);
        }

        self.doc.objects.remove(index);
        self.render();
        let _ = self.events.send(SceneEvent::Removed);
        Ok(true)
    }

    fn render(&mut self) {
        self.renders += 1;
    }
}

impl Default for SceneHost {
    fn default() -> Self {
        Self::new()
    }
}

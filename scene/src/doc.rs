//! The scene document: ordered objects plus a format version.
//!
//! DESIGN
//! ======
//! The live in-memory scene and its last-serialized JSON must always be
//! re-derivable from one another. `SceneObject` keeps unknown fields in a
//! flattened map, so `from_json` followed by `to_json` loses nothing the
//! renderer put on the wire.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use serde::{Deserialize, Serialize};

use crate::object::SceneObject;

/// Scene document format version written by this model.
pub const SCENE_VERSION: &str = "1.0";

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("malformed scene document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A complete scene: the ordered objects on one board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    SCENE_VERSION.to_string()
}

impl SceneDocument {
    /// Create an empty scene at the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self { objects: Vec::new(), version: default_version() }
    }

    /// Parse a scene from its JSON serialization.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Parse`] when the JSON is malformed. Callers
    /// that must not crash the session on bad input (remote applies,
    /// bootstrap) log and skip instead of propagating.
    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the scene to its canonical JSON form.
    #[must_use]
    pub fn to_json(&self) -> String {
        // Struct serialization cannot fail: every value is already JSON.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Placeholder documents (`"{}"`, empty, whitespace) are the initial
    /// value of a fresh shared storage cell; loading one is a no-op.
    #[must_use]
    pub fn is_placeholder(json: &str) -> bool {
        let trimmed = json.trim();
        trimmed.is_empty() || trimmed == "{}"
    }

    /// Number of objects in the scene.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` when the scene holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for SceneDocument {
    fn default() -> Self {
        Self::new()
    }
}

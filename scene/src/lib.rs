//! Scene document model for sketchboard.
//!
//! A scene is the complete set of drawable objects on one board at a point
//! in time. It serializes losslessly to and from a JSON document
//! `{"objects": [...], "version": "1.0"}`; object entries carry a `type`
//! discriminator and renderer-specific geometry/style fields that this
//! crate round-trips without interpreting.

pub mod doc;
pub mod export;
pub mod object;

pub use doc::{SCENE_VERSION, SceneDocument, SceneError};
pub use object::{Attrs, ObjectKind, SceneObject};

//! Scene objects: the `type` discriminator and the opaque attribute bag.
//!
//! Objects come off the wire with renderer-specific fields (`left`, `top`,
//! `strokeWidth`, path command arrays, image sources). Everything except
//! the `type` discriminator is kept in a flattened JSON map so fields this
//! model does not understand survive a deserialize/serialize round trip.

#[cfg(test)]
#[path = "object_test.rs"]
mod object_test;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The kind of a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Axis-aligned rectangle.
    Rect,
    /// Circle positioned by its bounding box and `radius`.
    Circle,
    /// Straight line segment between `(x1, y1)` and `(x2, y2)`.
    Line,
    /// Editable text block.
    Text,
    /// Free-hand path of pen commands.
    Path,
    /// Embedded raster image referenced by `src`.
    Image,
    /// Sticky note: a grouped composite of a filled rect and a label.
    Sticky,
    /// Chart widget flattened onto the canvas.
    Chart,
}

/// One drawable object in a scene.
///
/// All geometry/style fields live in `attrs` and are treated as opaque
/// beyond round-trip fidelity; [`Attrs`] offers typed reads for the
/// handful of fields the SVG flattener needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    #[serde(flatten)]
    pub attrs: Map<String, Value>,
}

impl SceneObject {
    /// Create an object of the given kind with an empty attribute bag.
    #[must_use]
    pub fn new(kind: ObjectKind) -> Self {
        Self { kind, attrs: Map::new() }
    }

    /// Builder-style attribute insertion.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Typed view over the attribute bag.
    #[must_use]
    pub fn attrs(&self) -> Attrs<'_> {
        Attrs::new(&self.attrs)
    }
}

/// Typed access to common attribute fields of a [`SceneObject`].
pub struct Attrs<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Attrs<'a> {
    /// Wrap a reference to an attribute map for typed access.
    #[must_use]
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Self { map }
    }

    fn f64_or(&self, key: &str, default: f64) -> f64 {
        self.map.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    fn str_or(&self, key: &'a str, default: &'a str) -> &'a str {
        self.map.get(key).and_then(|v| v.as_str()).unwrap_or(default)
    }

    /// Left edge of the bounding box. Defaults to `0.0`.
    #[must_use]
    pub fn left(&self) -> f64 {
        self.f64_or("left", 0.0)
    }

    /// Top edge of the bounding box. Defaults to `0.0`.
    #[must_use]
    pub fn top(&self) -> f64 {
        self.f64_or("top", 0.0)
    }

    /// Width of the bounding box. Defaults to `0.0`.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.f64_or("width", 0.0)
    }

    /// Height of the bounding box. Defaults to `0.0`.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.f64_or("height", 0.0)
    }

    /// Circle radius. Defaults to `0.0`.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.f64_or("radius", 0.0)
    }

    /// Line endpoints `(x1, y1, x2, y2)` relative to the object origin.
    #[must_use]
    pub fn line_points(&self) -> (f64, f64, f64, f64) {
        (
            self.f64_or("x1", 0.0),
            self.f64_or("y1", 0.0),
            self.f64_or("x2", 0.0),
            self.f64_or("y2", 0.0),
        )
    }

    /// Fill color as a CSS color string. Defaults to `"transparent"`.
    #[must_use]
    pub fn fill(&self) -> &str {
        self.str_or("fill", "transparent")
    }

    /// Stroke color as a CSS color string. Defaults to `"#000000"`.
    #[must_use]
    pub fn stroke(&self) -> &str {
        self.str_or("stroke", "#000000")
    }

    /// Stroke width. Defaults to `1.0`.
    #[must_use]
    pub fn stroke_width(&self) -> f64 {
        self.f64_or("strokeWidth", 1.0)
    }

    /// Text content. Empty string when absent.
    #[must_use]
    pub fn text(&self) -> &str {
        self.str_or("text", "")
    }

    /// Font size. Defaults to `20.0`.
    #[must_use]
    pub fn font_size(&self) -> f64 {
        self.f64_or("fontSize", 20.0)
    }

    /// Image source URL or data URI. Empty string when absent.
    #[must_use]
    pub fn src(&self) -> &str {
        self.str_or("src", "")
    }

    /// Free-hand path as an SVG path-data string.
    ///
    /// The renderer stores paths either as a ready string or as an array
    /// of command arrays (`[["M", 10, 20], ["L", 30, 40]]`); both forms
    /// are flattened to path-data syntax.
    #[must_use]
    pub fn path_data(&self) -> String {
        match self.map.get("path") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(commands)) => {
                let mut out = String::new();
                for command in commands {
                    let Some(parts) = command.as_array() else {
                        continue;
                    };
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    for (i, part) in parts.iter().enumerate() {
                        if i > 0 {
                            out.push(' ');
                        }
                        match part {
                            Value::String(s) => out.push_str(s),
                            Value::Number(n) => out.push_str(&n.to_string()),
                            _ => {}
                        }
                    }
                }
                out
            }
            _ => String::new(),
        }
    }
}

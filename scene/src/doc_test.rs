use super::*;
use crate::object::{ObjectKind, SceneObject};
use serde_json::json;

fn sample_scene() -> SceneDocument {
    let mut doc = SceneDocument::new();
    doc.objects.push(
        SceneObject::new(ObjectKind::Rect)
            .with_attr("left", 10.0)
            .with_attr("top", 20.0)
            .with_attr("width", 100.0)
            .with_attr("height", 80.0)
            .with_attr("stroke", "#000000"),
    );
    doc.objects.push(
        SceneObject::new(ObjectKind::Text)
            .with_attr("left", 50.0)
            .with_attr("top", 60.0)
            .with_attr("text", "hello"),
    );
    doc
}

#[test]
fn new_scene_is_empty_at_current_version() {
    let doc = SceneDocument::new();
    assert!(doc.is_empty());
    assert_eq!(doc.object_count(), 0);
    assert_eq!(doc.version, SCENE_VERSION);
}

#[test]
fn json_round_trip_is_lossless() {
    let doc = sample_scene();
    let json = doc.to_json();
    let restored = SceneDocument::from_json(&json).unwrap();
    assert_eq!(restored, doc);
    assert_eq!(restored.to_json(), json);
}

#[test]
fn round_trip_keeps_unknown_object_fields() {
    let raw = json!({
        "objects": [
            {"type": "path", "left": 0.0, "path": [["M", 0, 0]], "opacity": 0.5, "customTag": "x"}
        ],
        "version": "1.0"
    })
    .to_string();

    let doc = SceneDocument::from_json(&raw).unwrap();
    let back: serde_json::Value = serde_json::from_str(&doc.to_json()).unwrap();
    let original: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(back, original);
}

#[test]
fn from_json_rejects_malformed() {
    assert!(matches!(SceneDocument::from_json("not json"), Err(SceneError::Parse(_))));
    assert!(matches!(SceneDocument::from_json("[1, 2"), Err(SceneError::Parse(_))));
}

#[test]
fn from_json_tolerates_missing_fields() {
    let doc = SceneDocument::from_json("{}").unwrap();
    assert!(doc.is_empty());
    assert_eq!(doc.version, SCENE_VERSION);

    let doc = SceneDocument::from_json(r#"{"objects": []}"#).unwrap();
    assert!(doc.is_empty());
}

#[test]
fn placeholder_detection() {
    assert!(SceneDocument::is_placeholder("{}"));
    assert!(SceneDocument::is_placeholder(""));
    assert!(SceneDocument::is_placeholder("   \n{} "));
    assert!(!SceneDocument::is_placeholder(r#"{"objects":[],"version":"1.0"}"#));
}

use super::*;
use serde_json::json;

#[test]
fn kind_serializes_lowercase() {
    let obj = SceneObject::new(ObjectKind::Sticky);
    let value = serde_json::to_value(&obj).unwrap();
    assert_eq!(value.get("type").and_then(|v| v.as_str()), Some("sticky"));
}

#[test]
fn unknown_fields_survive_round_trip() {
    let raw = json!({
        "type": "rect",
        "left": 10.0,
        "top": 20.0,
        "width": 100.0,
        "height": 80.0,
        "rx": 8,
        "shadow": {"color": "rgba(0,0,0,0.1)", "blur": 10},
        "someFutureField": [1, 2, 3]
    });

    let obj: SceneObject = serde_json::from_value(raw.clone()).unwrap();
    assert_eq!(obj.kind, ObjectKind::Rect);

    let back = serde_json::to_value(&obj).unwrap();
    assert_eq!(back, raw);
}

#[test]
fn attrs_defaults() {
    let obj = SceneObject::new(ObjectKind::Rect);
    let a = obj.attrs();
    assert!(a.left().abs() < f64::EPSILON);
    assert_eq!(a.fill(), "transparent");
    assert_eq!(a.stroke(), "#000000");
    assert!((a.stroke_width() - 1.0).abs() < f64::EPSILON);
    assert_eq!(a.text(), "");
}

#[test]
fn attrs_typed_reads() {
    let obj = SceneObject::new(ObjectKind::Circle)
        .with_attr("left", 5.0)
        .with_attr("top", 6.0)
        .with_attr("radius", 50.0)
        .with_attr("fill", "#ff0000")
        .with_attr("strokeWidth", 2.5);

    let a = obj.attrs();
    assert!((a.left() - 5.0).abs() < f64::EPSILON);
    assert!((a.radius() - 50.0).abs() < f64::EPSILON);
    assert_eq!(a.fill(), "#ff0000");
    assert!((a.stroke_width() - 2.5).abs() < f64::EPSILON);
}

#[test]
fn line_points_read() {
    let obj = SceneObject::new(ObjectKind::Line)
        .with_attr("x1", 0.0)
        .with_attr("y1", 1.0)
        .with_attr("x2", 100.0)
        .with_attr("y2", 1.0);
    assert_eq!(obj.attrs().line_points(), (0.0, 1.0, 100.0, 1.0));
}

#[test]
fn path_data_from_string() {
    let obj = SceneObject::new(ObjectKind::Path).with_attr("path", "M 0 0 L 10 10");
    assert_eq!(obj.attrs().path_data(), "M 0 0 L 10 10");
}

#[test]
fn path_data_from_command_arrays() {
    let obj = SceneObject::new(ObjectKind::Path)
        .with_attr("path", json!([["M", 0, 0], ["Q", 5, 5, 10, 10], ["L", 20, 20]]));
    assert_eq!(obj.attrs().path_data(), "M 0 0 Q 5 5 10 10 L 20 20");
}

#[test]
fn path_data_absent_is_empty() {
    let obj = SceneObject::new(ObjectKind::Path);
    assert_eq!(obj.attrs().path_data(), "");
}

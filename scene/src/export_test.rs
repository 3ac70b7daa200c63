use super::*;
use crate::object::{ObjectKind, SceneObject};

#[test]
fn empty_scene_still_produces_valid_svg() {
    let svg = to_svg(&SceneDocument::new());
    assert!(svg.starts_with("<?xml"));
    assert!(svg.contains("<svg"));
    assert!(svg.trim_end().ends_with("</svg>"));
}

#[test]
fn rect_and_circle_elements() {
    let mut doc = SceneDocument::new();
    doc.objects.push(
        SceneObject::new(ObjectKind::Rect)
            .with_attr("left", 10.0)
            .with_attr("top", 20.0)
            .with_attr("width", 100.0)
            .with_attr("height", 80.0)
            .with_attr("stroke", "#112233"),
    );
    doc.objects.push(
        SceneObject::new(ObjectKind::Circle)
            .with_attr("left", 0.0)
            .with_attr("top", 0.0)
            .with_attr("radius", 50.0),
    );

    let svg = to_svg(&doc);
    assert!(svg.contains(r#"<rect x="10.0" y="20.0" width="100.0" height="80.0""#));
    assert!(svg.contains(r##"stroke="#112233""##));
    assert!(svg.contains(r#"<circle cx="50.0" cy="50.0" r="50.0""#));
}

#[test]
fn line_offsets_by_position() {
    let mut doc = SceneDocument::new();
    doc.objects.push(
        SceneObject::new(ObjectKind::Line)
            .with_attr("left", 5.0)
            .with_attr("top", 5.0)
            .with_attr("x1", 0.0)
            .with_attr("y1", 0.0)
            .with_attr("x2", 100.0)
            .with_attr("y2", 0.0),
    );

    let svg = to_svg(&doc);
    assert!(svg.contains(r#"<line x1="5.0" y1="5.0" x2="105.0" y2="5.0""#));
}

#[test]
fn text_is_escaped() {
    let mut doc = SceneDocument::new();
    doc.objects.push(
        SceneObject::new(ObjectKind::Text)
            .with_attr("text", "a < b & \"c\"")
            .with_attr("fill", "#000000"),
    );

    let svg = to_svg(&doc);
    assert!(svg.contains("a &lt; b &amp; &quot;c&quot;"));
    assert!(!svg.contains("a < b"));
}

#[test]
fn sticky_renders_rect_and_label() {
    let mut doc = SceneDocument::new();
    doc.objects.push(
        SceneObject::new(ObjectKind::Sticky)
            .with_attr("left", 0.0)
            .with_attr("top", 0.0)
            .with_attr("width", 150.0)
            .with_attr("height", 150.0)
            .with_attr("text", "note"),
    );

    let svg = to_svg(&doc);
    assert!(svg.contains(r##"fill="#fef3c7""##));
    assert!(svg.contains(">note</text>"));
}

#[test]
fn image_without_src_renders_placeholder_box() {
    let mut doc = SceneDocument::new();
    doc.objects.push(
        SceneObject::new(ObjectKind::Image)
            .with_attr("width", 40.0)
            .with_attr("height", 40.0),
    );

    let svg = to_svg(&doc);
    assert!(svg.contains("stroke-dasharray"));
    assert!(!svg.contains("<image"));
}

#[test]
fn path_transform_and_data() {
    let mut doc = SceneDocument::new();
    doc.objects.push(
        SceneObject::new(ObjectKind::Path)
            .with_attr("left", 3.0)
            .with_attr("top", 4.0)
            .with_attr("path", "M 0 0 L 10 10"),
    );

    let svg = to_svg(&doc);
    assert!(svg.contains(r#"d="M 0 0 L 10 10""#));
    assert!(svg.contains(r#"transform="translate(3.0 4.0)""#));
}

//! SVG flatten: render the current scene to a standalone vector image.
//!
//! The download surface exports the scene as SVG. Every object kind maps
//! to a native SVG element; unknown style fields are ignored rather than
//! guessed at, so the export is faithful to what the model understands
//! and silent about what it does not.

#[cfg(test)]
#[path = "export_test.rs"]
mod export_test;

use std::fmt::Write;

use crate::doc::SceneDocument;
use crate::object::{ObjectKind, SceneObject};

const PADDING: f64 = 20.0;
const STICKY_FILL: &str = "#fef3c7";
const STICKY_TEXT_FILL: &str = "#92400e";

/// Flatten a scene to an SVG document string.
#[must_use]
pub fn to_svg(scene: &SceneDocument) -> String {
    let (min_x, min_y, max_x, max_y) = bounds(scene);
    let width = (max_x - min_x) + PADDING * 2.0;
    let height = (max_y - min_y) + PADDING * 2.0;
    let origin_x = min_x - PADDING;
    let origin_y = min_y - PADDING;

    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{width:.0}" height="{height:.0}" viewBox="{origin_x:.1} {origin_y:.1} {width:.1} {height:.1}" style="background-color: white;">"#,
    );

    for obj in &scene.objects {
        render_object(&mut out, obj);
    }

    let _ = writeln!(out, "</svg>");
    out
}

/// Bounding box over all objects; a fixed viewport for empty scenes.
fn bounds(scene: &SceneDocument) -> (f64, f64, f64, f64) {
    if scene.objects.is_empty() {
        return (0.0, 0.0, 100.0, 100.0);
    }

    let mut min_x = f64::MAX;
    let mut min_y = f64::MAX;
    let mut max_x = f64::MIN;
    let mut max_y = f64::MIN;

    for obj in &scene.objects {
        let (x0, y0, x1, y1) = object_bounds(obj);
        min_x = min_x.min(x0);
        min_y = min_y.min(y0);
        max_x = max_x.max(x1);
        max_y = max_y.max(y1);
    }

    (min_x, min_y, max_x, max_y)
}

fn object_bounds(obj: &SceneObject) -> (f64, f64, f64, f64) {
    let a = obj.attrs();
    let (left, top) = (a.left(), a.top());
    match obj.kind {
        ObjectKind::Circle => {
            let d = a.radius() * 2.0;
            (left, top, left + d, top + d)
        }
        ObjectKind::Line => {
            let (x1, y1, x2, y2) = a.line_points();
            (
                left + x1.min(x2),
                top + y1.min(y2),
                left + x1.max(x2),
                top + y1.max(y2),
            )
        }
        ObjectKind::Text => {
            let w = a.width().max(a.text().len() as f64 * a.font_size() * 0.6);
            (left, top, left + w, top + a.height().max(a.font_size() * 1.2))
        }
        _ => (left, top, left + a.width(), top + a.height()),
    }
}

fn render_object(out: &mut String, obj: &SceneObject) {
    let a = obj.attrs();
    match obj.kind {
        ObjectKind::Rect => {
            let _ = writeln!(
                out,
                r#"  <rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}" stroke="{}" stroke-width="{:.1}" />"#,
                a.left(),
                a.top(),
                a.width(),
                a.height(),
                escape(a.fill()),
                escape(a.stroke()),
                a.stroke_width(),
            );
        }
        ObjectKind::Circle => {
            let r = a.radius();
            let _ = writeln!(
                out,
                r#"  <circle cx="{:.1}" cy="{:.1}" r="{r:.1}" fill="{}" stroke="{}" stroke-width="{:.1}" />"#,
                a.left() + r,
                a.top() + r,
                escape(a.fill()),
                escape(a.stroke()),
                a.stroke_width(),
            );
        }
        ObjectKind::Line => {
            let (x1, y1, x2, y2) = a.line_points();
            let _ = writeln!(
                out,
                r#"  <line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="{:.1}" />"#,
                a.left() + x1,
                a.top() + y1,
                a.left() + x2,
                a.top() + y2,
                escape(a.stroke()),
                a.stroke_width(),
            );
        }
        ObjectKind::Text => {
            let _ = writeln!(
                out,
                r#"  <text x="{:.1}" y="{:.1}" font-size="{:.0}" fill="{}">{}</text>"#,
                a.left(),
                a.top() + a.font_size(),
                a.font_size(),
                escape(a.fill()),
                escape(a.text()),
            );
        }
        ObjectKind::Path => {
            let _ = writeln!(
                out,
                r#"  <path d="{}" transform="translate({:.1} {:.1})" fill="none" stroke="{}" stroke-width="{:.1}" stroke-linecap="round" />"#,
                escape(&a.path_data()),
                a.left(),
                a.top(),
                escape(a.stroke()),
                a.stroke_width(),
            );
        }
        ObjectKind::Image | ObjectKind::Chart => {
            if a.src().is_empty() {
                let _ = writeln!(
                    out,
                    r##"  <rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="#cccccc" stroke-dasharray="4 2" />"##,
                    a.left(),
                    a.top(),
                    a.width(),
                    a.height(),
                );
            } else {
                let _ = writeln!(
                    out,
                    r#"  <image x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" href="{}" />"#,
                    a.left(),
                    a.top(),
                    a.width(),
                    a.height(),
                    escape(a.src()),
                );
            }
        }
        ObjectKind::Sticky => {
            let _ = writeln!(
                out,
                r#"  <rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" rx="4" fill="{STICKY_FILL}" />"#,
                a.left(),
                a.top(),
                a.width(),
                a.height(),
            );
            let _ = writeln!(
                out,
                r#"  <text x="{:.1}" y="{:.1}" font-size="{:.0}" fill="{STICKY_TEXT_FILL}" text-anchor="middle">{}</text>"#,
                a.left() + a.width() / 2.0,
                a.top() + a.height() / 2.0,
                a.font_size(),
                escape(a.text()),
            );
        }
    }
}

/// Escape text for use in SVG element content and attribute values.
fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

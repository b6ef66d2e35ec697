//! Hit testing: point → shape lookup.
//!
//! Walks the element collection topmost first. Root shapes are those with
//! no group parent; children are only found through `child_shape_at`.

use fc_core::anchor::anchor_near;
use fc_core::config::EngineConfig;
use fc_core::elements::Elements;
use fc_core::geometry::{Point, Rect};
use fc_core::id::ShapeId;
use fc_core::model::{Anchor, Shape};

/// Whether `p` falls on `shape`. Point connectors are hit within
/// `min_height` of any of their legs; everything else by its rectangle.
pub fn shape_contains(shape: &Shape, p: Point, config: &EngineConfig) -> bool {
    if shape.kind.is_point_connector() {
        let tolerance = config.min_height as f64;
        return shape
            .path
            .segments
            .iter()
            .any(|s| distance_to_segment(p, s.from, s.to) <= tolerance);
    }
    shape.rect.contains(p)
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let (px, py) = (p.x as f64, p.y as f64);
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (bx, by) = (b.x as f64, b.y as f64);
    let (vx, vy) = (bx - ax, by - ay);
    let len2 = vx * vx + vy * vy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((px - ax) * vx + (py - ay) * vy) / len2).clamp(0.0, 1.0)
    };
    let (cx, cy) = (ax + t * vx, ay + t * vy);
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

/// Topmost parentless shape under `p`.
pub fn root_shape_at(elements: &Elements, p: Point, config: &EngineConfig) -> Option<ShapeId> {
    elements
        .iter()
        .find(|s| s.parent.is_none() && shape_contains(s, p, config))
        .map(|s| s.id)
}

/// Topmost group member under `p`.
pub fn child_shape_at(elements: &Elements, p: Point, config: &EngineConfig) -> Option<ShapeId> {
    elements
        .iter()
        .find(|s| s.parent.is_some() && shape_contains(s, p, config))
        .map(|s| s.id)
}

/// Parentless shapes whose update rectangle lies inside `area`, in z-order.
/// Used for marquee selection.
pub fn shapes_in_rect(elements: &Elements, area: Rect, config: &EngineConfig) -> Vec<ShapeId> {
    elements
        .iter()
        .filter(|s| s.parent.is_none() && area.contains_rect(&s.update_rect(config)))
        .map(|s| s.id)
        .collect()
}

/// Anchor of shape `id` near `p`, if any.
pub fn anchor_at(elements: &Elements, id: ShapeId, p: Point, config: &EngineConfig) -> Option<Anchor> {
    elements.get(id).and_then(|s| anchor_near(s, p, config))
}

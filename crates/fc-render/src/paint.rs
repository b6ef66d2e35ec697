//! Shape → tiny-skia drawing commands.
//!
//! One painter per kind, looked up through `painter_for`. Painters read the
//! shape's derived path (`fc_core::path`) and never recompute geometry.
//! Anchors and connection-point markers are drawn on top by `paint_shape`.

use crate::surface::skia_color;
use fc_core::anchor::{anchors, connection_points};
use fc_core::config::EngineConfig;
use fc_core::geometry::{Point, Rect};
use fc_core::model::{Color, LineCap, Shape, ShapeKind, Style};
use fc_core::path::Segment;
use kurbo::{BezPath, PathEl};
use tiny_skia::{FillRule, Paint, Path, PathBuilder, Pixmap, Stroke, StrokeDash, Transform};

pub type Painter = fn(&mut Pixmap, &Shape, &EngineConfig);

pub fn painter_for(kind: ShapeKind) -> Painter {
    match kind {
        ShapeKind::GroupBox => paint_group,
        k if k.is_connector() => paint_connector,
        _ => paint_closed,
    }
}

/// Paint a shape with its kind's painter, then its handles and markers.
pub fn paint_shape(pixmap: &mut Pixmap, shape: &Shape, config: &EngineConfig) {
    painter_for(shape.kind)(pixmap, shape, config);

    if !shape.text.is_empty() {
        log::trace!("TEXT {} {:?} at ({}, {})", shape.id, shape.text, shape.rect.x, shape.rect.y);
        // Glyph shaping needs a font context; the text stays on the model.
    }
    if shape.selected || shape.show_anchors {
        paint_anchors(pixmap, shape, config);
    }
    if shape.show_connection_points {
        paint_connection_points(pixmap, shape, config);
    }
}

// ─── Shape painters ──────────────────────────────────────────────────────

fn paint_closed(pixmap: &mut Pixmap, shape: &Shape, _config: &EngineConfig) {
    log::trace!("paint {} {:?} {:?}", shape.id, shape.kind, shape.rect);
    let Some(path) = to_skia(&shape.path.outline) else {
        return;
    };
    fill(pixmap, &path, shape.style.fill);
    stroke(pixmap, &path, &shape.style, None);
}

fn paint_group(pixmap: &mut Pixmap, shape: &Shape, _config: &EngineConfig) {
    log::trace!("paint group {} {:?}", shape.id, shape.rect);
    let Some(path) = to_skia(&shape.path.outline) else {
        return;
    };
    stroke(pixmap, &path, &shape.style, StrokeDash::new(vec![4.0, 4.0], 0.0));
}

fn paint_connector(pixmap: &mut Pixmap, shape: &Shape, config: &EngineConfig) {
    log::trace!("paint connector {} {:?}", shape.id, shape.endpoints());
    for segment in &shape.path.segments {
        if let Some(line) = line_path(segment.from, segment.to) {
            stroke(pixmap, &line, &shape.style, None);
        }
        paint_cap(pixmap, segment, true, &shape.style, config.cap_size);
        paint_cap(pixmap, segment, false, &shape.style, config.cap_size);
    }
}

/// Arrow or diamond decoration at one end of a segment.
fn paint_cap(pixmap: &mut Pixmap, segment: &Segment, at_start: bool, style: &Style, size: i32) {
    let (cap, tip, from) = if at_start {
        (segment.start_cap, segment.from, segment.to)
    } else {
        (segment.end_cap, segment.to, segment.from)
    };
    if cap == LineCap::None {
        return;
    }
    let (tx, ty) = (tip.x as f32, tip.y as f32);
    let (vx, vy) = (tx - from.x as f32, ty - from.y as f32);
    let len = (vx * vx + vy * vy).sqrt();
    if len == 0.0 {
        return;
    }
    let size = size as f32;
    // Unit vector pointing at the tip and its perpendicular.
    let (ux, uy) = (vx / len, vy / len);
    let (px, py) = (-uy, ux);

    let mut pb = PathBuilder::new();
    pb.move_to(tx, ty);
    match cap {
        LineCap::Arrow => {
            let (bx, by) = (tx - ux * size * 2.0, ty - uy * size * 2.0);
            pb.line_to(bx + px * size, by + py * size);
            pb.line_to(bx - px * size, by - py * size);
        }
        LineCap::Diamond => {
            let (mx, my) = (tx - ux * size, ty - uy * size);
            pb.line_to(mx + px * size, my + py * size);
            pb.line_to(tx - ux * size * 2.0, ty - uy * size * 2.0);
            pb.line_to(mx - px * size, my - py * size);
        }
        LineCap::None => {}
    }
    pb.close();
    if let Some(path) = pb.finish() {
        fill(pixmap, &path, style.stroke);
    }
}

// ─── Overlays ────────────────────────────────────────────────────────────

fn paint_anchors(pixmap: &mut Pixmap, shape: &Shape, config: &EngineConfig) {
    for anchor in anchors(shape, config) {
        let Some(square) = rect_path(anchor.rect) else {
            continue;
        };
        if shape.selected {
            fill(pixmap, &square, Color::BLUE);
        } else {
            fill(pixmap, &square, Color::WHITE);
            stroke(pixmap, &square, &marker_style(Color::BLUE), None);
        }
    }
}

fn paint_connection_points(pixmap: &mut Pixmap, shape: &Shape, config: &EngineConfig) {
    let n = config.connection_point_size;
    let style = marker_style(Color::BLUE);
    for cp in connection_points(shape) {
        let Point { x, y } = cp.point;
        for (a, b) in [
            (Point::new(x - n, y - n), Point::new(x + n, y + n)),
            (Point::new(x - n, y + n), Point::new(x + n, y - n)),
        ] {
            if let Some(line) = line_path(a, b) {
                stroke(pixmap, &line, &style, None);
            }
        }
    }
}

fn marker_style(color: Color) -> Style {
    Style {
        fill: Color::TRANSPARENT,
        stroke: color,
        stroke_width: 1,
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn solid(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(skia_color(color));
    paint.anti_alias = false;
    paint
}

fn fill(pixmap: &mut Pixmap, path: &Path, color: Color) {
    if color.a == 0 {
        return;
    }
    pixmap.fill_path(path, &solid(color), FillRule::Winding, Transform::identity(), None);
}

fn stroke(pixmap: &mut Pixmap, path: &Path, style: &Style, dash: Option<StrokeDash>) {
    if style.stroke.a == 0 || style.stroke_width <= 0 {
        return;
    }
    let stroke = Stroke {
        width: style.stroke_width as f32,
        dash,
        ..Stroke::default()
    };
    pixmap.stroke_path(path, &solid(style.stroke), &stroke, Transform::identity(), None);
}

fn line_path(a: Point, b: Point) -> Option<Path> {
    let mut pb = PathBuilder::new();
    pb.move_to(a.x as f32, a.y as f32);
    pb.line_to(b.x as f32, b.y as f32);
    pb.finish()
}

fn rect_path(r: Rect) -> Option<Path> {
    tiny_skia::Rect::from_xywh(r.x as f32, r.y as f32, r.width as f32, r.height as f32).map(PathBuilder::from_rect)
}

/// Convert a kurbo outline to a tiny-skia path.
pub fn to_skia(bez: &BezPath) -> Option<Path> {
    let mut pb = PathBuilder::new();
    for el in bez.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(c, p) => pb.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(c1, c2, p) => pb.cubic_to(
                c1.x as f32,
                c1.y as f32,
                c2.x as f32,
                c2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

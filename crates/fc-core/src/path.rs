//! Per-kind render geometry ("update path").
//!
//! A shape's outline is a pure function of its rectangle (and, for point
//! connectors, its endpoints). `build` dispatches through a table of
//! geometry builders keyed by `ShapeKind`; the painter table in the
//! renderer mirrors it.

use crate::geometry::{Point, Rect};
use crate::model::{LineCap, Shape, ShapeKind};
use kurbo::{BezPath, Shape as _};
use smallvec::SmallVec;

/// Curve flattening tolerance for ellipses, in surface units.
const TOLERANCE: f64 = 0.1;

/// One straight piece of a connector, with the caps drawn at its ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
    pub start_cap: LineCap,
    pub end_cap: LineCap,
}

impl Segment {
    pub fn new(from: Point, to: Point) -> Self {
        Self {
            from,
            to,
            start_cap: LineCap::None,
            end_cap: LineCap::None,
        }
    }

    /// Bounding rectangle of the segment (zero thickness).
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.from, self.to)
    }
}

/// Derived geometry of a shape.
#[derive(Debug, Clone, Default)]
pub struct ShapePath {
    /// Closed outline for fillable kinds, polyline for connectors.
    pub outline: BezPath,
    /// Connector pieces in start-to-end order. Empty for closed shapes.
    pub segments: SmallVec<[Segment; 3]>,
}

pub type GeometryBuilder = fn(&Shape) -> ShapePath;

/// Geometry builder for a kind.
pub fn builder_for(kind: ShapeKind) -> GeometryBuilder {
    match kind {
        ShapeKind::Box | ShapeKind::GroupBox => rectangle,
        ShapeKind::Ellipse => ellipse,
        ShapeKind::Diamond => diamond,
        ShapeKind::UpTriangle
        | ShapeKind::DownTriangle
        | ShapeKind::LeftTriangle
        | ShapeKind::RightTriangle => triangle,
        ShapeKind::HorizontalLine | ShapeKind::VerticalLine | ShapeKind::DiagonalConnector => {
            straight
        }
        ShapeKind::DynamicConnectorLr | ShapeKind::DynamicConnectorUd => orthogonal,
    }
}

/// Build the geometry of `shape` from its current rectangle and endpoints.
pub fn build(shape: &Shape) -> ShapePath {
    builder_for(shape.kind)(shape)
}

// ─── Closed shapes ──────────────────────────────────────────────────────

fn polygon(points: &[Point]) -> ShapePath {
    let mut outline = BezPath::new();
    for (i, p) in points.iter().enumerate() {
        if i == 0 {
            outline.move_to(p.to_kurbo());
        } else {
            outline.line_to(p.to_kurbo());
        }
    }
    outline.close_path();
    ShapePath {
        outline,
        segments: SmallVec::new(),
    }
}

fn rectangle(shape: &Shape) -> ShapePath {
    ShapePath {
        outline: shape.rect.to_kurbo().to_path(TOLERANCE),
        segments: SmallVec::new(),
    }
}

fn ellipse(shape: &Shape) -> ShapePath {
    ShapePath {
        outline: kurbo::Ellipse::from_rect(shape.rect.to_kurbo()).to_path(TOLERANCE),
        segments: SmallVec::new(),
    }
}

fn diamond(shape: &Shape) -> ShapePath {
    let r = shape.rect;
    let c = r.center();
    polygon(&[
        Point::new(c.x, r.top()),
        Point::new(r.right(), c.y),
        Point::new(c.x, r.bottom()),
        Point::new(r.left(), c.y),
    ])
}

fn triangle(shape: &Shape) -> ShapePath {
    let r = shape.rect;
    let c = r.center();
    let pts = match shape.kind {
        ShapeKind::DownTriangle => [
            Point::new(r.left(), r.top()),
            Point::new(r.right(), r.top()),
            Point::new(c.x, r.bottom()),
        ],
        ShapeKind::LeftTriangle => [
            Point::new(r.left(), c.y),
            Point::new(r.right(), r.top()),
            Point::new(r.right(), r.bottom()),
        ],
        ShapeKind::RightTriangle => [
            Point::new(r.left(), r.top()),
            Point::new(r.right(), c.y),
            Point::new(r.left(), r.bottom()),
        ],
        _ => [
            Point::new(c.x, r.top()),
            Point::new(r.right(), r.bottom()),
            Point::new(r.left(), r.bottom()),
        ],
    };
    polygon(&pts)
}

// ─── Connectors ─────────────────────────────────────────────────────────

fn polyline(mut segments: SmallVec<[Segment; 3]>, shape: &Shape) -> ShapePath {
    if let Some(ends) = shape.ends {
        if let Some(first) = segments.first_mut() {
            first.start_cap = ends.start_cap;
        }
        if let Some(last) = segments.last_mut() {
            last.end_cap = ends.end_cap;
        }
    }
    let mut outline = BezPath::new();
    if let Some(first) = segments.first() {
        outline.move_to(first.from.to_kurbo());
        for s in &segments {
            outline.line_to(s.to.to_kurbo());
        }
    }
    ShapePath { outline, segments }
}

fn straight(shape: &Shape) -> ShapePath {
    let mut segments = SmallVec::new();
    if let Some((start, end)) = shape.endpoints() {
        segments.push(Segment::new(start, end));
    }
    polyline(segments, shape)
}

/// Three orthogonal legs. The middle leg sits halfway between the endpoints.
fn orthogonal(shape: &Shape) -> ShapePath {
    let mut segments = SmallVec::new();
    if let Some((start, end)) = shape.endpoints() {
        let (a, b) = if shape.kind == ShapeKind::DynamicConnectorUd {
            let mid_y = start.y + (end.y - start.y) / 2;
            (Point::new(start.x, mid_y), Point::new(end.x, mid_y))
        } else {
            let mid_x = start.x + (end.x - start.x) / 2;
            (Point::new(mid_x, start.y), Point::new(mid_x, end.y))
        };
        segments.push(Segment::new(start, a));
        segments.push(Segment::new(a, b));
        segments.push(Segment::new(b, end));
    }
    polyline(segments, shape)
}

//! Anchors, connection points, and the resize policy.
//!
//! Both are derived on demand from a shape's current rectangle (or
//! endpoints) and are never stored.

use crate::config::EngineConfig;
use crate::geometry::{Delta, Point, Rect};
use crate::model::{Anchor, ConnectionPoint, Cursor, GripType, Shape, ShapeKind};
use smallvec::{SmallVec, smallvec};

pub type ConnectionPoints = SmallVec<[ConnectionPoint; 8]>;
pub type Anchors = SmallVec<[Anchor; 8]>;

fn edge_middles(r: Rect) -> [ConnectionPoint; 4] {
    let c = r.center();
    [
        ConnectionPoint::new(GripType::LeftMiddle, Point::new(r.left(), c.y)),
        ConnectionPoint::new(GripType::RightMiddle, Point::new(r.right(), c.y)),
        ConnectionPoint::new(GripType::TopMiddle, Point::new(c.x, r.top())),
        ConnectionPoint::new(GripType::BottomMiddle, Point::new(c.x, r.bottom())),
    ]
}

fn corners(r: Rect) -> [ConnectionPoint; 4] {
    [
        ConnectionPoint::new(GripType::TopLeft, Point::new(r.left(), r.top())),
        ConnectionPoint::new(GripType::TopRight, Point::new(r.right(), r.top())),
        ConnectionPoint::new(GripType::BottomLeft, Point::new(r.left(), r.bottom())),
        ConnectionPoint::new(GripType::BottomRight, Point::new(r.right(), r.bottom())),
    ]
}

/// Attachment points a connector endpoint may snap to (or, for connectors,
/// their own endpoints).
pub fn connection_points(shape: &Shape) -> ConnectionPoints {
    let r = shape.rect;
    let pick = |grips: &[GripType]| -> ConnectionPoints {
        corners(r)
            .into_iter()
            .chain(edge_middles(r))
            .filter(|cp| grips.contains(&cp.grip))
            .collect()
    };
    match shape.kind {
        ShapeKind::Box | ShapeKind::GroupBox => corners(r).into_iter().chain(edge_middles(r)).collect(),
        ShapeKind::Ellipse | ShapeKind::Diamond => edge_middles(r).into_iter().collect(),
        ShapeKind::UpTriangle => pick(&[
            GripType::TopMiddle,
            GripType::BottomMiddle,
            GripType::BottomLeft,
            GripType::BottomRight,
        ]),
        ShapeKind::DownTriangle => pick(&[
            GripType::BottomMiddle,
            GripType::TopMiddle,
            GripType::TopLeft,
            GripType::TopRight,
        ]),
        ShapeKind::LeftTriangle => pick(&[
            GripType::LeftMiddle,
            GripType::RightMiddle,
            GripType::TopRight,
            GripType::BottomRight,
        ]),
        ShapeKind::RightTriangle => pick(&[
            GripType::RightMiddle,
            GripType::LeftMiddle,
            GripType::TopLeft,
            GripType::BottomLeft,
        ]),
        _ => match shape.endpoints() {
            Some((start, end)) => smallvec![
                ConnectionPoint::new(GripType::Start, start),
                ConnectionPoint::new(GripType::End, end),
            ],
            None => SmallVec::new(),
        },
    }
}

/// Square handle of side `size` with its top-left corner at (`x`, `y`).
fn handle(grip: GripType, x: i32, y: i32, size: i32, cursor: Cursor) -> Anchor {
    Anchor {
        grip,
        rect: Rect::new(x, y, size, size),
        cursor,
    }
}

/// Handle centered on `p`.
fn centered(grip: GripType, p: Point, size: i32, cursor: Cursor) -> Anchor {
    handle(grip, p.x - size / 2, p.y - size / 2, size, cursor)
}

/// Resize and endpoint handles, in hit-test priority order.
pub fn anchors(shape: &Shape, config: &EngineConfig) -> Anchors {
    let s = config.anchor_size;
    let r = shape.rect;
    match (shape.kind, shape.endpoints()) {
        (ShapeKind::HorizontalLine, Some((start, end))) => smallvec![
            centered(GripType::Start, start, s, Cursor::SizeWe),
            centered(GripType::End, end, s, Cursor::SizeWe),
        ],
        (ShapeKind::VerticalLine, Some((start, end))) => smallvec![
            centered(GripType::Start, start, s, Cursor::SizeNs),
            centered(GripType::End, end, s, Cursor::SizeNs),
        ],
        (_, Some((start, end))) => smallvec![
            centered(GripType::Start, start, s, Cursor::SizeAll),
            centered(GripType::End, end, s, Cursor::SizeAll),
        ],
        (_, None) => {
            let c = r.center();
            smallvec![
                handle(GripType::TopLeft, r.left(), r.top(), s, Cursor::SizeNwse),
                handle(GripType::TopRight, r.right() - s, r.top(), s, Cursor::SizeNesw),
                handle(GripType::BottomLeft, r.left(), r.bottom() - s, s, Cursor::SizeNesw),
                handle(GripType::BottomRight, r.right() - s, r.bottom() - s, s, Cursor::SizeNwse),
                handle(GripType::LeftMiddle, r.left(), c.y - s / 2, s, Cursor::SizeWe),
                handle(GripType::RightMiddle, r.right() - s, c.y - s / 2, s, Cursor::SizeWe),
                handle(GripType::TopMiddle, c.x - s / 2, r.top(), s, Cursor::SizeNs),
                handle(GripType::BottomMiddle, c.x - s / 2, r.bottom() - s, s, Cursor::SizeNs),
            ]
        }
    }
}

/// First anchor of `shape` near `p`.
pub fn anchor_near(shape: &Shape, p: Point, config: &EngineConfig) -> Option<Anchor> {
    anchors(shape, config)
        .into_iter()
        .find(|a| a.is_near(p, config.anchor_proximity))
}

/// Edge-middle handles only move along their own axis.
pub fn adjusted_delta(grip: GripType, d: Delta) -> Delta {
    match grip {
        GripType::LeftMiddle | GripType::RightMiddle => Delta::new(d.dx, 0),
        GripType::TopMiddle | GripType::BottomMiddle => Delta::new(0, d.dy),
        _ => d,
    }
}

/// Result of dragging a rectangle handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resized {
    pub rect: Rect,
    /// The delta actually applied after clamping at the minimum size.
    pub applied: Delta,
}

/// Apply `d` to the edge(s) addressed by `grip`. A component that would
/// shrink the rectangle below `min_w` x `min_h` is zeroed instead, leaving
/// the other component in effect.
pub fn resize(rect: Rect, grip: GripType, d: Delta, min_w: i32, min_h: i32) -> Resized {
    let (moves_left, moves_right, moves_top, moves_bottom) = match grip {
        GripType::TopLeft => (true, false, true, false),
        GripType::TopRight => (false, true, true, false),
        GripType::BottomLeft => (true, false, false, true),
        GripType::BottomRight => (false, true, false, true),
        GripType::LeftMiddle => (true, false, false, false),
        GripType::RightMiddle => (false, true, false, false),
        GripType::TopMiddle => (false, false, true, false),
        GripType::BottomMiddle => (false, false, false, true),
        _ => (false, false, false, false),
    };

    let mut applied = Delta::ZERO;
    let mut r = rect;

    if moves_left || moves_right {
        let width = if moves_left { r.width - d.dx } else { r.width + d.dx };
        if width >= min_w {
            if moves_left {
                r.x += d.dx;
            }
            r.width = width;
            applied.dx = d.dx;
        }
    }

    if moves_top || moves_bottom {
        let height = if moves_top { r.height - d.dy } else { r.height + d.dy };
        if height >= min_h {
            if moves_top {
                r.y += d.dy;
            }
            r.height = height;
            applied.dy = d.dy;
        }
    }

    Resized { rect: r, applied }
}

/// Line-type connectors: the start grip moves the leading edge, the end grip
/// the trailing edge, along the line's own axis. Length keeps the floor.
pub fn resize_line(shape: &Shape, grip: GripType, d: Delta, config: &EngineConfig) -> Resized {
    let horizontal = shape.kind == ShapeKind::HorizontalLine;
    let axis_grip = match (horizontal, grip.is_start_side()) {
        (true, true) => GripType::LeftMiddle,
        (true, false) => GripType::RightMiddle,
        (false, true) => GripType::TopMiddle,
        (false, false) => GripType::BottomMiddle,
    };
    resize(
        shape.rect,
        axis_grip,
        adjusted_delta(axis_grip, d),
        config.min_width,
        config.min_height,
    )
}

//! Integer surface geometry.
//!
//! All shape positions live on the integer pixel lattice of the drawing
//! surface. Moving by a delta and then by its negation is exact, which the
//! undo stack relies on.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Neg, Sub};

/// A position on the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// A displacement between two points (mouse motion, drag offset, snap offset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Delta {
    pub dx: i32,
    pub dy: i32,
}

/// Axis-aligned rectangle: top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

// ─── Point ──────────────────────────────────────────────────────────────

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// True when both coordinates are within `range` of `other`.
    pub fn is_near(self, other: Point, range: i32) -> bool {
        (self.x - other.x).abs() <= range && (self.y - other.y).abs() <= range
    }

    pub fn to_kurbo(self) -> kurbo::Point {
        kurbo::Point::new(f64::from(self.x), f64::from(self.y))
    }
}

impl Add<Delta> for Point {
    type Output = Point;

    fn add(self, d: Delta) -> Point {
        Point::new(self.x + d.dx, self.y + d.dy)
    }
}

impl AddAssign<Delta> for Point {
    fn add_assign(&mut self, d: Delta) {
        self.x += d.dx;
        self.y += d.dy;
    }
}

impl Sub for Point {
    type Output = Delta;

    fn sub(self, other: Point) -> Delta {
        Delta::new(self.x - other.x, self.y - other.y)
    }
}

// ─── Delta ──────────────────────────────────────────────────────────────

impl Delta {
    pub const ZERO: Delta = Delta { dx: 0, dy: 0 };

    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    pub fn is_zero(self) -> bool {
        self.dx == 0 && self.dy == 0
    }

    /// Manhattan length, used to rank snap candidates.
    pub fn manhattan(self) -> i32 {
        self.dx.abs() + self.dy.abs()
    }

    pub fn abs(self) -> Delta {
        Delta::new(self.dx.abs(), self.dy.abs())
    }
}

impl Add for Delta {
    type Output = Delta;

    fn add(self, other: Delta) -> Delta {
        Delta::new(self.dx + other.dx, self.dy + other.dy)
    }
}

impl AddAssign for Delta {
    fn add_assign(&mut self, other: Delta) {
        self.dx += other.dx;
        self.dy += other.dy;
    }
}

impl Neg for Delta {
    type Output = Delta;

    fn neg(self) -> Delta {
        Delta::new(-self.dx, -self.dy)
    }
}

// ─── Rect ───────────────────────────────────────────────────────────────

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanned by two arbitrary corners (a rubber band).
    pub fn from_corners(a: Point, b: Point) -> Self {
        Rect::new(
            a.x.min(b.x),
            a.y.min(b.y),
            (a.x - b.x).abs(),
            (a.y - b.y).abs(),
        )
    }

    /// Smallest rectangle containing every point. `None` for no points.
    pub fn bounding(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
        Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Half-open point containment: the right and bottom edges are outside.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    /// Inclusive rectangle containment.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.x <= other.x
            && other.right() <= self.right()
            && self.y <= other.y
            && other.bottom() <= self.bottom()
    }

    /// Strict overlap: rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        other.x < self.right()
            && self.x < other.right()
            && other.y < self.bottom()
            && self.y < other.bottom()
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        (x1 > x0 && y1 > y0).then(|| Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Inflate by `dx` on the left and right and `dy` on the top and bottom.
    pub fn grow(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(
            self.x - dx,
            self.y - dy,
            self.width + 2 * dx,
            self.height + 2 * dy,
        )
    }

    pub fn grow_uniform(&self, n: i32) -> Rect {
        self.grow(n, n)
    }

    pub fn translate(&self, d: Delta) -> Rect {
        Rect::new(self.x + d.dx, self.y + d.dy, self.width, self.height)
    }

    pub fn to_kurbo(&self) -> kurbo::Rect {
        kurbo::Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.right()),
            f64::from(self.bottom()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn translate_and_back_is_exact() {
        let r = Rect::new(25, 50, 200, 100);
        let d = Delta::new(10, 5);
        assert_eq!(r.translate(d), Rect::new(35, 55, 200, 100));
        assert_eq!(r.translate(d).translate(-d), r);
    }

    #[test]
    fn edge_sharing_rects_do_not_intersect() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(10, 0, 10, 10);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&b.translate(Delta::new(-1, 0))));
        assert_eq!(a.intersection(&b), None);
    }

    #[test]
    fn point_containment_is_half_open() {
        let r = Rect::new(0, 0, 10, 10);
        assert!(r.contains(Point::new(0, 0)));
        assert!(r.contains(Point::new(9, 9)));
        assert!(!r.contains(Point::new(10, 5)));
    }

    #[test]
    fn from_corners_normalizes() {
        let r = Rect::from_corners(Point::new(50, 40), Point::new(10, 60));
        assert_eq!(r, Rect::new(10, 40, 40, 20));
    }

    #[test]
    fn grow_inflates_both_sides() {
        let r = Rect::new(10, 10, 20, 20).grow(3, 5);
        assert_eq!(r, Rect::new(7, 5, 26, 30));
    }

    #[test]
    fn bounding_box_of_points() {
        let pts = [Point::new(5, 9), Point::new(-3, 2), Point::new(4, 12)];
        assert_eq!(Rect::bounding(&pts), Some(Rect::new(-3, 2, 8, 10)));
        assert_eq!(Rect::bounding(&[]), None);
    }

    #[test]
    fn union_and_containment() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(20, 5, 10, 10);
        let u = a.union(&b);
        assert_eq!(u, Rect::new(0, 0, 30, 15));
        assert!(u.contains_rect(&a));
        assert!(u.contains_rect(&b));
        assert!(!a.contains_rect(&u));
    }
}

//! Shape model: styles, grips, connections, and the `Shape` record.
//!
//! Every visual element on the canvas is a `Shape`. Per-kind behavior
//! (outline geometry, connection points, anchors) is selected by the closed
//! `ShapeKind` tag rather than by a type hierarchy; see `path` and `anchor`.
//!
//! Connections are stored on the shape being pointed at. A connector only
//! carries back-references (`ConnectorEnds::start_shape` / `end_shape`) to
//! the shapes its endpoints are pinned to. `Elements` keeps both sides in
//! step.

use crate::config::EngineConfig;
use crate::geometry::{Delta, Point, Rect};
use crate::id::ShapeId;
use crate::path::ShapePath;
use serde::{Deserialize, Serialize};

// ─── Colors & Style ─────────────────────────────────────────────────────

/// RGBA color, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const LIGHT_BLUE: Color = Color::rgb(173, 216, 230);
    pub const TRANSPARENT: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Some(Color::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Some(Color::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            8 => Some(Color {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
                a: channel(&hex[6..8])?,
            }),
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Fill and border pen of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    pub fill: Color,
    pub stroke: Color,
    pub stroke_width: i32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: Color::WHITE,
            stroke: Color::BLACK,
            stroke_width: 1,
        }
    }
}

/// End decoration of a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LineCap {
    #[default]
    None,
    Arrow,
    Diamond,
}

// ─── Grips, anchors, connection points ──────────────────────────────────

/// The category of an anchor or connection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GripType {
    /// Unrestricted; used to ask for every connection point.
    #[default]
    None,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    LeftMiddle,
    RightMiddle,
    TopMiddle,
    BottomMiddle,
    Start,
    End,
}

impl GripType {
    /// Grips that address a connector's start endpoint.
    pub fn is_start_side(self) -> bool {
        matches!(self, GripType::Start | GripType::TopMiddle | GripType::LeftMiddle)
    }

    pub fn is_corner(self) -> bool {
        matches!(
            self,
            GripType::TopLeft | GripType::TopRight | GripType::BottomLeft | GripType::BottomRight
        )
    }

    pub fn is_endpoint(self) -> bool {
        matches!(self, GripType::Start | GripType::End)
    }
}

/// Pointer cursor shown over an anchor or during a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cursor {
    #[default]
    Arrow,
    SizeAll,
    SizeNwse,
    SizeNesw,
    SizeWe,
    SizeNs,
}

/// A named attachment coordinate derived from a shape's geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionPoint {
    pub grip: GripType,
    pub point: Point,
}

impl ConnectionPoint {
    pub const fn new(grip: GripType, point: Point) -> Self {
        Self { grip, point }
    }
}

/// Resize or endpoint handle, derived from the current bounding rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub grip: GripType,
    pub rect: Rect,
    pub cursor: Cursor,
}

impl Anchor {
    /// Within the handle grown by `proximity` on every side.
    pub fn is_near(&self, p: Point, proximity: i32) -> bool {
        self.rect.grow_uniform(proximity).contains(p)
    }
}

/// "Connector `to_element`'s point `to_connection_point` is pinned to this
/// shape's point `element_connection_point`." Stored on the pinned-to shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub to_element: ShapeId,
    pub to_connection_point: ConnectionPoint,
    pub element_connection_point: ConnectionPoint,
}

// ─── Shape kinds ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Box,
    Ellipse,
    Diamond,
    UpTriangle,
    DownTriangle,
    LeftTriangle,
    RightTriangle,
    /// Straight horizontal connector whose geometry is its rectangle.
    HorizontalLine,
    /// Straight vertical connector whose geometry is its rectangle.
    VerticalLine,
    /// Straight connector between two free endpoints.
    DiagonalConnector,
    /// Orthogonal three-segment connector, horizontal legs first.
    DynamicConnectorLr,
    /// Orthogonal three-segment connector, vertical legs first.
    DynamicConnectorUd,
    GroupBox,
}

impl ShapeKind {
    pub fn is_connector(self) -> bool {
        self.is_line() || self.is_point_connector()
    }

    /// Connectors whose endpoints sit on their rectangle's edges.
    pub fn is_line(self) -> bool {
        matches!(self, ShapeKind::HorizontalLine | ShapeKind::VerticalLine)
    }

    /// Connectors defined by a start and an end point.
    pub fn is_point_connector(self) -> bool {
        matches!(
            self,
            ShapeKind::DiagonalConnector | ShapeKind::DynamicConnectorLr | ShapeKind::DynamicConnectorUd
        )
    }

    /// Prefix used for generated ids.
    pub fn tag(self) -> &'static str {
        match self {
            ShapeKind::Box => "box",
            ShapeKind::Ellipse => "ellipse",
            ShapeKind::Diamond => "diamond",
            ShapeKind::UpTriangle => "up_triangle",
            ShapeKind::DownTriangle => "down_triangle",
            ShapeKind::LeftTriangle => "left_triangle",
            ShapeKind::RightTriangle => "right_triangle",
            ShapeKind::HorizontalLine => "hline",
            ShapeKind::VerticalLine => "vline",
            ShapeKind::DiagonalConnector => "diagonal",
            ShapeKind::DynamicConnectorLr => "dynamic_lr",
            ShapeKind::DynamicConnectorUd => "dynamic_ud",
            ShapeKind::GroupBox => "group",
        }
    }
}

/// Endpoint state carried by every connector kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectorEnds {
    pub start: Point,
    pub end: Point,
    pub start_cap: LineCap,
    pub end_cap: LineCap,
    /// Shape the start endpoint is pinned to.
    pub start_shape: Option<ShapeId>,
    /// Shape the end endpoint is pinned to.
    pub end_shape: Option<ShapeId>,
}

impl ConnectorEnds {
    pub fn shape_at(&self, grip: GripType) -> Option<ShapeId> {
        if grip.is_start_side() {
            self.start_shape
        } else {
            self.end_shape
        }
    }

    pub fn set_shape_at(&mut self, grip: GripType, shape: Option<ShapeId>) {
        if grip.is_start_side() {
            self.start_shape = shape;
        } else {
            self.end_shape = shape;
        }
    }

    pub fn has_caps(&self) -> bool {
        self.start_cap != LineCap::None || self.end_cap != LineCap::None
    }
}

// ─── Shape ──────────────────────────────────────────────────────────────

/// A visual element on the canvas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    pub kind: ShapeKind,
    /// Bounding ("display") rectangle in surface coordinates.
    pub rect: Rect,
    pub style: Style,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Present exactly for connector kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends: Option<ConnectorEnds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ShapeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ShapeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<Connection>,
    #[serde(skip)]
    pub selected: bool,
    #[serde(skip)]
    pub show_anchors: bool,
    #[serde(skip)]
    pub show_connection_points: bool,
    /// Derived render geometry. Rebuilt by `update_path`.
    #[serde(skip)]
    pub path: ShapePath,
}

impl Shape {
    /// Create a shape with a fresh id. Connector kinds get endpoints derived
    /// from the rectangle (left/top to right/bottom).
    pub fn new(kind: ShapeKind, rect: Rect) -> Self {
        let ends = kind.is_connector().then(|| {
            let (start, end) = match kind {
                ShapeKind::HorizontalLine => (
                    Point::new(rect.left(), rect.center().y),
                    Point::new(rect.right(), rect.center().y),
                ),
                ShapeKind::VerticalLine => (
                    Point::new(rect.center().x, rect.top()),
                    Point::new(rect.center().x, rect.bottom()),
                ),
                _ => (rect.top_left(), Point::new(rect.right(), rect.bottom())),
            };
            ConnectorEnds {
                start,
                end,
                ..ConnectorEnds::default()
            }
        });
        let mut shape = Self {
            id: ShapeId::fresh(kind.tag()),
            kind,
            rect,
            style: Style::default(),
            text: String::new(),
            ends,
            parent: None,
            children: Vec::new(),
            connections: Vec::new(),
            selected: false,
            show_anchors: false,
            show_connection_points: false,
            path: ShapePath::default(),
        };
        shape.update_path();
        shape
    }

    /// Create a point-defined connector running from `start` to `end`.
    pub fn connector(kind: ShapeKind, start: Point, end: Point) -> Self {
        let mut shape = Shape::new(kind, Rect::from_corners(start, end));
        if let Some(ends) = shape.ends.as_mut() {
            ends.start = start;
            ends.end = end;
        }
        shape.recalc_rect();
        shape.update_path();
        shape
    }

    pub fn with_id(mut self, id: ShapeId) -> Self {
        self.id = id;
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_caps(mut self, start_cap: LineCap, end_cap: LineCap) -> Self {
        if let Some(ends) = self.ends.as_mut() {
            ends.start_cap = start_cap;
            ends.end_cap = end_cap;
        }
        self.update_path();
        self
    }

    pub fn is_connector(&self) -> bool {
        self.kind.is_connector()
    }

    pub fn is_group(&self) -> bool {
        !self.children.is_empty()
    }

    /// Start and end points, for connectors.
    pub fn endpoints(&self) -> Option<(Point, Point)> {
        self.ends.map(|e| (e.start, e.end))
    }

    /// Duplicate styling and geometry under a new id. Identity, connections,
    /// endpoint attachments, grouping and selection state are not copied.
    pub fn clone_fresh(&self) -> Shape {
        let mut copy = self.clone();
        copy.id = ShapeId::fresh(self.kind.tag());
        copy.connections.clear();
        copy.parent = None;
        copy.children.clear();
        copy.selected = false;
        copy.show_anchors = false;
        copy.show_connection_points = false;
        if let Some(ends) = copy.ends.as_mut() {
            ends.start_shape = None;
            ends.end_shape = None;
        }
        copy
    }

    // ─── Geometry mutation ──────────────────────────────────────────────

    /// Translate the shape (not its group children) and rebuild its path.
    pub fn translate(&mut self, d: Delta) {
        self.rect = self.rect.translate(d);
        if self.kind.is_point_connector()
            && let Some(ends) = self.ends.as_mut()
        {
            ends.start += d;
            ends.end += d;
        }
        self.update_path();
    }

    /// Replace the bounding rectangle. Point connectors carry their endpoints
    /// along with the rectangle's origin.
    pub fn set_rect(&mut self, rect: Rect) {
        if self.kind.is_point_connector() {
            let shift = rect.top_left() - self.rect.top_left();
            if let Some(ends) = self.ends.as_mut() {
                ends.start += shift;
                ends.end += shift;
            }
            self.recalc_rect();
        } else {
            self.rect = rect;
        }
        self.update_path();
    }

    /// Move one endpoint of a point connector by `d`.
    pub fn move_endpoint(&mut self, grip: GripType, d: Delta) {
        if let Some(ends) = self.ends.as_mut() {
            if grip.is_start_side() {
                ends.start += d;
            } else {
                ends.end += d;
            }
        }
        self.recalc_rect();
        self.update_path();
    }

    /// Place one endpoint of a point connector at `p`.
    pub fn set_endpoint(&mut self, grip: GripType, p: Point) {
        if let Some(ends) = self.ends.as_mut() {
            if grip.is_start_side() {
                ends.start = p;
            } else {
                ends.end = p;
            }
        }
        self.recalc_rect();
        self.update_path();
    }

    /// Track a connected shape that moved by `d`. Lines move as a whole,
    /// point connectors move only the attached endpoint.
    pub fn follow_translation(&mut self, grip: GripType, d: Delta) {
        if self.kind.is_line() {
            self.translate(d);
        } else if self.kind.is_point_connector() {
            self.move_endpoint(grip, d);
        }
    }

    /// Track a connected shape that was resized: pin the endpoint addressed
    /// by `grip` onto `target`. Lines keep their length and re-center on the
    /// target across their thickness.
    pub fn follow_point(&mut self, grip: GripType, target: Point) {
        match self.kind {
            ShapeKind::HorizontalLine => {
                let x = if grip.is_start_side() {
                    target.x
                } else {
                    target.x - self.rect.width
                };
                let r = Rect::new(x, target.y - self.rect.height / 2, self.rect.width, self.rect.height);
                self.set_rect(r);
            }
            ShapeKind::VerticalLine => {
                let y = if grip.is_start_side() {
                    target.y
                } else {
                    target.y - self.rect.height
                };
                let r = Rect::new(target.x - self.rect.width / 2, y, self.rect.width, self.rect.height);
                self.set_rect(r);
            }
            kind if kind.is_point_connector() => self.set_endpoint(grip, target),
            _ => {}
        }
    }

    /// Point connectors: bounding box of the two endpoints.
    fn recalc_rect(&mut self) {
        if self.kind.is_point_connector()
            && let Some(ends) = self.ends
            && let Some(r) = Rect::bounding(&[ends.start, ends.end])
        {
            self.rect = r;
        }
    }

    /// Rebuild the render geometry from the rectangle (and endpoints).
    /// Lines also re-derive their endpoints here.
    pub fn update_path(&mut self) {
        if let Some(ends) = self.ends.as_mut() {
            match self.kind {
                ShapeKind::HorizontalLine => {
                    let cy = self.rect.center().y;
                    ends.start = Point::new(self.rect.left(), cy);
                    ends.end = Point::new(self.rect.right(), cy);
                }
                ShapeKind::VerticalLine => {
                    let cx = self.rect.center().x;
                    ends.start = Point::new(cx, self.rect.top());
                    ends.end = Point::new(cx, self.rect.bottom());
                }
                _ => {}
            }
        }
        self.path = crate::path::build(self);
    }

    /// Redraw extent: the bounding rectangle grown by the pen, plus the
    /// connection-point marker size for shapes or the anchor (and cap) size
    /// for connectors.
    pub fn update_rect(&self, config: &EngineConfig) -> Rect {
        let pen = self.style.stroke_width.max(0);
        match self.ends {
            Some(ends) => {
                let caps = if ends.has_caps() { config.cap_size } else { 0 };
                self.rect.grow_uniform(config.anchor_size + 1 + pen + caps)
            }
            None => self.rect.grow_uniform(pen + config.connection_point_size),
        }
    }
}

//! Serializable snapshots of canvas content.
//!
//! A snapshot stores shapes in z-order with every link (connections,
//! connector back-references, group parent/children) expressed as a
//! `ShapeId`. Loading resolves links by id lookup since shapes are
//! recreated, never shared.

use crate::elements::Elements;
use crate::error::CanvasError;
use crate::id::ShapeId;
use crate::model::Shape;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Topmost first.
    pub shapes: Vec<Shape>,
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

impl Snapshot {
    /// Capture `ids` and their group descendants, in z-order.
    pub fn capture(elements: &Elements, ids: &[ShapeId]) -> Self {
        let wanted: Vec<ShapeId> = ids.iter().flat_map(|&id| elements.with_descendants(id)).collect();
        let shapes = elements
            .sorted_by_z(wanted)
            .into_iter()
            .filter_map(|id| elements.get(id).cloned())
            .map(|mut s| {
                s.selected = false;
                s.show_anchors = false;
                s.show_connection_points = false;
                s
            })
            .collect();
        Self {
            version: SNAPSHOT_VERSION,
            shapes,
        }
    }

    /// Capture the whole canvas.
    pub fn of_all(elements: &Elements) -> Self {
        Self::capture(elements, elements.ids())
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ShapeId> + '_ {
        self.shapes.iter().map(|s| s.id)
    }

    // ─── Encoding ───────────────────────────────────────────────────────

    pub fn to_json(&self) -> Result<String, CanvasError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, CanvasError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, CanvasError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, CanvasError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    // ─── Loading ────────────────────────────────────────────────────────

    /// Recreate the shapes under fresh ids. Links between captured shapes
    /// are remapped; links to shapes outside the snapshot are dropped.
    pub fn instantiate(&self) -> Vec<Shape> {
        let remap: HashMap<ShapeId, ShapeId> = self
            .shapes
            .iter()
            .map(|s| (s.id, ShapeId::fresh(s.kind.tag())))
            .collect();
        let lookup = |id: ShapeId| remap.get(&id).copied();

        self.shapes
            .iter()
            .filter_map(|s| {
                let mut copy = s.clone();
                copy.id = lookup(s.id)?;
                copy.parent = s.parent.and_then(lookup);
                copy.children = s.children.iter().filter_map(|&c| lookup(c)).collect();
                copy.connections = s
                    .connections
                    .iter()
                    .filter_map(|c| {
                        let mut c = *c;
                        c.to_element = lookup(c.to_element)?;
                        Some(c)
                    })
                    .collect();
                if let Some(ends) = copy.ends.as_mut() {
                    ends.start_shape = ends.start_shape.and_then(lookup);
                    ends.end_shape = ends.end_shape.and_then(lookup);
                }
                copy.selected = false;
                copy.update_path();
                Some(copy)
            })
            .collect()
    }

    /// Rebuild an element collection keeping the stored ids. Fails when the
    /// snapshot's links are inconsistent.
    pub fn restore(&self) -> Result<Elements, CanvasError> {
        let mut elements = Elements::new();
        for shape in &self.shapes {
            let mut shape = shape.clone();
            shape.update_path();
            elements.insert_at(usize::MAX, shape)?;
        }
        elements.validate()?;
        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Rect};
    use crate::model::{ConnectionPoint, GripType, ShapeKind};
    use pretty_assertions::assert_eq;

    fn document() -> (Elements, ShapeId, ShapeId, ShapeId) {
        let mut els = Elements::new();
        let a = Shape::new(ShapeKind::Ellipse, Rect::new(0, 0, 40, 40)).with_text("start");
        let b = Shape::new(ShapeKind::Box, Rect::new(200, 0, 40, 40));
        let c = Shape::connector(ShapeKind::DynamicConnectorLr, Point::new(40, 20), Point::new(200, 20));
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        els.insert(a).unwrap();
        els.insert(b).unwrap();
        els.insert(c).unwrap();
        els.connect(
            c_id,
            ConnectionPoint::new(GripType::Start, Point::new(40, 20)),
            a_id,
            ConnectionPoint::new(GripType::RightMiddle, Point::new(40, 20)),
        )
        .unwrap();
        els.connect(
            c_id,
            ConnectionPoint::new(GripType::End, Point::new(200, 20)),
            b_id,
            ConnectionPoint::new(GripType::LeftMiddle, Point::new(200, 20)),
        )
        .unwrap();
        (els, a_id, b_id, c_id)
    }

    #[test]
    fn restore_keeps_ids_and_links() {
        let (els, a, _, c) = document();
        let snap = Snapshot::of_all(&els);
        let json = snap.to_json().unwrap();
        let back = Snapshot::from_json(&json).unwrap().restore().unwrap();
        assert_eq!(back.ids(), els.ids());
        assert_eq!(back.get(a).unwrap().connections[0].to_element, c);
        assert_eq!(back.get(a).unwrap().text, "start");
        // Derived geometry is rebuilt on load.
        assert_eq!(back.get(c).unwrap().path.segments.len(), 3);
    }

    #[test]
    fn msgpack_matches_json_content() {
        let (els, ..) = document();
        let snap = Snapshot::of_all(&els);
        let bytes = snap.to_msgpack().unwrap();
        let back = Snapshot::from_msgpack(&bytes).unwrap();
        assert_eq!(back.to_json().unwrap(), snap.to_json().unwrap());
    }

    #[test]
    fn instantiate_remaps_internal_links() {
        let (els, ..) = document();
        let shapes = Snapshot::of_all(&els).instantiate();
        let mut copy = Elements::new();
        for s in shapes {
            assert!(!els.contains(s.id));
            copy.insert_at(usize::MAX, s).unwrap();
        }
        copy.validate().unwrap();
        let connector = copy.iter().find(|s| s.is_connector()).unwrap();
        let ends = connector.ends.unwrap();
        assert!(ends.start_shape.is_some_and(|id| copy.contains(id)));
        assert!(ends.end_shape.is_some_and(|id| copy.contains(id)));
    }

    #[test]
    fn instantiate_drops_links_leaving_the_snapshot() {
        let (els, a, _, c) = document();
        let shapes = Snapshot::capture(&els, &[a, c]).instantiate();
        assert_eq!(shapes.len(), 2);
        let connector = shapes.iter().find(|s| s.is_connector()).unwrap();
        let ends = connector.ends.unwrap();
        assert!(ends.start_shape.is_some());
        assert_eq!(ends.end_shape, None);
    }

    #[test]
    fn restore_rejects_dangling_links() {
        let (els, a, _, _) = document();
        let snap = Snapshot::capture(&els, &[a]);
        assert!(matches!(snap.restore(), Err(CanvasError::DanglingConnection { .. })));
    }
}

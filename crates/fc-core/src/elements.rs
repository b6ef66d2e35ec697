//! The element collection: shapes keyed by id plus their z-order.
//!
//! Index 0 of the z-order is the topmost shape. Group children stay in the
//! collection alongside their group box; only the parent/child links tie
//! them together.
//!
//! All attach/detach operations go through this type so that a shape's
//! `Connection` list and the connector's endpoint back-reference change
//! together.

use crate::error::CanvasError;
use crate::geometry::Delta;
use crate::id::ShapeId;
use crate::model::{Connection, ConnectionPoint, GripType, Shape};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct Elements {
    shapes: HashMap<ShapeId, Shape>,
    order: Vec<ShapeId>,
}

impl Elements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.shapes.contains_key(&id)
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    pub fn get_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes.get_mut(&id)
    }

    pub fn shape(&self, id: ShapeId) -> Result<&Shape, CanvasError> {
        self.shapes.get(&id).ok_or(CanvasError::UnknownShape(id))
    }

    pub fn shape_mut(&mut self, id: ShapeId) -> Result<&mut Shape, CanvasError> {
        self.shapes.get_mut(&id).ok_or(CanvasError::UnknownShape(id))
    }

    /// Ids in z-order, topmost first.
    pub fn ids(&self) -> &[ShapeId] {
        &self.order
    }

    /// Shapes in z-order, topmost first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Shape> + '_ {
        self.order.iter().filter_map(|id| self.shapes.get(id))
    }

    pub fn index_of(&self, id: ShapeId) -> Option<usize> {
        self.order.iter().position(|&o| o == id)
    }

    /// Sort `ids` by z-order (topmost first), dropping unknown ids and
    /// duplicates.
    pub fn sorted_by_z(&self, ids: impl IntoIterator<Item = ShapeId>) -> Vec<ShapeId> {
        let mut keyed: Vec<(usize, ShapeId)> = ids
            .into_iter()
            .filter_map(|id| self.index_of(id).map(|i| (i, id)))
            .collect();
        keyed.sort_by_key(|(i, _)| *i);
        keyed.dedup_by_key(|(i, _)| *i);
        keyed.into_iter().map(|(_, id)| id).collect()
    }

    // ─── Membership ─────────────────────────────────────────────────────

    /// Insert on top of the z-order.
    pub fn insert(&mut self, shape: Shape) -> Result<(), CanvasError> {
        self.insert_at(0, shape)
    }

    /// Insert at z-index `index` (clamped to the collection size).
    pub fn insert_at(&mut self, index: usize, shape: Shape) -> Result<(), CanvasError> {
        if self.shapes.contains_key(&shape.id) {
            return Err(CanvasError::DuplicateShape(shape.id));
        }
        let index = index.min(self.order.len());
        self.order.insert(index, shape.id);
        self.shapes.insert(shape.id, shape);
        Ok(())
    }

    /// Remove a shape without touching its links. Returns its former z-index.
    pub fn remove(&mut self, id: ShapeId) -> Option<(usize, Shape)> {
        let index = self.index_of(id)?;
        self.order.remove(index);
        self.shapes.remove(&id).map(|s| (index, s))
    }

    // ─── Z-order ────────────────────────────────────────────────────────

    /// Move `id` to z-index `index`, preserving the relative order of
    /// everything else.
    pub fn move_to_index(&mut self, id: ShapeId, index: usize) -> bool {
        let Some(from) = self.index_of(id) else {
            return false;
        };
        self.order.remove(from);
        let index = index.min(self.order.len());
        self.order.insert(index, id);
        true
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        if a < self.order.len() && b < self.order.len() {
            self.order.swap(a, b);
        }
    }

    // ─── Connections ────────────────────────────────────────────────────

    /// Pin `connector`'s endpoint `connector_point` onto `target`'s
    /// `target_point`. Any previous attachment of that endpoint is released
    /// first.
    pub fn connect(
        &mut self,
        connector: ShapeId,
        connector_point: ConnectionPoint,
        target: ShapeId,
        target_point: ConnectionPoint,
    ) -> Result<(), CanvasError> {
        if !self.shape(connector)?.is_connector() {
            return Err(CanvasError::NotAConnector(connector));
        }
        self.shape(target)?;
        self.disconnect(connector, connector_point.grip);

        self.shape_mut(target)?.connections.push(Connection {
            to_element: connector,
            to_connection_point: connector_point,
            element_connection_point: target_point,
        });
        if let Some(ends) = self.shape_mut(connector)?.ends.as_mut() {
            ends.set_shape_at(connector_point.grip, Some(target));
        }
        log::debug!("connect {connector} {:?} -> {target} {:?}", connector_point.grip, target_point.grip);
        Ok(())
    }

    /// Release the endpoint of `connector` addressed by `grip`. Returns the
    /// shape it was pinned to, if any.
    pub fn disconnect(&mut self, connector: ShapeId, grip: GripType) -> Option<ShapeId> {
        let start_side = grip.is_start_side();
        let target = self
            .shapes
            .get_mut(&connector)?
            .ends
            .as_mut()
            .and_then(|ends| {
                let previous = ends.shape_at(grip);
                ends.set_shape_at(grip, None);
                previous
            })?;
        if let Some(t) = self.shapes.get_mut(&target) {
            t.connections.retain(|c| {
                !(c.to_element == connector && c.to_connection_point.grip.is_start_side() == start_side)
            });
        }
        log::debug!("disconnect {connector} {grip:?} from {target}");
        Some(target)
    }

    /// Break every attachment involving `id`, on both sides.
    pub fn detach_all(&mut self, id: ShapeId) {
        self.disconnect(id, GripType::Start);
        self.disconnect(id, GripType::End);
        let Some(shape) = self.shapes.get_mut(&id) else {
            return;
        };
        let connections = std::mem::take(&mut shape.connections);
        for c in connections {
            if let Some(ends) = self.shapes.get_mut(&c.to_element).and_then(|s| s.ends.as_mut())
                && ends.shape_at(c.to_connection_point.grip) == Some(id)
            {
                ends.set_shape_at(c.to_connection_point.grip, None);
            }
        }
    }

    /// Restore a connection record captured earlier (undo of delete, paste).
    /// Both sides are re-established.
    pub fn restore_connection(&mut self, target: ShapeId, connection: Connection) -> Result<(), CanvasError> {
        self.connect(
            connection.to_element,
            connection.to_connection_point,
            target,
            connection.element_connection_point,
        )
    }

    // ─── Groups ─────────────────────────────────────────────────────────

    /// Make `children` members of `group`.
    pub fn adopt(&mut self, group: ShapeId, children: &[ShapeId]) -> Result<(), CanvasError> {
        self.shape(group)?;
        for &child in children {
            self.shape_mut(child)?.parent = Some(group);
        }
        let g = self.shape_mut(group)?;
        for &child in children {
            if !g.children.contains(&child) {
                g.children.push(child);
            }
        }
        Ok(())
    }

    /// Detach all children of `group`; returns them.
    pub fn release_children(&mut self, group: ShapeId) -> Vec<ShapeId> {
        let children = self
            .shapes
            .get_mut(&group)
            .map(|g| std::mem::take(&mut g.children))
            .unwrap_or_default();
        for child in &children {
            if let Some(c) = self.shapes.get_mut(child) {
                c.parent = None;
            }
        }
        children
    }

    /// Remove `child` from its group, if it has one.
    pub fn orphan(&mut self, child: ShapeId) -> Option<ShapeId> {
        let parent = self.shapes.get_mut(&child)?.parent.take()?;
        if let Some(p) = self.shapes.get_mut(&parent) {
            p.children.retain(|&c| c != child);
        }
        Some(parent)
    }

    /// `id` plus every descendant through group links.
    pub fn with_descendants(&self, id: ShapeId) -> Vec<ShapeId> {
        let mut out = vec![id];
        let mut i = 0;
        while i < out.len() {
            if let Some(s) = self.shapes.get(&out[i]) {
                for &c in &s.children {
                    if !out.contains(&c) {
                        out.push(c);
                    }
                }
            }
            i += 1;
        }
        out
    }

    // ─── Motion ─────────────────────────────────────────────────────────

    /// Translate `id` and, recursively, its group children. When
    /// `follow_connections` is set, connectors attached to the moved
    /// children track them. Returns every shape whose geometry changed.
    ///
    /// Connectors attached to `id` itself are left to the caller, which
    /// decides whether they follow (drag) or not (pan).
    pub fn translate(&mut self, id: ShapeId, d: Delta, follow_connections: bool) -> Vec<ShapeId> {
        let mut moved = Vec::new();
        self.translate_into(id, d, follow_connections, true, &mut moved);
        moved
    }

    fn translate_into(
        &mut self,
        id: ShapeId,
        d: Delta,
        follow_connections: bool,
        is_root: bool,
        moved: &mut Vec<ShapeId>,
    ) {
        let Some(shape) = self.shapes.get_mut(&id) else {
            return;
        };
        shape.translate(d);
        moved.push(id);
        let children = shape.children.clone();
        let connections = shape.connections.clone();

        if follow_connections && !is_root {
            for c in connections {
                let free = self.get(c.to_element).is_some_and(|s| s.parent.is_none());
                if free && !moved.contains(&c.to_element) {
                    self.follow(c.to_element, c.to_connection_point.grip, d);
                    moved.push(c.to_element);
                }
            }
        }
        for child in children {
            if !moved.contains(&child) {
                self.translate_into(child, d, follow_connections, false, moved);
            }
        }
    }

    /// Make connector `connector` track a shape that moved by `d`.
    pub fn follow(&mut self, connector: ShapeId, grip: GripType, d: Delta) {
        if let Some(c) = self.shapes.get_mut(&connector) {
            c.follow_translation(grip, d);
        }
    }

    // ─── Invariants ─────────────────────────────────────────────────────

    /// Check connection symmetry and group link consistency.
    pub fn validate(&self) -> Result<(), CanvasError> {
        for shape in self.iter() {
            for c in &shape.connections {
                let connector = self.get(c.to_element).ok_or(CanvasError::DanglingConnection {
                    owner: shape.id,
                    missing: c.to_element,
                })?;
                let back = connector.ends.and_then(|e| e.shape_at(c.to_connection_point.grip));
                if back != Some(shape.id) {
                    return Err(CanvasError::OneSidedConnection {
                        shape: shape.id,
                        connector: c.to_element,
                    });
                }
            }
            if let Some(ends) = shape.ends {
                for (grip, target) in [(GripType::Start, ends.start_shape), (GripType::End, ends.end_shape)] {
                    let Some(target) = target else { continue };
                    let t = self.get(target).ok_or(CanvasError::DanglingConnection {
                        owner: shape.id,
                        missing: target,
                    })?;
                    let listed = t.connections.iter().any(|c| {
                        c.to_element == shape.id && c.to_connection_point.grip.is_start_side() == grip.is_start_side()
                    });
                    if !listed {
                        return Err(CanvasError::OneSidedConnection {
                            shape: target,
                            connector: shape.id,
                        });
                    }
                }
            }
            for &child in &shape.children {
                if self.get(child).and_then(|c| c.parent) != Some(shape.id) {
                    return Err(CanvasError::BrokenGroup {
                        parent: shape.id,
                        child,
                    });
                }
            }
            if let Some(parent) = shape.parent
                && !self.get(parent).is_some_and(|p| p.children.contains(&shape.id))
            {
                return Err(CanvasError::BrokenGroup {
                    parent,
                    child: shape.id,
                });
            }
        }
        Ok(())
    }

    /// Fail fast in development builds when links are out of step.
    pub fn debug_validate(&self) {
        debug_assert!(
            self.validate().is_ok(),
            "element collection invariant violated: {:?}",
            self.validate()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Rect};
    use crate::model::ShapeKind;
    use pretty_assertions::assert_eq;

    fn boxed(name: &str, x: i32, y: i32) -> Shape {
        Shape::new(ShapeKind::Box, Rect::new(x, y, 40, 40)).with_id(ShapeId::named(name))
    }

    fn wired() -> (Elements, ShapeId, ShapeId, ShapeId) {
        let mut els = Elements::new();
        let a = boxed("el_a", 0, 0);
        let b = boxed("el_b", 200, 0);
        let c = Shape::connector(ShapeKind::DiagonalConnector, Point::new(40, 20), Point::new(200, 20))
            .with_id(ShapeId::named("el_c"));
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
    fn insert_goes_on_top() {
        let mut els = Elements::new();
        let a = boxed("top_a", 0, 0);
        let b = boxed("top_b", 0, 0);
        let (a_id, b_id) = (a.id, b.id);
        els.insert(a).unwrap();
        els.insert(b).unwrap();
        assert_eq!(els.ids(), &[b_id, a_id]);
        assert!(matches!(els.insert(boxed("top_a", 0, 0)), Err(CanvasError::DuplicateShape(_))));
    }

    #[test]
    fn connect_sets_both_sides() {
        let (els, a, b, c) = wired();
        els.validate().unwrap();
        let ends = els.get(c).unwrap().ends.unwrap();
        assert_eq!(ends.start_shape, Some(a));
        assert_eq!(ends.end_shape, Some(b));
        assert_eq!(els.get(a).unwrap().connections[0].to_element, c);
    }

    #[test]
    fn disconnect_clears_both_sides() {
        let (mut els, a, _, c) = wired();
        assert_eq!(els.disconnect(c, GripType::Start), Some(a));
        assert!(els.get(a).unwrap().connections.is_empty());
        assert_eq!(els.get(c).unwrap().ends.unwrap().start_shape, None);
        els.validate().unwrap();
        assert_eq!(els.disconnect(c, GripType::Start), None);
    }

    #[test]
    fn detach_all_from_shape_side() {
        let (mut els, _, b, c) = wired();
        els.detach_all(b);
        assert_eq!(els.get(c).unwrap().ends.unwrap().end_shape, None);
        assert!(els.get(b).unwrap().connections.is_empty());
        els.validate().unwrap();
    }

    #[test]
    fn one_sided_connection_is_reported() {
        let (mut els, a, _, c) = wired();
        els.get_mut(c).unwrap().ends.as_mut().unwrap().start_shape = None;
        assert!(matches!(
            els.validate(),
            Err(CanvasError::OneSidedConnection { shape, connector }) if shape == a && connector == c
        ));
    }

    #[test]
    fn non_connector_cannot_be_connected() {
        let (mut els, a, b, _) = wired();
        let cp = ConnectionPoint::new(GripType::Start, Point::new(0, 0));
        assert!(matches!(els.connect(a, cp, b, cp), Err(CanvasError::NotAConnector(_))));
    }

    #[test]
    fn move_to_index_keeps_relative_order() {
        let mut els = Elements::new();
        let ids: Vec<ShapeId> = (0..4)
            .map(|i| {
                let s = boxed(&format!("z_{i}"), 0, 0);
                let id = s.id;
                els.insert_at(usize::MAX, s).unwrap();
                id
            })
            .collect();
        els.move_to_index(ids[3], 0);
        assert_eq!(els.ids(), &[ids[3], ids[0], ids[1], ids[2]]);
        assert_eq!(els.sorted_by_z([ids[2], ids[3], ids[2]]), vec![ids[3], ids[2]]);
    }

    #[test]
    fn group_translate_moves_children_and_their_connectors() {
        let (mut els, a, _, c) = wired();
        let group = Shape::new(ShapeKind::GroupBox, Rect::new(-5, -5, 50, 50)).with_id(ShapeId::named("el_g"));
        let g = group.id;
        els.insert_at(usize::MAX, group).unwrap();
        els.adopt(g, &[a]).unwrap();
        els.validate().unwrap();

        let moved = els.translate(g, Delta::new(5, 5), true);
        assert_eq!(moved, vec![g, a, c]);
        assert_eq!(els.get(a).unwrap().rect, Rect::new(5, 5, 40, 40));
        assert_eq!(els.get(c).unwrap().endpoints(), Some((Point::new(45, 25), Point::new(200, 20))));

        let moved = els.translate(g, Delta::new(-5, -5), false);
        assert_eq!(moved, vec![g, a]);
    }

    #[test]
    fn release_children_clears_parent_links() {
        let (mut els, a, b, _) = wired();
        let group = Shape::new(ShapeKind::GroupBox, Rect::new(0, 0, 300, 60)).with_id(ShapeId::named("el_g2"));
        let g = group.id;
        els.insert(group).unwrap();
        els.adopt(g, &[a, b]).unwrap();
        assert_eq!(els.with_descendants(g), vec![g, a, b]);
        assert_eq!(els.release_children(g), vec![a, b]);
        assert_eq!(els.get(a).unwrap().parent, None);
        els.validate().unwrap();
    }
}

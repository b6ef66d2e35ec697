//! Canvas controller: the element collection, the selection, and the
//! renderer behind one owner.
//!
//! Every operation that changes what is drawn goes through the renderer's
//! erase → mutate → draw cycle, so callers never repaint by hand. Outward
//! notifications are queued as `CanvasEvent`s and drained by the host.

use crate::commands::UndoContext;
use crate::input::MouseButtons;
use fc_core::anchor::{adjusted_delta, connection_points, resize, resize_line};
use fc_core::config::EngineConfig;
use fc_core::elements::Elements;
use fc_core::error::CanvasError;
use fc_core::geometry::{Delta, Point, Rect};
use fc_core::id::ShapeId;
use fc_core::model::{Anchor, Connection, ConnectionPoint, Cursor, GripType, Shape, ShapeKind, Style};
use fc_render::Renderer;
use fc_render::surface::Surface;
use std::collections::VecDeque;

/// Notifications for collaborators (property panel, text editor, menus).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasEvent {
    ElementSelected(ShapeId),
    /// A live drag or resize tick changed a selected element.
    SelectedElementUpdated(ShapeId),
    EditText(Option<ShapeId>),
    RightClick(Option<ShapeId>),
    MouseClick { position: Point, buttons: MouseButtons },
    CursorChanged(Cursor),
    /// An undo-stack pass (do, undo or redo) completed.
    AfterAction(String),
}

/// Everything needed to put deleted shapes back: their z-indices, their
/// state, and every connection record that touched them.
#[derive(Debug, Clone, Default)]
pub struct Removed {
    entries: Vec<(usize, Shape)>,
    connections: Vec<(ShapeId, Connection)>,
}

impl Removed {
    pub fn ids(&self) -> Vec<ShapeId> {
        self.entries.iter().map(|(_, s)| s.id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct CanvasController {
    elements: Elements,
    renderer: Renderer,
    selected: Vec<ShapeId>,
    config: EngineConfig,
    cursor: Cursor,
    events: VecDeque<CanvasEvent>,
}

impl CanvasController {
    pub fn new(config: EngineConfig) -> Result<Self, CanvasError> {
        Self::with_elements(Elements::new(), config)
    }

    pub fn with_elements(mut elements: Elements, config: EngineConfig) -> Result<Self, CanvasError> {
        elements.validate()?;
        let mut renderer = Renderer::new(&config)?;
        renderer.draw_all(&elements, &config);
        Ok(Self {
            elements,
            renderer,
            selected: Vec::new(),
            config,
            cursor: Cursor::Arrow,
            events: VecDeque::new(),
        })
    }

    // ─── Accessors ──────────────────────────────────────────────────────

    pub fn elements(&self) -> &Elements {
        &self.elements
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn surface(&self) -> &Surface {
        self.renderer.surface()
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn selected_elements(&self) -> &[ShapeId] {
        &self.selected
    }

    pub fn is_selected(&self, id: ShapeId) -> bool {
        self.selected.contains(&id)
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: Cursor) {
        if self.cursor != cursor {
            self.cursor = cursor;
            self.emit(CanvasEvent::CursorChanged(cursor));
        }
    }

    pub fn emit(&mut self, event: CanvasEvent) {
        self.events.push_back(event);
    }

    pub fn drain_events(&mut self) -> Vec<CanvasEvent> {
        self.events.drain(..).collect()
    }

    /// Whether `id`'s update rectangle touches the visible surface.
    pub fn is_on_screen(&self, id: ShapeId) -> bool {
        self.elements
            .get(id)
            .is_some_and(|s| self.renderer.surface().on_screen(s.update_rect(&self.config)))
    }

    /// Union of every shape's rectangle.
    pub fn extents(&self) -> Option<Rect> {
        self.elements.iter().map(|s| s.rect).reduce(|a, b| a.union(&b))
    }

    /// Replace the whole collection (document load) and repaint.
    pub fn load(&mut self, elements: Elements) -> Result<(), CanvasError> {
        elements.validate()?;
        self.elements = elements;
        self.selected.clear();
        self.renderer.draw_all(&self.elements, &self.config);
        Ok(())
    }

    pub fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), CanvasError> {
        self.config.surface.width = width;
        self.config.surface.height = height;
        self.renderer.resize(width, height, &self.elements, &self.config)
    }

    // ─── Redraw ─────────────────────────────────────────────────────────

    fn paint<R>(&mut self, seeds: &[ShapeId], delta: Delta, change: impl FnOnce(&mut Elements) -> R) -> R {
        self.renderer
            .redraw_with(&mut self.elements, seeds, delta, &self.config, change)
    }

    pub fn redraw(&mut self, id: ShapeId) {
        self.redraw_grown(id, 0, 0);
    }

    /// Redraw `id` with its update rectangle grown by (`dx`, `dy`).
    pub fn redraw_grown(&mut self, id: ShapeId, dx: i32, dy: i32) {
        self.renderer
            .redraw(&mut self.elements, &[id], Delta::new(dx, dy), &self.config);
    }

    /// Erase `id`, apply `after_erase` to it, then draw it again.
    pub fn redraw_with(&mut self, id: ShapeId, after_erase: impl FnOnce(&mut Shape)) {
        self.paint(&[id], Delta::ZERO, |els| {
            if let Some(shape) = els.get_mut(id) {
                after_erase(shape);
                shape.update_path();
            }
        });
    }

    pub fn redraw_all(&mut self) {
        self.renderer.draw_all(&self.elements, &self.config);
    }

    // ─── Insert / delete ────────────────────────────────────────────────

    /// Add `shape` on top of the z-order.
    pub fn insert(&mut self, mut shape: Shape) -> Result<ShapeId, CanvasError> {
        let id = shape.id;
        shape.update_path();
        self.paint(&[id], Delta::ZERO, |els| els.insert(shape))?;
        log::debug!("insert {id}");
        Ok(id)
    }

    /// Add several shapes above everything else, keeping their relative
    /// order (`shapes` is topmost first). Links between them are kept.
    pub fn insert_shapes(&mut self, shapes: Vec<Shape>) -> Result<Vec<ShapeId>, CanvasError> {
        let ids: Vec<ShapeId> = shapes.iter().map(|s| s.id).collect();
        self.paint(&ids, Delta::ZERO, |els| {
            for mut shape in shapes.into_iter().rev() {
                shape.update_path();
                els.insert(shape)?;
            }
            Ok::<(), CanvasError>(())
        })?;
        self.elements.debug_validate();
        Ok(ids)
    }

    pub fn delete_element(&mut self, id: ShapeId) -> Removed {
        self.delete_elements(&[id])
    }

    /// Remove `ids`. Connections are detached first; group members of a
    /// deleted group stay on the canvas as free shapes.
    pub fn delete_elements(&mut self, ids: &[ShapeId]) -> Removed {
        let removed = self.capture_removal(ids);
        let ids = removed.ids();
        self.selected.retain(|s| !ids.contains(s));
        self.paint(&ids, Delta::ZERO, |els| {
            for &id in &ids {
                els.release_children(id);
                els.orphan(id);
                els.detach_all(id);
                els.remove(id);
            }
        });
        log::debug!("delete {ids:?}");
        self.elements.debug_validate();
        removed
    }

    /// What `delete_elements(ids)` would take away, captured before any
    /// mutation so an undo can rebuild it.
    pub fn capture_removal(&self, ids: &[ShapeId]) -> Removed {
        let ids = self.elements.sorted_by_z(ids.iter().copied());
        let entries = ids
            .iter()
            .filter_map(|&id| {
                let index = self.elements.index_of(id)?;
                let mut shape = self.elements.get(id)?.clone();
                shape.selected = false;
                shape.show_anchors = false;
                shape.show_connection_points = false;
                Some((index, shape))
            })
            .collect();
        let connections = self
            .elements
            .iter()
            .flat_map(|s| s.connections.iter().map(move |c| (s.id, c.clone())))
            .filter(|(owner, c)| ids.contains(owner) || ids.contains(&c.to_element))
            .collect();
        Removed { entries, connections }
    }

    /// Put back shapes removed by `delete_elements`, at their old z-indices,
    /// with their group links and connections.
    pub fn restore_removed(&mut self, removed: &Removed) -> Result<(), CanvasError> {
        let ids = removed.ids();
        let mut entries = removed.entries.clone();
        entries.sort_by_key(|(index, _)| *index);

        self.paint(&ids, Delta::ZERO, |els| {
            for (index, shape) in &entries {
                let mut shape = shape.clone();
                shape.connections.clear();
                shape.parent = None;
                shape.children.clear();
                if let Some(ends) = shape.ends.as_mut() {
                    ends.start_shape = None;
                    ends.end_shape = None;
                }
                shape.update_path();
                els.insert_at(*index, shape)?;
            }
            for (_, shape) in &entries {
                if let Some(parent) = shape.parent.filter(|p| els.contains(*p)) {
                    els.adopt(parent, &[shape.id])?;
                }
                let children: Vec<ShapeId> = shape.children.iter().copied().filter(|c| els.contains(*c)).collect();
                if !children.is_empty() {
                    els.adopt(shape.id, &children)?;
                }
            }
            for (target, connection) in &removed.connections {
                if els.contains(*target) && els.contains(connection.to_element) {
                    els.restore_connection(*target, connection.clone())?;
                }
            }
            Ok::<(), CanvasError>(())
        })?;
        log::debug!("restore {ids:?}");
        self.elements.debug_validate();
        Ok(())
    }

    // ─── Selection ──────────────────────────────────────────────────────

    /// Add `id` to the selection.
    pub fn select_element(&mut self, id: ShapeId) {
        if !self.elements.contains(id) || self.selected.contains(&id) {
            return;
        }
        self.selected.push(id);
        self.redraw_with(id, |s| s.selected = true);
        self.emit(CanvasEvent::ElementSelected(id));
    }

    pub fn select_elements(&mut self, ids: &[ShapeId]) {
        for &id in ids {
            self.select_element(id);
        }
    }

    pub fn deselect_element(&mut self, id: ShapeId) {
        let Some(index) = self.selected.iter().position(|&s| s == id) else {
            return;
        };
        self.selected.remove(index);
        self.redraw_with(id, |s| s.selected = false);
    }

    pub fn deselect_current_selected_elements(&mut self) {
        for id in std::mem::take(&mut self.selected) {
            self.redraw_with(id, |s| s.selected = false);
        }
    }

    /// Drop group members from the selection; they never move together
    /// with free shapes.
    pub fn deselect_grouped_elements(&mut self) {
        let grouped: Vec<ShapeId> = self
            .selected
            .iter()
            .copied()
            .filter(|&id| self.elements.get(id).is_some_and(|s| s.parent.is_some()))
            .collect();
        for id in grouped {
            self.deselect_element(id);
        }
    }

    /// Show or hide anchors on `id`, repainting only on change.
    pub fn set_show_anchors(&mut self, id: ShapeId, show: bool) {
        if self.elements.get(id).is_some_and(|s| s.show_anchors != show) {
            self.redraw_with(id, |s| s.show_anchors = show);
        }
    }

    /// Show or hide connection-point markers on `id`.
    pub fn set_show_connection_points(&mut self, id: ShapeId, show: bool) {
        if self.elements.get(id).is_some_and(|s| s.show_connection_points != show) {
            let n = self.config.connection_point_size;
            if let Some(s) = self.elements.get_mut(id) {
                s.show_connection_points = show;
            }
            self.redraw_grown(id, n, n);
        }
    }

    // ─── Motion ─────────────────────────────────────────────────────────

    /// `roots` with their group members and every connector attached to
    /// any of them.
    fn motion_seeds(&self, roots: &[ShapeId]) -> Vec<ShapeId> {
        let mut seeds: Vec<ShapeId> = Vec::new();
        for &root in roots {
            for id in self.elements.with_descendants(root) {
                if !seeds.contains(&id) {
                    seeds.push(id);
                }
                if let Some(shape) = self.elements.get(id) {
                    for c in &shape.connections {
                        if !seeds.contains(&c.to_element) {
                            seeds.push(c.to_element);
                        }
                    }
                }
            }
        }
        seeds
    }

    /// Move `id` (and its group) by `delta`; attached connectors follow.
    pub fn move_element(&mut self, id: ShapeId, delta: Delta) {
        self.move_with(id, delta, &[]);
    }

    /// As `move_element`, but connectors listed in `moving` are left alone
    /// because they move by themselves.
    fn move_with(&mut self, id: ShapeId, delta: Delta, moving: &[ShapeId]) {
        let Some(shape) = self.elements.get(id) else {
            return;
        };
        let d = delta.abs();
        let area = shape.update_rect(&self.config).grow(d.dx, d.dy);
        let moving = moving.to_vec();

        if self.renderer.surface().on_screen(area) {
            let seeds = self.motion_seeds(&[id]);
            self.paint(&seeds, delta, |els| translate_following(els, id, delta, &moving));
        } else {
            for s in self.motion_seeds(&[id]) {
                self.renderer.cancel_background(s);
            }
            translate_following(&mut self.elements, id, delta, &moving);
        }
    }

    /// Live drag of the selection: every selected shape moves, attached
    /// connectors follow, and each moved element is reported.
    pub fn drag_selected_elements(&mut self, delta: Delta) {
        let selected = self.selected.clone();
        for &id in &selected {
            self.move_with(id, delta, &selected);
            self.emit(CanvasEvent::SelectedElementUpdated(id));
        }
    }

    /// Move the selected shapes (connectors only through their
    /// attachments).
    pub fn move_selected_elements(&mut self, delta: Delta) {
        let selected = self.selected.clone();
        for &id in &selected {
            if self.elements.get(id).is_some_and(|s| !s.is_connector()) {
                self.move_with(id, delta, &selected);
            }
        }
    }

    /// Pan: translate every free shape by `delta`. The grid stays put.
    pub fn move_all_elements(&mut self, delta: Delta) {
        let roots: Vec<ShapeId> = self
            .elements
            .iter()
            .filter(|s| s.parent.is_none())
            .map(|s| s.id)
            .collect();
        for id in roots {
            self.elements.translate(id, delta, false);
        }
        self.renderer.draw_all(&self.elements, &self.config);
    }

    /// Drag anchor `anchor` of `id` by `delta`. Returns the delta actually
    /// applied after the minimum-size clamp.
    pub fn update_size(&mut self, id: ShapeId, anchor: &Anchor, delta: Delta) -> Delta {
        let Some(shape) = self.elements.get(id) else {
            log::warn!("update_size: unknown shape {id}");
            return Delta::ZERO;
        };
        let applied = if shape.kind.is_point_connector() {
            self.paint(&[id], delta, |els| {
                if let Some(s) = els.get_mut(id) {
                    s.move_endpoint(anchor.grip, delta);
                }
            });
            delta
        } else {
            let resized = if shape.kind.is_line() {
                resize_line(shape, anchor.grip, delta, &self.config)
            } else {
                resize(
                    shape.rect,
                    anchor.grip,
                    adjusted_delta(anchor.grip, delta),
                    self.config.min_width,
                    self.config.min_height,
                )
            };
            self.update_display_rectangle(id, resized.rect, delta);
            resized.applied
        };
        self.update_connections(id);
        if self.is_selected(id) {
            self.emit(CanvasEvent::SelectedElementUpdated(id));
        }
        applied
    }

    /// Give `id` a new rectangle, repainting the old and new areas.
    pub fn update_display_rectangle(&mut self, id: ShapeId, rect: Rect, delta: Delta) {
        self.paint(&[id], delta, |els| {
            if let Some(s) = els.get_mut(id) {
                s.set_rect(rect);
            }
        });
    }

    /// Re-pin every connector attached to `id` onto the current position of
    /// its connection point.
    pub fn update_connections(&mut self, id: ShapeId) {
        let Some(shape) = self.elements.get(id) else {
            return;
        };
        let points = connection_points(shape);
        let pins: Vec<(usize, ShapeId, GripType, ConnectionPoint)> = shape
            .connections
            .iter()
            .enumerate()
            .filter_map(|(i, c)| {
                points
                    .iter()
                    .find(|cp| cp.grip == c.element_connection_point.grip)
                    .map(|cp| (i, c.to_element, c.to_connection_point.grip, *cp))
            })
            .collect();
        if pins.is_empty() {
            return;
        }
        let connectors: Vec<ShapeId> = pins.iter().map(|p| p.1).collect();
        self.paint(&connectors, Delta::ZERO, |els| {
            for &(i, connector, grip, cp) in &pins {
                if let Some(c) = els.get_mut(connector) {
                    c.follow_point(grip, cp.point);
                }
                if let Some(c) = els.get_mut(id).and_then(|s| s.connections.get_mut(i)) {
                    c.element_connection_point = cp;
                }
            }
        });
    }

    // ─── Connections ────────────────────────────────────────────────────

    /// Pin the connector's endpoint onto `target`'s connection point.
    pub fn attach(
        &mut self,
        connector: ShapeId,
        connector_point: ConnectionPoint,
        target: ShapeId,
        target_point: ConnectionPoint,
    ) -> Result<(), CanvasError> {
        self.elements.connect(connector, connector_point, target, target_point)?;
        self.elements.debug_validate();
        Ok(())
    }

    /// Release the connector endpoint addressed by `grip`.
    pub fn detach(&mut self, connector: ShapeId, grip: GripType) -> Option<ShapeId> {
        let target = self.elements.disconnect(connector, grip);
        self.elements.debug_validate();
        target
    }

    // ─── Groups ─────────────────────────────────────────────────────────

    pub fn group_shapes(&mut self, children: &[ShapeId]) -> Result<ShapeId, CanvasError> {
        self.group_shapes_as(ShapeId::fresh(ShapeKind::GroupBox.tag()), children)
    }

    /// Wrap `children` in a group box with the given id. The box sits at
    /// the bottom of the z-order and encloses the children with a margin.
    pub fn group_shapes_as(&mut self, id: ShapeId, children: &[ShapeId]) -> Result<ShapeId, CanvasError> {
        let rect = children
            .iter()
            .map(|&c| self.elements.shape(c).map(|s| s.rect))
            .collect::<Result<Vec<Rect>, CanvasError>>()?
            .into_iter()
            .reduce(|a, b| a.union(&b))
            .ok_or(CanvasError::EmptyGroup)?
            .grow_uniform(self.config.group_margin);
        let group = Shape::new(ShapeKind::GroupBox, rect).with_id(id);
        let children = children.to_vec();

        self.paint(&[id], Delta::ZERO, |els| {
            els.insert_at(usize::MAX, group)?;
            for &child in &children {
                els.orphan(child);
            }
            els.adopt(id, &children)
        })?;
        log::debug!("group {id} <- {children:?}");
        self.elements.debug_validate();
        Ok(id)
    }

    /// Dissolve each group box in `groups`. Returns each group with the
    /// members it had.
    pub fn ungroup_shapes(&mut self, groups: &[ShapeId]) -> Vec<(ShapeId, Vec<ShapeId>)> {
        let groups: Vec<ShapeId> = groups
            .iter()
            .copied()
            .filter(|&g| self.elements.get(g).is_some_and(|s| s.is_group()))
            .collect();
        self.selected.retain(|s| !groups.contains(s));

        let released = self.paint(&groups, Delta::ZERO, |els| {
            groups
                .iter()
                .map(|&g| {
                    let children = els.release_children(g);
                    els.orphan(g);
                    els.detach_all(g);
                    els.remove(g);
                    (g, children)
                })
                .collect::<Vec<_>>()
        });
        log::debug!("ungroup {groups:?}");
        self.elements.debug_validate();
        released
    }

    // ─── Z-order ────────────────────────────────────────────────────────

    fn reorder(&mut self, change: impl FnOnce(&mut Elements, &[ShapeId])) {
        let selected = self.selected.clone();
        self.paint(&selected, Delta::ZERO, |els| change(els, &selected));
    }

    pub fn topmost(&mut self) {
        self.reorder(|els, selected| {
            for &id in selected.iter().rev() {
                els.move_to_index(id, 0);
            }
        });
    }

    pub fn bottommost(&mut self) {
        self.reorder(|els, selected| {
            for &id in selected {
                els.move_to_index(id, usize::MAX);
            }
        });
    }

    pub fn move_up(&mut self) {
        self.reorder(|els, selected| {
            for &id in selected {
                if let Some(i) = els.index_of(id).filter(|&i| i > 0) {
                    els.swap(i, i - 1);
                }
            }
        });
    }

    pub fn move_down(&mut self) {
        self.reorder(|els, selected| {
            for &id in selected {
                if let Some(i) = els.index_of(id).filter(|&i| i + 1 < els.len()) {
                    els.swap(i, i + 1);
                }
            }
        });
    }

    /// Put the collection back into a previously captured z-order.
    pub fn restore_order(&mut self, order: &[ShapeId]) {
        for (index, &id) in order.iter().enumerate() {
            self.elements.move_to_index(id, index);
        }
        self.redraw_all();
    }

    // ─── Properties ─────────────────────────────────────────────────────

    /// Replace the text of `id`; returns the previous text.
    pub fn set_text(&mut self, id: ShapeId, text: String) -> Option<String> {
        let previous = self.elements.get(id)?.text.clone();
        self.redraw_with(id, |s| s.text = text);
        Some(previous)
    }

    /// Replace the style of `id`; returns the previous style.
    pub fn set_style(&mut self, id: ShapeId, style: Style) -> Option<Style> {
        let previous = self.elements.get(id)?.style;
        let grow = previous.stroke_width.max(style.stroke_width);
        self.paint(&[id], Delta::new(grow, grow), |els| {
            if let Some(s) = els.get_mut(id) {
                s.style = style;
                s.update_path();
            }
        });
        Some(previous)
    }
}

impl UndoContext for CanvasController {
    fn after_action(&mut self, name: &str) {
        self.emit(CanvasEvent::AfterAction(name.to_string()));
    }
}

/// Translate `id` with its group; connectors attached to `id` follow unless
/// they are in `moving`.
fn translate_following(els: &mut Elements, id: ShapeId, delta: Delta, moving: &[ShapeId]) {
    let connections = els.get(id).map(|s| s.connections.clone()).unwrap_or_default();
    let moved = els.translate(id, delta, true);
    for c in connections {
        let free = els.get(c.to_element).is_some_and(|s| s.parent.is_none());
        if free && !moving.contains(&c.to_element) && !moved.contains(&c.to_element) {
            els.follow(c.to_element, c.to_connection_point.grip, delta);
        }
    }
}

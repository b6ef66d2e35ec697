//! Mouse rule table.
//!
//! Every pointer gesture is a list of `MouseRoute`s: an event kind, a
//! guard over the current engine state, and an action. For each event the
//! routes of that kind are visited in table order and every route whose
//! guard holds runs, so later guards see the state earlier actions left
//! behind. The table order is therefore part of the behavior:
//!
//! | Up after…             | Routes that run, in order                            |
//! |-----------------------|------------------------------------------------------|
//! | surface press, no move | `EndDragSurfaceWithDeselect` (then `EndDragSurface` sees nothing to do) |
//! | shape drag            | `EndShapeDrag`, then `RemoveSelectedShape`'s else branch clears `dragging_occurred` |
//! | Ctrl-click on a shape | `AddSelectedShape`, then `RemoveSelectedShape` skips the shape just added |

use crate::canvas::{CanvasController, CanvasEvent};
use crate::commands::Command;
use crate::engine::Engine;
use crate::input::{Modifiers, MouseButtons, MouseEvent, MouseEventKind};
use fc_core::geometry::{Delta, Point, Rect};
use fc_core::id::ShapeId;
use fc_core::model::{Anchor, Color, Cursor, GripType, Shape, ShapeKind, Style};
use fc_render::hit::{anchor_at, child_shape_at, root_shape_at, shapes_in_rect};
use smallvec::SmallVec;

/// Gesture state shared by the routes.
#[derive(Debug, Clone, Default)]
pub struct MouseState {
    pub dragging_surface: bool,
    pub dragging_surface_occurred: bool,
    pub dragging_shapes: bool,
    pub dragging_anchor: bool,
    /// A shape drag moved something; suppresses click-selection on release.
    pub dragging_occurred: bool,
    pub dragging_selection_box: bool,
    /// Shape whose anchors are showing.
    pub hover: Option<ShapeId>,
    pub selected_anchor: Option<Anchor>,
    pub selection_box: Option<ShapeId>,
    pub start_selection_pos: Point,
    pub current_pos: Point,
    pub last_pos: Point,
    pub buttons: MouseButtons,
    pub modifiers: Modifiers,
    pub timestamp_ms: u64,
    /// Shapes added to the selection by the Ctrl-click in progress.
    pub just_added: Vec<ShapeId>,
    pub last_edit_ms: Option<u64>,
    /// Routes that ran for the most recent event.
    pub fired: SmallVec<[RouteName; 4]>,
}

impl MouseState {
    pub fn delta(&self) -> Delta {
        self.current_pos - self.last_pos
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging_surface || self.dragging_shapes || self.dragging_anchor || self.dragging_selection_box
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteName {
    FireMouseClickEvent,
    StartDragSurface,
    EndDragSurfaceWithDeselect,
    EndDragSurface,
    DragSurface,
    StartShapeDrag,
    StartAnchorDrag,
    EndShapeDrag,
    EndAnchorDrag,
    DragShapes,
    DragAnchor,
    HoverOverShape,
    ShowAnchors,
    HideAnchors,
    ShowAnchorCursor,
    ClearAnchorCursor,
    SelectSingleShapeMouseDown,
    SelectSingleGroupedShape,
    SelectSingleShapeMouseUp,
    AddSelectedShape,
    RemoveSelectedShape,
    RightClick,
    StartDragSelectionBox,
    EndDragSelectionBox,
    DragSelectionBox,
    EditShapeText,
}

pub struct MouseRoute {
    pub name: RouteName,
    pub kind: MouseEventKind,
    pub condition: fn(&Engine) -> bool,
    pub action: fn(&mut Engine),
    /// Runs when `condition` is false.
    pub otherwise: Option<fn(&mut Engine)>,
}

impl std::fmt::Debug for MouseRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MouseRoute")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("otherwise", &self.otherwise.is_some())
            .finish()
    }
}

use MouseEventKind::{Down, Move, Up};

pub static ROUTES: &[MouseRoute] = &[
    MouseRoute {
        name: RouteName::FireMouseClickEvent,
        kind: Down,
        condition: |_| true,
        action: fire_mouse_click,
        otherwise: None,
    },
    // ── Surface ──
    MouseRoute {
        name: RouteName::StartDragSurface,
        kind: Down,
        condition: |e| root_at(e).is_none() && e.mouse.buttons == MouseButtons::Left,
        action: start_drag_surface,
        otherwise: None,
    },
    MouseRoute {
        name: RouteName::EndDragSurfaceWithDeselect,
        kind: Up,
        condition: |e| e.mouse.dragging_surface && !e.mouse.dragging_surface_occurred,
        action: end_drag_surface_with_deselect,
        otherwise: None,
    },
    MouseRoute {
        name: RouteName::EndDragSurface,
        kind: Up,
        condition: |e| e.mouse.dragging_surface,
        action: end_drag_surface,
        otherwise: None,
    },
    MouseRoute {
        name: RouteName::DragSurface,
        kind: Move,
        condition: |e| e.mouse.dragging_surface,
        action: drag_surface,
        otherwise: None,
    },
    // ── Shape and anchor drags ──
    MouseRoute {
        name: RouteName::StartShapeDrag,
        kind: Down,
        condition: |e| {
            root_at(e).is_some_and(|root| anchor_of(e, root).is_none())
                && e.mouse.buttons == MouseButtons::Left
                && child_at(e).is_none()
        },
        action: start_shape_drag,
        otherwise: None,
    },
    MouseRoute {
        name: RouteName::StartAnchorDrag,
        kind: Down,
        condition: |e| {
            root_at(e).is_some_and(|root| anchor_of(e, root).is_some()) && e.mouse.buttons == MouseButtons::Left
        },
        action: start_anchor_drag,
        otherwise: None,
    },
    MouseRoute {
        name: RouteName::EndShapeDrag,
        kind: Up,
        condition: |e| e.mouse.dragging_shapes,
        action: end_shape_drag,
        otherwise: None,
    },
    MouseRoute {
        name: RouteName::EndAnchorDrag,
        kind: Up,
        condition: |e| e.mouse.dragging_anchor,
        action: end_anchor_drag,
        otherwise: None,
    },
    MouseRoute {
        name: RouteName::DragShapes,
        kind: Move,
        condition: |e| e.mouse.dragging_shapes && e.mouse.hover.is_some() && hover_anchor(e).is_none(),
        action: drag_shapes,
        otherwise: None,
    },
    MouseRoute {
        name: RouteName::DragAnchor,
        kind: Move,
        condition: |e| e.mouse.hover.is_some() && e.mouse.dragging_anchor,
        action: drag_anchor,
        otherwise: None,
    },
    // ── Hover ──
    MouseRoute {
        name: RouteName::HoverOverShape,
        kind: Move,
        condition: |e| {
            idle(e)
                && e.mouse.hover.is_none()
                && e.mouse.buttons == MouseButtons::None
                && root_at(e).is_some_and(|root| is_parentless(e, root))
        },
        action: hover_over_shape,
        otherwise: None,
    },
    MouseRoute {
        name: RouteName::ShowAnchors,
        kind: Move,
        condition: |e| {
            idle(e)
                && e.mouse.hover.is_some()
                && root_at(e).is_some_and(|root| Some(root) != e.mouse.hover && is_parentless(e, root))
        },
        action: change_anchors,
        otherwise: None,
    },
    MouseRoute {
        name: RouteName::HideAnchors,
        kind: Move,
        condition: |e| {
            idle(e) && e.mouse.hover.is_some() && e.mouse.buttons == MouseButtons::None && root_at(e).is_none()
        },
        action: hide_anchors,
        otherwise: None,
    },
    MouseRoute {
        name: RouteName::ShowAnchorCursor,
        kind: Move,
        condition: |e| idle(e) && !e.mouse.dragging_anchor && hover_anchor(e).is_some(),
        action: show_anchor_cursor,
        otherwise: None,
    },
    MouseRoute {
        name: RouteName::ClearAnchorCursor,
        kind: Move,
        condition: |e| idle(e) && e.mouse.hover.is_some() && hover_anchor(e).is_none(),
        action: |e| e.canvas.set_cursor(Cursor::Arrow),
        otherwise: None,
    },
    // ── Selection ──
    MouseRoute {
        name: RouteName::SelectSingleShapeMouseDown,
        kind: Down,
        condition: |e| {
            child_at(e).is_none()
                && !multi(e)
                && root_at(e).is_some_and(|root| !e.canvas.is_selected(root))
        },
        action: select_single_root_shape,
        otherwise: None,
    },
    MouseRoute {
        name: RouteName::SelectSingleGroupedShape,
        kind: Down,
        condition: |e| !multi(e) && child_at(e).is_some_and(|child| !e.canvas.is_selected(child)),
        action: select_single_grouped_shape,
        otherwise: None,
    },
    MouseRoute {
        name: RouteName::SelectSingleShapeMouseUp,
        kind: Up,
        condition: |e| {
            root_at(e).is_some()
                && child_at(e).is_none()
                && !multi(e)
                && !e.mouse.dragging_occurred
                && !e.mouse.dragging_selection_box
        },
        action: select_single_root_shape,
        otherwise: None,
    },
    MouseRoute {
        name: RouteName::AddSelectedShape,
        kind: Up,
        condition: |e| {
            multi(e) && !e.mouse.dragging_selection_box && root_at(e).is_some_and(|root| !e.canvas.is_selected(root))
        },
        action: add_selected_shape,
        otherwise: None,
    },
    MouseRoute {
        name: RouteName::RemoveSelectedShape,
        kind: Up,
        condition: |e| {
            multi(e)
                && !e.mouse.dragging_selection_box
                && !e.mouse.dragging_occurred
                && root_at(e).is_some_and(|root| e.canvas.is_selected(root) && !e.mouse.just_added.contains(&root))
        },
        action: remove_selected_shape,
        otherwise: Some(end_multi_select_click),
    },
    MouseRoute {
        name: RouteName::RightClick,
        kind: Down,
        condition: |e| root_at(e).is_some() && e.mouse.buttons == MouseButtons::Right,
        action: |e| {
            let hover = e.mouse.hover;
            e.canvas.emit(CanvasEvent::RightClick(hover));
        },
        otherwise: None,
    },
    // ── Selection box ──
    MouseRoute {
        name: RouteName::StartDragSelectionBox,
        kind: Down,
        condition: |e| root_at(e).is_none() && e.mouse.buttons == MouseButtons::Right,
        action: start_drag_selection_box,
        otherwise: None,
    },
    MouseRoute {
        name: RouteName::EndDragSelectionBox,
        kind: Up,
        condition: |e| e.mouse.dragging_selection_box,
        action: end_drag_selection_box,
        otherwise: None,
    },
    MouseRoute {
        name: RouteName::DragSelectionBox,
        kind: Move,
        condition: |e| e.mouse.dragging_selection_box,
        action: drag_selection_box,
        otherwise: None,
    },
    // ── Text ──
    MouseRoute {
        name: RouteName::EditShapeText,
        kind: MouseEventKind::DoubleClick,
        condition: |_| true,
        action: edit_shape_text,
        otherwise: None,
    },
];

/// Feed one pointer event through the table.
///
/// A move to the position of the previous event is dropped; some platforms
/// report one after every click.
pub(crate) fn route(engine: &mut Engine, event: MouseEvent) {
    engine.mouse.fired.clear();
    if event.kind == Move && event.position == engine.mouse.last_pos {
        return;
    }
    engine.mouse.current_pos = event.position;
    engine.mouse.buttons = event.buttons;
    engine.mouse.modifiers = event.modifiers;
    engine.mouse.timestamp_ms = event.timestamp_ms;

    for route in ROUTES.iter().filter(|r| r.kind == event.kind) {
        if (route.condition)(engine) {
            log::trace!("route {:?}", route.name);
            engine.mouse.fired.push(route.name);
            (route.action)(engine);
        } else if let Some(otherwise) = route.otherwise {
            otherwise(engine);
        }
    }
    engine.mouse.last_pos = event.position;
}

// ─── Guards ─────────────────────────────────────────────────────────────

fn root_at(e: &Engine) -> Option<ShapeId> {
    root_shape_at(e.canvas.elements(), e.mouse.current_pos, e.canvas.config())
}

fn child_at(e: &Engine) -> Option<ShapeId> {
    child_shape_at(e.canvas.elements(), e.mouse.current_pos, e.canvas.config())
}

fn anchor_of(e: &Engine, id: ShapeId) -> Option<Anchor> {
    anchor_at(e.canvas.elements(), id, e.mouse.current_pos, e.canvas.config())
}

fn hover_anchor(e: &Engine) -> Option<Anchor> {
    e.mouse.hover.and_then(|hover| anchor_of(e, hover))
}

fn is_parentless(e: &Engine, id: ShapeId) -> bool {
    e.canvas.elements().get(id).is_some_and(|s| s.parent.is_none())
}

fn multi(e: &Engine) -> bool {
    e.mouse.modifiers.is_multi_select()
}

/// No surface, shape or selection-box drag in progress.
fn idle(e: &Engine) -> bool {
    !e.mouse.dragging_surface && !e.mouse.dragging_shapes && !e.mouse.dragging_selection_box
}

// ─── Actions ────────────────────────────────────────────────────────────

fn fire_mouse_click(e: &mut Engine) {
    let event = CanvasEvent::MouseClick {
        position: e.mouse.current_pos,
        buttons: e.mouse.buttons,
    };
    e.canvas.emit(event);
}

fn start_drag_surface(e: &mut Engine) {
    e.mouse.dragging_surface = true;
    e.mouse.dragging_surface_occurred = false;
}

fn end_drag_surface_with_deselect(e: &mut Engine) {
    e.mouse.dragging_surface = false;
    e.canvas.set_cursor(Cursor::Arrow);
    let previous = e.canvas.selected_elements().to_vec();
    if !previous.is_empty() {
        e.undo.undo_redo(
            &mut e.canvas,
            "Canvas",
            |c| c.deselect_current_selected_elements(),
            move |c| {
                c.deselect_current_selected_elements();
                c.select_elements(&previous);
            },
            true,
        );
    }
}

fn end_drag_surface(e: &mut Engine) {
    e.mouse.dragging_surface = false;
    e.mouse.dragging_surface_occurred = false;
    e.canvas.set_cursor(Cursor::Arrow);
}

fn drag_surface(e: &mut Engine) {
    e.mouse.dragging_surface_occurred = true;
    e.canvas.set_cursor(Cursor::SizeAll);
    let delta = e.mouse.delta();
    e.canvas.move_all_elements(delta);
}

fn start_shape_drag(e: &mut Engine) {
    e.snap.reset();
    e.canvas.deselect_grouped_elements();
    e.mouse.dragging_shapes = true;
}

fn start_anchor_drag(e: &mut Engine) {
    let Some(root) = root_at(e) else {
        return;
    };
    e.snap.reset();
    e.mouse.dragging_anchor = true;
    e.mouse.hover = Some(root);
    e.mouse.selected_anchor = anchor_of(e, root);
}

/// Commit a finished shape or anchor drag: pending snap actions first,
/// then one entry that reverses the net motion, all in one undo group.
fn commit_drag(e: &mut Engine, name: &str, make: impl FnOnce(Delta) -> Option<Command<CanvasController>>) {
    let flushed = e.snap.do_undo_snap_actions(&mut e.undo, &mut e.canvas);
    let delta = e.snap.running_delta();
    let command = if delta.is_zero() { None } else { make(delta) };
    match command {
        Some(cmd) => {
            log::debug!("{name} by {delta:?}");
            e.undo.do_action(&mut e.canvas, cmd);
        }
        None if flushed > 0 => e.undo.finish_group(true),
        None => {}
    }
    e.snap.hide_connection_points(&mut e.canvas);
    e.snap.reset();
}

fn end_shape_drag(e: &mut Engine) {
    commit_drag(e, "ShapeMove", |d| {
        Some(
            Command::new(
                "ShapeMove",
                |_: &mut CanvasController| {},
                move |c: &mut CanvasController| c.drag_selected_elements(-d),
            )
            .with_redo(move |c: &mut CanvasController| c.drag_selected_elements(d)),
        )
    });
    e.mouse.dragging_shapes = false;
    e.mouse.dragging_anchor = false;
    e.mouse.selected_anchor = None;
    e.canvas.set_cursor(Cursor::Arrow);
}

fn end_anchor_drag(e: &mut Engine) {
    let target = e.mouse.hover.zip(e.mouse.selected_anchor);
    commit_drag(e, "AnchorMove", |d| {
        let (shape, anchor) = target?;
        Some(
            Command::new(
                "AnchorMove",
                |_: &mut CanvasController| {},
                move |c: &mut CanvasController| {
                    c.update_size(shape, &anchor, -d);
                },
            )
            .with_redo(move |c: &mut CanvasController| {
                c.update_size(shape, &anchor, d);
            }),
        )
    });
    e.mouse.dragging_shapes = false;
    e.mouse.dragging_anchor = false;
    e.mouse.selected_anchor = None;
    e.canvas.set_cursor(Cursor::Arrow);
}

fn drag_shapes(e: &mut Engine) {
    e.canvas.set_cursor(Cursor::SizeAll);
    let delta = e.mouse.delta();
    let single_connector = match e.canvas.selected_elements() {
        &[only] => e.canvas.elements().get(only).is_some_and(|s| s.is_connector()),
        _ => false,
    };
    let drag = |c: &mut CanvasController, d: Delta| c.drag_selected_elements(d);
    let snapped = single_connector
        && (e.snap.snap_check(&mut e.canvas, GripType::Start, delta, drag)
            || e.snap.snap_check(&mut e.canvas, GripType::End, delta, drag));
    if !snapped {
        e.canvas.drag_selected_elements(delta);
        e.snap.update_running_delta(delta);
    }
    e.mouse.dragging_occurred = true;
}

fn drag_anchor(e: &mut Engine) {
    let (Some(shape), Some(anchor)) = (e.mouse.hover, e.mouse.selected_anchor) else {
        return;
    };
    let delta = e.mouse.delta();
    let snapped = e.snap.snap_check(&mut e.canvas, anchor.grip, delta, |c, d| {
        c.update_size(shape, &anchor, d);
    });
    if !snapped {
        let applied = e.canvas.update_size(shape, &anchor, delta);
        e.snap.update_running_delta(applied);
    }
}

fn set_anchor_cursor(e: &mut Engine, id: ShapeId) {
    let cursor = anchor_of(e, id).map_or(Cursor::Arrow, |a| a.cursor);
    e.canvas.set_cursor(cursor);
}

fn hover_over_shape(e: &mut Engine) {
    let Some(root) = root_at(e) else {
        return;
    };
    e.canvas.set_show_anchors(root, true);
    e.mouse.hover = Some(root);
    set_anchor_cursor(e, root);
}

fn change_anchors(e: &mut Engine) {
    let Some(root) = root_at(e) else {
        return;
    };
    if let Some(previous) = e.mouse.hover {
        e.canvas.set_show_anchors(previous, false);
    }
    e.mouse.hover = Some(root);
    e.canvas.set_show_anchors(root, true);
    set_anchor_cursor(e, root);
}

fn hide_anchors(e: &mut Engine) {
    if let Some(hover) = e.mouse.hover.take() {
        e.canvas.set_show_anchors(hover, false);
    }
    e.canvas.set_cursor(Cursor::Arrow);
}

fn show_anchor_cursor(e: &mut Engine) {
    if let Some(anchor) = hover_anchor(e) {
        e.canvas.set_cursor(anchor.cursor);
    }
}

/// Make `id` the whole selection, as one undo entry.
fn select_only(e: &mut Engine, name: &str, id: ShapeId) {
    let previous = e.canvas.selected_elements().to_vec();
    if previous == [id] {
        return;
    }
    e.undo.undo_redo(
        &mut e.canvas,
        name,
        move |c| {
            c.deselect_current_selected_elements();
            c.select_element(id);
        },
        move |c| {
            c.deselect_current_selected_elements();
            c.select_elements(&previous);
        },
        true,
    );
}

fn select_single_root_shape(e: &mut Engine) {
    if let Some(root) = root_at(e) {
        select_only(e, "Select Root", root);
    }
}

fn select_single_grouped_shape(e: &mut Engine) {
    if let Some(child) = child_at(e) {
        select_only(e, "Select Child", child);
    }
}

fn add_selected_shape(e: &mut Engine) {
    let Some(root) = root_at(e) else {
        return;
    };
    let previous = e.canvas.selected_elements().to_vec();
    e.undo.undo_redo(
        &mut e.canvas,
        "Select",
        move |c| {
            c.deselect_grouped_elements();
            c.select_element(root);
        },
        move |c| {
            c.deselect_current_selected_elements();
            c.select_elements(&previous);
        },
        true,
    );
    e.mouse.just_added.push(root);
}

fn remove_selected_shape(e: &mut Engine) {
    let Some(root) = root_at(e) else {
        return;
    };
    e.undo.undo_redo(
        &mut e.canvas,
        "Deselect",
        move |c| c.deselect_element(root),
        move |c| c.select_element(root),
        true,
    );
}

/// Runs on every Up that does not deselect: the Ctrl-click and the drag
/// that preceded it are over.
fn end_multi_select_click(e: &mut Engine) {
    e.mouse.just_added.clear();
    e.mouse.dragging_occurred = false;
}

fn start_drag_selection_box(e: &mut Engine) {
    e.mouse.dragging_selection_box = true;
    e.mouse.start_selection_pos = e.mouse.current_pos;
    let start = e.mouse.current_pos;
    let marquee = Shape::new(ShapeKind::Box, Rect::new(start.x, start.y, 1, 1)).with_style(Style {
        fill: Color::TRANSPARENT,
        stroke: Color::GRAY,
        stroke_width: 1,
    });
    match e.canvas.insert(marquee) {
        Ok(id) => e.mouse.selection_box = Some(id),
        Err(err) => log::warn!("selection box: {err}"),
    }
}

fn drag_selection_box(e: &mut Engine) {
    let Some(marquee) = e.mouse.selection_box else {
        return;
    };
    let rect = Rect::from_corners(e.mouse.start_selection_pos, e.mouse.current_pos);
    let delta = e.mouse.delta();
    e.canvas.update_display_rectangle(marquee, rect, delta);
}

fn end_drag_selection_box(e: &mut Engine) {
    e.mouse.dragging_selection_box = false;
    let Some(marquee) = e.mouse.selection_box.take() else {
        return;
    };
    let Some(area) = e.canvas.elements().get(marquee).map(|s| s.rect) else {
        return;
    };
    e.canvas.delete_element(marquee);

    let selected = shapes_in_rect(e.canvas.elements(), area, e.canvas.config());
    let previous = e.canvas.selected_elements().to_vec();
    e.undo.undo_redo(
        &mut e.canvas,
        "Group Select",
        move |c| {
            c.deselect_current_selected_elements();
            c.select_elements(&selected);
        },
        move |c| {
            c.deselect_current_selected_elements();
            c.select_elements(&previous);
        },
        true,
    );
}

fn edit_shape_text(e: &mut Engine) {
    let now = e.mouse.timestamp_ms;
    let debounce = e.canvas.config().double_click_debounce_ms;
    if e.mouse.last_edit_ms.is_some_and(|last| now.saturating_sub(last) < debounce) {
        return;
    }
    e.mouse.last_edit_ms = Some(now);
    let first = e.canvas.selected_elements().first().copied();
    e.canvas.emit(CanvasEvent::EditText(first));
}

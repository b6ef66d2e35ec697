//! Integration tests: pointer gestures through the mouse rule table.
//!
//! Drives `Engine::handle_mouse` with raw down/move/up sequences and checks
//! the resulting geometry, selection, connections, events and undo history.

use fc_core::anchor::connection_points;
use fc_core::config::SurfaceConfig;
use fc_core::*;
use fc_editor::*;
use pretty_assertions::assert_eq;

fn engine() -> Engine {
    let _ = env_logger::builder().is_test(true).try_init();
    Engine::new(EngineConfig {
        surface: SurfaceConfig {
            width: 400,
            height: 300,
            ..SurfaceConfig::default()
        },
        ..EngineConfig::default()
    })
    .unwrap()
}

fn boxed(e: &mut Engine, x: i32, y: i32, w: i32, h: i32) -> ShapeId {
    e.canvas_mut()
        .insert(Shape::new(ShapeKind::Box, Rect::new(x, y, w, h)))
        .unwrap()
}

fn rect_of(e: &Engine, id: ShapeId) -> Rect {
    e.elements().get(id).unwrap().rect
}

fn end_of(e: &Engine, id: ShapeId) -> Point {
    e.elements().get(id).unwrap().endpoints().unwrap().1
}

fn fired(e: &Engine) -> Vec<RouteName> {
    e.mouse_state().fired.to_vec()
}

fn hover(e: &mut Engine, x: i32, y: i32) {
    e.handle_mouse(MouseEvent::moved(x, y, MouseButtons::None));
}

/// Hover, press, drag in one step, release.
fn drag(e: &mut Engine, from: (i32, i32), to: (i32, i32)) {
    hover(e, from.0, from.1);
    e.handle_mouse(MouseEvent::down(from.0, from.1, MouseButtons::Left));
    e.handle_mouse(MouseEvent::moved(to.0, to.1, MouseButtons::Left));
    e.handle_mouse(MouseEvent::up(to.0, to.1));
}

fn click(e: &mut Engine, x: i32, y: i32, modifiers: Modifiers) {
    hover(e, x, y);
    e.handle_mouse(MouseEvent::down(x, y, MouseButtons::Left).with_modifiers(modifiers));
    e.handle_mouse(MouseEvent::up(x, y).with_modifiers(modifiers));
}

// ─── Table ──────────────────────────────────────────────────────────────

#[test]
fn routes_are_evaluated_in_table_order() {
    let names: Vec<RouteName> = ROUTES.iter().map(|r| r.name).collect();
    assert_eq!(
        names,
        vec![
            RouteName::FireMouseClickEvent,
            RouteName::StartDragSurface,
            RouteName::EndDragSurfaceWithDeselect,
            RouteName::EndDragSurface,
            RouteName::DragSurface,
            RouteName::StartShapeDrag,
            RouteName::StartAnchorDrag,
            RouteName::EndShapeDrag,
            RouteName::EndAnchorDrag,
            RouteName::DragShapes,
            RouteName::DragAnchor,
            RouteName::HoverOverShape,
            RouteName::ShowAnchors,
            RouteName::HideAnchors,
            RouteName::ShowAnchorCursor,
            RouteName::ClearAnchorCursor,
            RouteName::SelectSingleShapeMouseDown,
            RouteName::SelectSingleGroupedShape,
            RouteName::SelectSingleShapeMouseUp,
            RouteName::AddSelectedShape,
            RouteName::RemoveSelectedShape,
            RouteName::RightClick,
            RouteName::StartDragSelectionBox,
            RouteName::EndDragSelectionBox,
            RouteName::DragSelectionBox,
            RouteName::EditShapeText,
        ]
    );
}

#[test]
fn move_to_same_position_is_ignored() {
    let mut e = engine();
    boxed(&mut e, 25, 50, 200, 100);
    hover(&mut e, 125, 100);
    assert_eq!(fired(&e), vec![RouteName::HoverOverShape, RouteName::ClearAnchorCursor]);
    hover(&mut e, 125, 100);
    assert!(fired(&e).is_empty());
}

// ─── Shape drag ─────────────────────────────────────────────────────────

#[test]
fn dragging_a_box_moves_it_and_undo_restores() {
    let mut e = engine();
    let b = boxed(&mut e, 25, 50, 200, 100);

    hover(&mut e, 125, 100);
    assert_eq!(e.mouse_state().hover, Some(b));
    assert!(e.elements().get(b).unwrap().show_anchors);

    e.handle_mouse(MouseEvent::down(125, 100, MouseButtons::Left));
    assert_eq!(
        fired(&e),
        vec![
            RouteName::FireMouseClickEvent,
            RouteName::StartShapeDrag,
            RouteName::SelectSingleShapeMouseDown,
        ]
    );
    assert_eq!(e.selected_elements(), &[b]);

    e.handle_mouse(MouseEvent::moved(135, 105, MouseButtons::Left));
    assert_eq!(rect_of(&e, b), Rect::new(35, 55, 200, 100));
    assert_eq!(e.canvas().cursor(), Cursor::SizeAll);

    e.handle_mouse(MouseEvent::up(135, 105));
    assert_eq!(fired(&e), vec![RouteName::EndShapeDrag]);
    assert_eq!(e.canvas().cursor(), Cursor::Arrow);
    assert!(!e.mouse_state().dragging_occurred);

    assert_eq!(e.undo().as_deref(), Some("ShapeMove"));
    assert_eq!(rect_of(&e, b), Rect::new(25, 50, 200, 100));
    assert_eq!(e.selected_elements(), &[b]);

    assert_eq!(e.redo().as_deref(), Some("ShapeMove"));
    assert_eq!(rect_of(&e, b), Rect::new(35, 55, 200, 100));
}

#[test]
fn click_without_motion_selects_without_move_entry() {
    let mut e = engine();
    let b = boxed(&mut e, 25, 50, 200, 100);
    click(&mut e, 125, 100, Modifiers::NONE);
    assert_eq!(e.selected_elements(), &[b]);
    assert_eq!(e.undo_stack().stack_info(), vec!["Select Root F"]);
}

#[test]
fn dragging_a_group_moves_members_and_attached_connector_end() {
    let mut e = engine();
    let a = boxed(&mut e, 100, 100, 40, 40);
    let b = boxed(&mut e, 200, 100, 40, 40);
    e.select(&[a, b]);
    let group = e.group_selected().unwrap().unwrap();
    assert_eq!(rect_of(&e, group), Rect::new(95, 95, 150, 50));

    let line = e
        .canvas_mut()
        .insert(Shape::connector(ShapeKind::DiagonalConnector, Point::new(20, 60), Point::new(100, 120)))
        .unwrap();
    let end = *connection_points(e.elements().get(line).unwrap())
        .iter()
        .find(|cp| cp.grip == GripType::End)
        .unwrap();
    let left = *connection_points(e.elements().get(a).unwrap())
        .iter()
        .find(|cp| cp.grip == GripType::LeftMiddle)
        .unwrap();
    e.canvas_mut().attach(line, end, a, left).unwrap();

    drag(&mut e, (170, 120), (180, 125));

    assert_eq!(rect_of(&e, group), Rect::new(105, 100, 150, 50));
    assert_eq!(rect_of(&e, a), Rect::new(110, 105, 40, 40));
    assert_eq!(rect_of(&e, b), Rect::new(210, 105, 40, 40));
    assert_eq!(end_of(&e, line), Point::new(110, 125));
    assert_eq!(e.elements().get(line).unwrap().endpoints().unwrap().0, Point::new(20, 60));
    e.elements().validate().unwrap();

    e.undo();
    assert_eq!(rect_of(&e, a), Rect::new(100, 100, 40, 40));
    assert_eq!(end_of(&e, line), Point::new(100, 120));
}

#[test]
fn pressing_a_group_member_selects_the_member() {
    let mut e = engine();
    let a = boxed(&mut e, 100, 100, 40, 40);
    e.select(&[a]);
    let group = e.group_selected().unwrap().unwrap();

    hover(&mut e, 120, 120);
    e.handle_mouse(MouseEvent::down(120, 120, MouseButtons::Left));
    assert!(fired(&e).contains(&RouteName::SelectSingleGroupedShape));
    assert!(!e.mouse_state().dragging_shapes);
    assert_eq!(e.selected_elements(), &[a]);
    assert_eq!(e.undo_stack().stack_info()[0], "Select Child F");

    e.undo();
    assert_eq!(e.selected_elements(), &[group]);
}

// ─── Anchor drag ────────────────────────────────────────────────────────

#[test]
fn dragging_a_corner_anchor_resizes_and_undoes() {
    let mut e = engine();
    let b = boxed(&mut e, 25, 50, 200, 100);

    hover(&mut e, 222, 147);
    assert_eq!(e.canvas().cursor(), Cursor::SizeNwse);

    e.handle_mouse(MouseEvent::down(222, 147, MouseButtons::Left));
    assert!(fired(&e).contains(&RouteName::StartAnchorDrag));
    assert_eq!(e.mouse_state().selected_anchor.map(|a| a.grip), Some(GripType::BottomRight));

    e.handle_mouse(MouseEvent::moved(232, 157, MouseButtons::Left));
    assert_eq!(rect_of(&e, b), Rect::new(25, 50, 210, 110));

    e.handle_mouse(MouseEvent::up(232, 157));
    assert_eq!(fired(&e)[0], RouteName::EndAnchorDrag);

    assert_eq!(e.undo().as_deref(), Some("AnchorMove"));
    assert_eq!(rect_of(&e, b), Rect::new(25, 50, 200, 100));
}

#[test]
fn anchor_drag_stops_at_minimum_size() {
    let mut e = engine();
    let b = boxed(&mut e, 100, 100, 40, 40);
    hover(&mut e, 137, 137);
    e.handle_mouse(MouseEvent::down(137, 137, MouseButtons::Left));
    e.handle_mouse(MouseEvent::moved(107, 137, MouseButtons::Left));
    e.handle_mouse(MouseEvent::up(107, 137));
    assert_eq!(rect_of(&e, b), Rect::new(100, 100, 40, 40));
    assert_eq!(e.snap_engine().running_delta(), Delta::ZERO);
}

// ─── Snapping ───────────────────────────────────────────────────────────

/// Target box with its left-middle point at (104, 102) and a diagonal
/// connector ending at (100, 100).
fn snap_scene() -> (Engine, ShapeId, ShapeId) {
    let mut e = engine();
    let target = boxed(&mut e, 104, 77, 80, 50);
    let line = e
        .canvas_mut()
        .insert(Shape::connector(ShapeKind::DiagonalConnector, Point::new(20, 20), Point::new(100, 100)))
        .unwrap();
    (e, target, line)
}

#[test]
fn dragging_a_connector_near_a_point_attaches_it() {
    let (mut e, target, line) = snap_scene();
    drag(&mut e, (60, 60), (63, 62));

    assert_eq!(end_of(&e, line), Point::new(104, 102));
    assert_eq!(e.elements().get(line).unwrap().ends.unwrap().end_shape, Some(target));
    assert_eq!(
        e.undo_stack().stack_info(),
        vec!["ShapeMove F", "Attach -", "Select Root F"]
    );
    assert!(!e.elements().get(target).unwrap().show_connection_points);
    e.elements().validate().unwrap();

    assert_eq!(e.undo().as_deref(), Some("Attach"));
    assert_eq!(end_of(&e, line), Point::new(100, 100));
    assert_eq!(e.elements().get(line).unwrap().ends.unwrap().end_shape, None);
    assert!(e.elements().get(target).unwrap().connections.is_empty());

    assert_eq!(e.redo().as_deref(), Some("ShapeMove"));
    assert_eq!(end_of(&e, line), Point::new(104, 102));
    assert_eq!(e.elements().get(line).unwrap().ends.unwrap().end_shape, Some(target));
}

#[test]
fn fast_drag_off_a_point_detaches() {
    let (mut e, target, line) = snap_scene();
    drag(&mut e, (60, 60), (63, 62));

    e.handle_mouse(MouseEvent::down(63, 62, MouseButtons::Left));
    e.handle_mouse(MouseEvent::moved(55, 62, MouseButtons::Left));
    e.handle_mouse(MouseEvent::up(55, 62));

    assert_eq!(end_of(&e, line), Point::new(96, 102));
    assert_eq!(e.elements().get(line).unwrap().ends.unwrap().end_shape, None);
    assert_eq!(e.undo_stack().stack_info()[..2].to_vec(), vec!["ShapeMove F", "Detach -"]);

    e.undo();
    assert_eq!(end_of(&e, line), Point::new(104, 102));
    assert_eq!(e.elements().get(line).unwrap().ends.unwrap().end_shape, Some(target));
    e.elements().validate().unwrap();
}

#[test]
fn slow_drag_keeps_attached_endpoint_still() {
    let (mut e, target, line) = snap_scene();
    drag(&mut e, (60, 60), (63, 62));

    e.handle_mouse(MouseEvent::down(63, 62, MouseButtons::Left));
    e.handle_mouse(MouseEvent::moved(61, 62, MouseButtons::Left));
    e.handle_mouse(MouseEvent::up(61, 62));

    assert_eq!(end_of(&e, line), Point::new(104, 102));
    assert_eq!(e.elements().get(line).unwrap().ends.unwrap().end_shape, Some(target));
    assert_eq!(e.undo_stack().stack_info()[0], "ShapeMove F");
}

#[test]
fn moving_the_target_drags_the_attached_end() {
    let (mut e, target, line) = snap_scene();
    drag(&mut e, (60, 60), (63, 62));

    drag(&mut e, (150, 100), (160, 110));
    assert_eq!(rect_of(&e, target), Rect::new(114, 87, 80, 50));
    assert_eq!(end_of(&e, line), Point::new(114, 112));
    assert_eq!(e.elements().get(line).unwrap().endpoints().unwrap().0, Point::new(24, 22));
}

#[test]
fn drag_attaches_to_the_closest_of_several_points() {
    let mut e = engine();
    let target = boxed(&mut e, 100, 100, 16, 16);
    let line = e
        .canvas_mut()
        .insert(Shape::connector(ShapeKind::DiagonalConnector, Point::new(20, 20), Point::new(109, 95)))
        .unwrap();
    drag(&mut e, (64, 57), (63, 58));

    assert_eq!(end_of(&e, line), Point::new(108, 100));
    assert_eq!(e.elements().get(line).unwrap().endpoints().unwrap().0, Point::new(19, 25));
    let ends = e.elements().get(line).unwrap().ends.unwrap();
    assert_eq!(ends.end_shape, Some(target));
    let pinned = &e.elements().get(target).unwrap().connections;
    assert_eq!(pinned.len(), 1);
    assert_eq!(pinned[0].element_connection_point.grip, GripType::TopMiddle);
    assert_eq!(pinned[0].to_connection_point.grip, GripType::End);
    e.elements().validate().unwrap();
}

// ─── Surface ────────────────────────────────────────────────────────────

#[test]
fn click_on_empty_surface_deselects_in_one_route() {
    let mut e = engine();
    let b = boxed(&mut e, 25, 50, 100, 50);
    click(&mut e, 50, 70, Modifiers::NONE);
    assert_eq!(e.selected_elements(), &[b]);

    click(&mut e, 300, 250, Modifiers::NONE);
    assert_eq!(fired(&e), vec![RouteName::EndDragSurfaceWithDeselect]);
    assert!(e.selected_elements().is_empty());
    assert!(!e.mouse_state().dragging_surface);

    assert_eq!(e.undo().as_deref(), Some("Canvas"));
    assert_eq!(e.selected_elements(), &[b]);
}

#[test]
fn dragging_the_surface_pans_everything() {
    let mut e = engine();
    let b = boxed(&mut e, 25, 50, 100, 50);
    click(&mut e, 50, 70, Modifiers::NONE);

    e.handle_mouse(MouseEvent::down(300, 250, MouseButtons::Left));
    e.handle_mouse(MouseEvent::moved(310, 260, MouseButtons::Left));
    assert_eq!(e.canvas().cursor(), Cursor::SizeAll);
    e.handle_mouse(MouseEvent::up(310, 260));

    assert_eq!(fired(&e), vec![RouteName::EndDragSurface]);
    assert_eq!(rect_of(&e, b), Rect::new(35, 60, 100, 50));
    assert_eq!(e.selected_elements(), &[b]);
    assert_eq!(e.canvas().cursor(), Cursor::Arrow);
}

// ─── Hover ──────────────────────────────────────────────────────────────

#[test]
fn hover_moves_anchors_between_shapes() {
    let mut e = engine();
    let a = boxed(&mut e, 20, 20, 60, 60);
    let b = boxed(&mut e, 200, 20, 60, 60);

    hover(&mut e, 50, 50);
    assert_eq!(e.mouse_state().hover, Some(a));

    hover(&mut e, 230, 50);
    assert_eq!(fired(&e), vec![RouteName::ShowAnchors, RouteName::ClearAnchorCursor]);
    assert_eq!(e.mouse_state().hover, Some(b));
    assert!(!e.elements().get(a).unwrap().show_anchors);
    assert!(e.elements().get(b).unwrap().show_anchors);

    hover(&mut e, 150, 200);
    assert_eq!(e.mouse_state().hover, None);
    assert!(!e.elements().get(b).unwrap().show_anchors);
}

// ─── Multi-select ───────────────────────────────────────────────────────

#[test]
fn ctrl_click_adds_then_removes() {
    let mut e = engine();
    let a = boxed(&mut e, 50, 50, 40, 40);
    let b = boxed(&mut e, 150, 50, 40, 40);

    click(&mut e, 70, 70, Modifiers::NONE);
    click(&mut e, 170, 70, Modifiers::CTRL);
    assert_eq!(fired(&e), vec![RouteName::EndShapeDrag, RouteName::AddSelectedShape]);
    assert_eq!(e.selected_elements(), &[a, b]);
    assert!(e.mouse_state().just_added.is_empty());

    click(&mut e, 70, 70, Modifiers::CTRL);
    assert!(fired(&e).contains(&RouteName::RemoveSelectedShape));
    assert_eq!(e.selected_elements(), &[b]);

    assert_eq!(e.undo().as_deref(), Some("Deselect"));
    assert!(e.canvas().is_selected(a));
    assert!(e.canvas().is_selected(b));
}

// ─── Selection box ──────────────────────────────────────────────────────

#[test]
fn right_drag_on_surface_selects_enclosed_shapes() {
    let mut e = engine();
    let a = boxed(&mut e, 50, 50, 40, 40);
    let b = boxed(&mut e, 150, 50, 40, 40);
    let c = boxed(&mut e, 300, 200, 40, 40);

    e.handle_mouse(MouseEvent::down(30, 30, MouseButtons::Right));
    assert!(fired(&e).contains(&RouteName::StartDragSelectionBox));
    let marquee = e.mouse_state().selection_box.unwrap();
    assert_eq!(e.elements().len(), 4);

    e.handle_mouse(MouseEvent::moved(220, 120, MouseButtons::Right));
    assert_eq!(rect_of(&e, marquee), Rect::new(30, 30, 190, 90));

    e.handle_mouse(MouseEvent::up(220, 120));
    assert!(!e.elements().contains(marquee));
    assert_eq!(e.elements().len(), 3);
    assert_eq!(e.selected_elements(), &[b, a]);
    assert!(!e.canvas().is_selected(c));

    assert_eq!(e.undo().as_deref(), Some("Group Select"));
    assert!(e.selected_elements().is_empty());
}

#[test]
fn right_click_on_shape_reports_hovered_shape() {
    let mut e = engine();
    let a = boxed(&mut e, 50, 50, 40, 40);
    hover(&mut e, 70, 70);
    e.drain_events();
    e.handle_mouse(MouseEvent::down(70, 70, MouseButtons::Right));
    assert!(e.drain_events().contains(&CanvasEvent::RightClick(Some(a))));
    assert!(!e.mouse_state().dragging_selection_box);
}

// ─── Text editing ───────────────────────────────────────────────────────

#[test]
fn double_click_requests_text_edit_once_per_window() {
    let mut e = engine();
    let a = boxed(&mut e, 50, 50, 40, 40);
    click(&mut e, 70, 70, Modifiers::NONE);
    e.drain_events();

    let edits = |e: &mut Engine| {
        e.drain_events()
            .into_iter()
            .filter(|ev| matches!(ev, CanvasEvent::EditText(_)))
            .count()
    };

    e.handle_mouse(MouseEvent::double_click(70, 70, 1_000));
    assert_eq!(e.drain_events(), vec![CanvasEvent::EditText(Some(a))]);
    e.handle_mouse(MouseEvent::double_click(70, 70, 1_200));
    assert_eq!(edits(&mut e), 0);
    e.handle_mouse(MouseEvent::double_click(70, 70, 1_600));
    assert_eq!(edits(&mut e), 1);
}

#[test]
fn mouse_down_reports_click_position() {
    let mut e = engine();
    e.handle_event(InputEvent::Mouse(MouseEvent::down(12, 34, MouseButtons::Left)));
    assert_eq!(
        e.drain_events()[0],
        CanvasEvent::MouseClick {
            position: Point::new(12, 34),
            buttons: MouseButtons::Left,
        }
    );
}

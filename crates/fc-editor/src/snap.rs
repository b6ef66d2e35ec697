//! Connector snapping.
//!
//! While a connector (or one of its endpoints) is dragged, each motion tick
//! asks `snap` whether the endpoint should jump onto a nearby connection
//! point, leave the one it sits on, or stay put. The connections themselves
//! are only made or broken when the gesture ends (`do_undo_snap_actions`),
//! as entries in the same undo group as the move.

use crate::canvas::CanvasController;
use crate::commands::{Command, UndoStack};
use fc_core::anchor::connection_points;
use fc_core::geometry::Delta;
use fc_core::id::ShapeId;
use fc_core::model::{ConnectionPoint, GripType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapKind {
    /// Move by `delta` to land exactly on the target point.
    Attach,
    /// Leave the target point, moving by the drag delta.
    Detach,
    /// Sitting on a point and the motion was too slow to leave it.
    Attached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapAction {
    pub kind: SnapKind,
    pub connector: ShapeId,
    pub grip: GripType,
    pub target: ShapeId,
    pub connector_point: ConnectionPoint,
    pub target_point: ConnectionPoint,
    pub delta: Delta,
}

/// A connection point of the dragged connector inside a candidate's range.
#[derive(Debug, Clone, Copy)]
struct SnapInfo {
    near: ShapeId,
    connector_point: ConnectionPoint,
}

fn sign_agrees(near: i32, delta: i32) -> bool {
    near.signum() == 0 || delta.signum() == 0 || near.signum() == delta.signum()
}

#[derive(Debug, Default)]
pub struct SnapEngine {
    currently_near: Vec<SnapInfo>,
    snap_actions: Vec<SnapAction>,
    current_action: Option<SnapAction>,
    running_delta: Delta,
    by_key_press: bool,
}

impl SnapEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Net motion applied during the current gesture.
    pub fn running_delta(&self) -> Delta {
        self.running_delta
    }

    pub fn update_running_delta(&mut self, delta: Delta) {
        self.running_delta += delta;
    }

    pub fn is_by_key_press(&self) -> bool {
        self.by_key_press
    }

    /// Keyboard nudges move one unit at a time, so any motion off a
    /// coincident point detaches.
    pub fn set_by_key_press(&mut self, by_key_press: bool) {
        self.by_key_press = by_key_press;
    }

    /// The pending action that the next flush will commit last.
    pub fn current_action(&self) -> Option<&SnapAction> {
        self.current_action.as_ref()
    }

    /// Superseded actions waiting for the flush, oldest first.
    pub fn pending_actions(&self) -> &[SnapAction] {
        &self.snap_actions
    }

    pub fn reset(&mut self) {
        self.snap_actions.clear();
        self.running_delta = Delta::ZERO;
        self.current_action = None;
    }

    /// Decide what a drag of the selected connector's `grip` end (every
    /// end for `GripType::None`) by `delta` should do.
    ///
    /// Runs only with exactly one connector selected. Candidate shapes get
    /// their connection points highlighted; shapes that dropped out of range
    /// since the previous call are cleared.
    pub fn snap(&mut self, canvas: &mut CanvasController, grip: GripType, delta: Delta) -> Option<SnapAction> {
        let &[selected] = canvas.selected_elements() else {
            return None;
        };
        let connector = canvas.elements().get(selected)?;
        if !connector.is_connector() {
            return None;
        }
        let points: Vec<ConnectionPoint> = connection_points(connector)
            .into_iter()
            .filter(|cp| grip == GripType::None || cp.grip == grip)
            .collect();

        let near = self.nearby_elements(canvas, selected, &points);
        for info in &near {
            canvas.set_show_connection_points(info.near, true);
        }
        for info in &self.currently_near {
            if !near.iter().any(|n| n.near == info.near) {
                canvas.set_show_connection_points(info.near, false);
            }
        }
        self.currently_near = near.clone();

        let range = canvas.config().snap.connection_point_range;
        let velocity = canvas.config().snap.detach_velocity;

        // Nearest target point within range of each candidate, then the
        // candidates themselves nearest first.
        let mut candidates: Vec<(SnapInfo, ConnectionPoint, Delta)> = near
            .into_iter()
            .filter_map(|info| {
                let shape = canvas.elements().get(info.near)?;
                let from = info.connector_point.point;
                let target = connection_points(shape)
                    .into_iter()
                    .filter(|cp| cp.point.is_near(from, range))
                    .min_by_key(|cp| (cp.point - from).abs().manhattan())?;
                Some((info, target, target.point - info.connector_point.point))
            })
            .collect();
        candidates.sort_by_key(|(_, _, offset)| offset.abs().manhattan());

        for (info, target_point, offset) in candidates {
            if !(sign_agrees(offset.dx, delta.dx) && sign_agrees(offset.dy, delta.dy)) {
                continue;
            }
            let action = |kind, delta| SnapAction {
                kind,
                connector: selected,
                grip,
                target: info.near,
                connector_point: info.connector_point,
                target_point,
                delta,
            };
            let coincident = offset.is_zero();
            let fast = delta.dx.abs() >= velocity || delta.dy.abs() >= velocity;
            let nudged_off = self.by_key_press && !delta.is_zero();

            let decided = if coincident && (fast || nudged_off) {
                action(SnapKind::Detach, delta)
            } else if !coincident {
                action(SnapKind::Attach, offset)
            } else {
                action(SnapKind::Attached, Delta::ZERO)
            };
            log::debug!("snap {:?} {selected} {grip:?} -> {} {:?}", decided.kind, info.near, target_point.grip);
            return Some(decided);
        }
        None
    }

    /// Non-connector, on-screen shapes whose rectangle, grown by the snap
    /// range, contains one of `points`. One entry per (shape, point) pair.
    fn nearby_elements(&self, canvas: &CanvasController, selected: ShapeId, points: &[ConnectionPoint]) -> Vec<SnapInfo> {
        let range = canvas.config().snap.element_range;
        let mut near = Vec::new();
        for shape in canvas.elements().iter() {
            if shape.id == selected || shape.is_connector() || !canvas.is_on_screen(shape.id) {
                continue;
            }
            let check = shape.rect.grow_uniform(range);
            for cp in points {
                if check.contains(cp.point) {
                    near.push(SnapInfo {
                        near: shape.id,
                        connector_point: *cp,
                    });
                }
            }
        }
        near
    }

    /// Run `snap` and apply its motion through `update`. Returns whether
    /// the snap engine handled the tick; when it did not, the caller moves
    /// by the raw delta itself.
    pub fn snap_check(
        &mut self,
        canvas: &mut CanvasController,
        grip: GripType,
        delta: Delta,
        update: impl FnOnce(&mut CanvasController, Delta),
    ) -> bool {
        let Some(action) = self.snap(canvas, grip, delta) else {
            return false;
        };
        match action.kind {
            SnapKind::Attach | SnapKind::Detach => {
                self.running_delta += action.delta;
                update(canvas, action.delta);
                self.set_current_action(action);
            }
            SnapKind::Attached => {}
        }
        true
    }

    /// Track the newest attach/detach. A different target, grip or point
    /// pushes the previous one to the pending list; the same one again is
    /// the user reversing it, so both cancel out.
    fn set_current_action(&mut self, action: SnapAction) {
        match self.current_action.take() {
            None => self.current_action = Some(action),
            Some(current)
                if current.target != action.target
                    || current.grip != action.grip
                    || current.target_point != action.target_point =>
            {
                self.snap_actions.push(current);
                self.current_action = Some(action);
            }
            Some(_) => {}
        }
    }

    /// Commit pending attach/detach actions as undo entries that keep the
    /// group open, so the move entry that follows closes it. Detaches from
    /// a target the endpoint is not pinned to are dropped. Returns the
    /// number of entries pushed.
    pub fn do_undo_snap_actions(&mut self, undo: &mut UndoStack<CanvasController>, canvas: &mut CanvasController) -> usize {
        let mut actions = std::mem::take(&mut self.snap_actions);
        actions.extend(self.current_action.take());
        let mut pushed = 0;

        for action in actions {
            match action.kind {
                SnapKind::Attach => {
                    let cmd = Command::new(
                        "Attach",
                        move |c: &mut CanvasController| attach(c, &action),
                        move |c: &mut CanvasController| {
                            c.detach(action.connector, action.grip);
                        },
                    );
                    undo.do_action(canvas, cmd.unfinished());
                    pushed += 1;
                }
                SnapKind::Detach => {
                    let pinned = canvas
                        .elements()
                        .get(action.connector)
                        .and_then(|s| s.ends)
                        .and_then(|e| e.shape_at(action.grip));
                    if pinned != Some(action.target) {
                        log::debug!("skip detach of {} from {}: not attached", action.connector, action.target);
                        continue;
                    }
                    let cmd = Command::new(
                        "Detach",
                        move |c: &mut CanvasController| {
                            c.detach(action.connector, action.grip);
                        },
                        move |c: &mut CanvasController| attach(c, &action),
                    );
                    undo.do_action(canvas, cmd.unfinished());
                    pushed += 1;
                }
                SnapKind::Attached => {}
            }
        }
        pushed
    }

    /// Clear every highlight left by the last `snap` call.
    pub fn hide_connection_points(&mut self, canvas: &mut CanvasController) {
        for info in self.currently_near.drain(..) {
            canvas.set_show_connection_points(info.near, false);
        }
    }
}

fn attach(canvas: &mut CanvasController, action: &SnapAction) {
    if let Err(e) = canvas.attach(action.connector, action.connector_point, action.target, action.target_point) {
        log::warn!("attach {} to {}: {e}", action.connector, action.target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_core::config::{EngineConfig, SurfaceConfig};
    use fc_core::geometry::{Point, Rect};
    use fc_core::model::{Shape, ShapeKind};
    use pretty_assertions::assert_eq;

    fn canvas() -> CanvasController {
        CanvasController::new(EngineConfig {
            surface: SurfaceConfig {
                width: 400,
                height: 300,
                ..SurfaceConfig::default()
            },
            ..EngineConfig::default()
        })
        .unwrap()
    }

    /// A box whose left-middle point is (104, 102), and a diagonal
    /// connector ending at (100, 100).
    fn scene() -> (CanvasController, ShapeId, ShapeId) {
        let mut c = canvas();
        let target = c.insert(Shape::new(ShapeKind::Box, Rect::new(104, 77, 80, 50))).unwrap();
        let line = c
            .insert(Shape::connector(ShapeKind::DiagonalConnector, Point::new(20, 20), Point::new(100, 100)))
            .unwrap();
        c.select_element(line);
        (c, target, line)
    }

    #[test]
    fn approaching_point_attaches_with_exact_offset() {
        let (mut c, target, line) = scene();
        let mut snap = SnapEngine::new();
        let action = snap.snap(&mut c, GripType::End, Delta::new(3, 2)).unwrap();
        assert_eq!(action.kind, SnapKind::Attach);
        assert_eq!(action.delta, Delta::new(4, 2));
        assert_eq!(action.target, target);
        assert_eq!(action.connector, line);
        assert_eq!(action.target_point.grip, GripType::LeftMiddle);
        assert!(c.elements().get(target).unwrap().show_connection_points);
    }

    #[test]
    fn moving_away_does_not_attach() {
        let (mut c, _, _) = scene();
        let mut snap = SnapEngine::new();
        assert_eq!(snap.snap(&mut c, GripType::End, Delta::new(-3, -2)), None);
    }

    #[test]
    fn start_grip_is_out_of_range() {
        let (mut c, _, _) = scene();
        let mut snap = SnapEngine::new();
        assert_eq!(snap.snap(&mut c, GripType::Start, Delta::new(3, 2)), None);
    }

    #[test]
    fn coincident_point_detaches_only_when_fast() {
        let (mut c, _, line) = scene();
        let mut snap = SnapEngine::new();
        c.drag_selected_elements(Delta::new(4, 2));

        let slow = snap.snap(&mut c, GripType::End, Delta::new(2, 1)).unwrap();
        assert_eq!(slow.kind, SnapKind::Attached);

        let fast = snap.snap(&mut c, GripType::End, Delta::new(-6, 0)).unwrap();
        assert_eq!(fast.kind, SnapKind::Detach);
        assert_eq!(fast.delta, Delta::new(-6, 0));
        assert_eq!(fast.connector, line);
    }

    #[test]
    fn key_press_detaches_on_any_motion() {
        let (mut c, _, _) = scene();
        let mut snap = SnapEngine::new();
        c.drag_selected_elements(Delta::new(4, 2));
        snap.set_by_key_press(true);
        let action = snap.snap(&mut c, GripType::End, Delta::new(-1, 0)).unwrap();
        assert_eq!(action.kind, SnapKind::Detach);
    }

    #[test]
    fn snap_needs_a_single_selected_connector() {
        let (mut c, target, _) = scene();
        let mut snap = SnapEngine::new();
        c.select_element(target);
        assert_eq!(snap.snap(&mut c, GripType::End, Delta::new(3, 2)), None);

        c.deselect_current_selected_elements();
        c.select_element(target);
        assert_eq!(snap.snap(&mut c, GripType::None, Delta::new(3, 2)), None);
    }

    #[test]
    fn snap_check_moves_and_records() {
        let (mut c, _, line) = scene();
        let mut snap = SnapEngine::new();
        let handled = snap.snap_check(&mut c, GripType::End, Delta::new(3, 2), |c, d| c.drag_selected_elements(d));
        assert!(handled);
        assert_eq!(snap.running_delta(), Delta::new(4, 2));
        assert_eq!(c.elements().get(line).unwrap().endpoints().unwrap().1, Point::new(104, 102));
        assert_eq!(snap.current_action().map(|a| a.kind), Some(SnapKind::Attach));
    }

    #[test]
    fn reattach_cancels_pending_action() {
        let (mut c, _, _) = scene();
        let mut snap = SnapEngine::new();
        snap.snap_check(&mut c, GripType::End, Delta::new(3, 2), |c, d| c.drag_selected_elements(d));
        snap.snap_check(&mut c, GripType::End, Delta::new(-6, 0), |c, d| c.drag_selected_elements(d));
        assert!(snap.current_action().is_none());
        assert!(snap.pending_actions().is_empty());
        assert_eq!(snap.running_delta(), Delta::new(-2, 2));
    }

    #[test]
    fn flush_attaches_and_undo_detaches() {
        let (mut c, target, line) = scene();
        let mut snap = SnapEngine::new();
        let mut undo = UndoStack::new(100);
        snap.snap_check(&mut c, GripType::End, Delta::new(3, 2), |c, d| c.drag_selected_elements(d));
        assert_eq!(snap.do_undo_snap_actions(&mut undo, &mut c), 1);

        assert_eq!(c.elements().get(line).unwrap().ends.unwrap().end_shape, Some(target));
        assert_eq!(undo.stack_info(), vec!["Attach -"]);
        c.elements().validate().unwrap();

        undo.undo(&mut c);
        assert_eq!(c.elements().get(line).unwrap().ends.unwrap().end_shape, None);
        assert!(c.elements().get(target).unwrap().connections.is_empty());
    }

    #[test]
    fn nearest_point_on_a_small_shape_wins() {
        let mut c = canvas();
        let target = c.insert(Shape::new(ShapeKind::Box, Rect::new(100, 100, 16, 16))).unwrap();
        let line = c
            .insert(Shape::connector(ShapeKind::DiagonalConnector, Point::new(20, 20), Point::new(109, 95)))
            .unwrap();
        c.select_element(line);
        let mut snap = SnapEngine::new();

        // Top-left (100, 100) is in range too, but top-middle is closer.
        let action = snap.snap(&mut c, GripType::End, Delta::new(-1, 1)).unwrap();
        assert_eq!(action.kind, SnapKind::Attach);
        assert_eq!(action.target, target);
        assert_eq!(action.target_point.grip, GripType::TopMiddle);
        assert_eq!(action.target_point.point, Point::new(108, 100));
        assert_eq!(action.delta, Delta::new(-1, 5));
    }

    #[test]
    fn nearer_candidate_shape_wins_regardless_of_z_order() {
        let mut c = canvas();
        let near = c.insert(Shape::new(ShapeKind::Box, Rect::new(102, 101, 40, 40))).unwrap();
        let far = c.insert(Shape::new(ShapeKind::Box, Rect::new(106, 83, 60, 40))).unwrap();
        let line = c
            .insert(Shape::connector(ShapeKind::DiagonalConnector, Point::new(20, 20), Point::new(100, 100)))
            .unwrap();
        c.select_element(line);
        let mut snap = SnapEngine::new();

        let action = snap.snap(&mut c, GripType::End, Delta::new(3, 2)).unwrap();
        assert_eq!(action.target, near);
        assert_eq!(action.target_point.grip, GripType::TopLeft);
        assert_eq!(action.delta, Delta::new(2, 1));
        assert!(c.elements().get(far).unwrap().show_connection_points);
    }

    #[test]
    fn nearest_candidate_moving_away_falls_through_to_the_next() {
        let mut c = canvas();
        // Top-right (97, 101) is closest but behind the motion; left-middle
        // (106, 103) is ahead of it.
        let behind = c.insert(Shape::new(ShapeKind::Box, Rect::new(60, 101, 37, 40))).unwrap();
        let ahead = c.insert(Shape::new(ShapeKind::Box, Rect::new(106, 83, 60, 40))).unwrap();
        let line = c
            .insert(Shape::connector(ShapeKind::DiagonalConnector, Point::new(20, 20), Point::new(100, 100)))
            .unwrap();
        c.select_element(line);
        let mut snap = SnapEngine::new();

        let action = snap.snap(&mut c, GripType::End, Delta::new(3, 2)).unwrap();
        assert_ne!(action.target, behind);
        assert_eq!(action.target, ahead);
        assert_eq!(action.target_point.grip, GripType::LeftMiddle);
        assert_eq!(action.delta, Delta::new(6, 3));
    }

    #[test]
    fn hide_clears_highlights() {
        let (mut c, target, _) = scene();
        let mut snap = SnapEngine::new();
        snap.snap(&mut c, GripType::End, Delta::new(3, 2));
        snap.hide_connection_points(&mut c);
        assert!(!c.elements().get(target).unwrap().show_connection_points);
    }
}

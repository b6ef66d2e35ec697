//! The interaction engine: one owner for the canvas, the undo stack, the
//! snap engine and the mouse gesture state.
//!
//! Hosts feed `InputEvent`s through `handle_event` and drain
//! `CanvasEvent`s afterwards. Programmatic edits (a property panel, a
//! toolbox) use the typed methods below; each one is a single undo group.

use crate::canvas::{CanvasController, CanvasEvent};
use crate::commands::{Command, UndoStack};
use crate::input::{InputEvent, KeyEvent, MouseEvent};
use crate::router::{self, MouseState};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::snap::SnapEngine;
use fc_core::config::EngineConfig;
use fc_core::elements::Elements;
use fc_core::error::CanvasError;
use fc_core::geometry::Delta;
use fc_core::id::ShapeId;
use fc_core::model::{GripType, Shape, ShapeKind, Style};
use fc_core::persist::Snapshot;

pub struct Engine {
    pub(crate) canvas: CanvasController,
    pub(crate) undo: UndoStack<CanvasController>,
    pub(crate) snap: SnapEngine,
    pub(crate) mouse: MouseState,
    clipboard: Option<Snapshot>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, CanvasError> {
        Self::with_elements(Elements::new(), config)
    }

    pub fn with_elements(elements: Elements, config: EngineConfig) -> Result<Self, CanvasError> {
        let depth = config.undo_depth;
        Ok(Self {
            canvas: CanvasController::with_elements(elements, config)?,
            undo: UndoStack::new(depth),
            snap: SnapEngine::new(),
            mouse: MouseState::default(),
            clipboard: None,
        })
    }

    /// Load a serialized canvas, replacing everything and clearing history.
    pub fn load_json(&mut self, text: &str) -> Result<(), CanvasError> {
        let elements = Snapshot::from_json(text)?.restore()?;
        self.load(elements)
    }

    pub fn load(&mut self, elements: Elements) -> Result<(), CanvasError> {
        self.canvas.load(elements)?;
        self.clear_state();
        Ok(())
    }

    pub fn save_json(&self) -> Result<String, CanvasError> {
        Snapshot::of_all(self.canvas.elements()).to_json()
    }

    /// Forget gesture state, history and pending snap actions.
    pub fn clear_state(&mut self) {
        self.undo.clear_stacks();
        self.snap.reset();
        self.mouse = MouseState::default();
    }

    // ─── Accessors ──────────────────────────────────────────────────────

    pub fn canvas(&self) -> &CanvasController {
        &self.canvas
    }

    /// Direct canvas access for collaborators. Changes made here bypass
    /// the undo stack; wrap them in `undo_redo` to make them undoable.
    pub fn canvas_mut(&mut self) -> &mut CanvasController {
        &mut self.canvas
    }

    pub fn undo_stack(&self) -> &UndoStack<CanvasController> {
        &self.undo
    }

    pub fn snap_engine(&self) -> &SnapEngine {
        &self.snap
    }

    pub fn mouse_state(&self) -> &MouseState {
        &self.mouse
    }

    pub fn elements(&self) -> &Elements {
        self.canvas.elements()
    }

    pub fn selected_elements(&self) -> &[ShapeId] {
        self.canvas.selected_elements()
    }

    pub fn drain_events(&mut self) -> Vec<CanvasEvent> {
        self.canvas.drain_events()
    }

    pub fn clipboard(&self) -> Option<&Snapshot> {
        self.clipboard.as_ref()
    }

    // ─── Input ──────────────────────────────────────────────────────────

    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::Mouse(mouse) => self.handle_mouse(mouse),
            InputEvent::Key(key) => {
                self.handle_key(&key);
            }
        }
    }

    pub fn handle_mouse(&mut self, event: MouseEvent) {
        router::route(self, event);
    }

    /// Resolve and perform a key binding. Returns the action taken.
    pub fn handle_key(&mut self, event: &KeyEvent) -> Option<ShortcutAction> {
        let m = event.modifiers;
        let action = ShortcutMap::resolve(&event.key, m.ctrl, m.shift, m.alt, m.meta)?;
        self.perform(action);
        Some(action)
    }

    pub fn perform(&mut self, action: ShortcutAction) {
        log::debug!("perform {action:?}");
        match action {
            ShortcutAction::Undo => {
                self.undo();
            }
            ShortcutAction::Redo => {
                self.redo();
            }
            ShortcutAction::Delete => self.delete_selected(),
            ShortcutAction::SelectAll => self.select_all(),
            ShortcutAction::Copy => {
                self.copy_selected();
            }
            ShortcutAction::Cut => self.cut_selected(),
            ShortcutAction::Paste => {
                if let Err(e) = self.paste() {
                    log::warn!("paste: {e}");
                }
            }
            ShortcutAction::Group => {
                if let Err(e) = self.group_selected() {
                    log::warn!("group: {e}");
                }
            }
            ShortcutAction::Ungroup => self.ungroup_selected(),
            ShortcutAction::BringToFront => self.reorder_selected("Topmost", CanvasController::topmost),
            ShortcutAction::SendToBack => self.reorder_selected("Bottommost", CanvasController::bottommost),
            ShortcutAction::BringForward => self.reorder_selected("MoveUp", CanvasController::move_up),
            ShortcutAction::SendBackward => self.reorder_selected("MoveDown", CanvasController::move_down),
            ShortcutAction::NudgeLeft
            | ShortcutAction::NudgeRight
            | ShortcutAction::NudgeUp
            | ShortcutAction::NudgeDown => {
                if let Some(delta) = action.nudge_delta() {
                    self.nudge(delta);
                }
            }
            ShortcutAction::Deselect => self.deselect_all(),
        }
    }

    // ─── History ────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> Option<String> {
        self.undo.undo(&mut self.canvas)
    }

    pub fn redo(&mut self) -> Option<String> {
        self.undo.redo(&mut self.canvas)
    }

    /// Run `do_it` now and record it with its inverse.
    pub fn undo_redo(
        &mut self,
        name: impl Into<String>,
        do_it: impl FnMut(&mut CanvasController) + 'static,
        undo_it: impl FnMut(&mut CanvasController) + 'static,
    ) {
        self.undo.undo_redo(&mut self.canvas, name, do_it, undo_it, true);
    }

    /// `undo_redo` with a separate redo action.
    pub fn undo_redo_with(
        &mut self,
        name: impl Into<String>,
        do_it: impl FnMut(&mut CanvasController) + 'static,
        undo_it: impl FnMut(&mut CanvasController) + 'static,
        redo_it: impl FnMut(&mut CanvasController) + 'static,
    ) {
        self.undo
            .undo_redo_with(&mut self.canvas, name, do_it, undo_it, true, redo_it);
    }

    pub fn do_command(&mut self, command: Command<CanvasController>) {
        self.undo.do_action(&mut self.canvas, command);
    }

    // ─── Shapes ─────────────────────────────────────────────────────────

    /// Insert `shape` on top of the z-order as an undoable "Insert".
    pub fn add_shape(&mut self, shape: Shape) -> Result<ShapeId, CanvasError> {
        let id = shape.id;
        if self.canvas.elements().contains(id) {
            return Err(CanvasError::DuplicateShape(id));
        }
        self.undo_redo(
            "Insert",
            move |c| {
                if let Err(e) = c.insert(shape.clone()) {
                    log::warn!("insert {id}: {e}");
                }
            },
            move |c| {
                c.deselect_element(id);
                c.delete_element(id);
            },
        );
        Ok(id)
    }

    /// Delete the selection. Group members are released, connections are
    /// broken; undo puts everything back where it was.
    pub fn delete_selected(&mut self) {
        let ids = self.canvas.selected_elements().to_vec();
        if ids.is_empty() {
            return;
        }
        let removed = self.canvas.capture_removal(&ids);
        let reselect = ids.clone();
        self.undo_redo(
            "Delete",
            move |c| {
                c.deselect_current_selected_elements();
                c.delete_elements(&ids);
            },
            move |c| {
                if let Err(e) = c.restore_removed(&removed) {
                    log::warn!("restore deleted shapes: {e}");
                }
                c.select_elements(&reselect);
            },
        );
        if self.mouse.hover.is_some_and(|h| !self.canvas.elements().contains(h)) {
            self.mouse.hover = None;
        }
    }

    // ─── Clipboard ──────────────────────────────────────────────────────

    /// Copy the selection (with group members) into the clipboard.
    pub fn copy_selected(&mut self) -> Option<&Snapshot> {
        let selected = self.canvas.selected_elements();
        if selected.is_empty() {
            return None;
        }
        self.clipboard = Some(Snapshot::capture(self.canvas.elements(), selected));
        self.clipboard.as_ref()
    }

    pub fn cut_selected(&mut self) {
        if self.copy_selected().is_some() {
            self.delete_selected();
        }
    }

    /// Paste the clipboard as fresh shapes, offset from the originals, and
    /// select the pasted roots.
    pub fn paste(&mut self) -> Result<Vec<ShapeId>, CanvasError> {
        let Some(snapshot) = self.clipboard.clone() else {
            return Ok(Vec::new());
        };
        let offset = self.canvas.config().paste_offset;
        let mut shapes = snapshot.instantiate();
        for shape in &mut shapes {
            shape.translate(offset);
        }
        // Keep the next paste from landing on this one.
        self.clipboard = Some(Snapshot {
            shapes: shapes.clone(),
            ..snapshot
        });
        self.paste_shapes(shapes)
    }

    /// Paste a JSON snapshot produced by `Snapshot::to_json`.
    pub fn paste_json(&mut self, text: &str) -> Result<Vec<ShapeId>, CanvasError> {
        self.clipboard = Some(Snapshot::from_json(text)?);
        self.paste()
    }

    fn paste_shapes(&mut self, shapes: Vec<Shape>) -> Result<Vec<ShapeId>, CanvasError> {
        let ids: Vec<ShapeId> = shapes.iter().map(|s| s.id).collect();
        let roots: Vec<ShapeId> = shapes.iter().filter(|s| s.parent.is_none()).map(|s| s.id).collect();
        if let Some(&dup) = ids.iter().find(|&&id| self.canvas.elements().contains(id)) {
            return Err(CanvasError::DuplicateShape(dup));
        }
        let previous = self.canvas.selected_elements().to_vec();
        let selection = roots.clone();
        let inserted = ids.clone();
        self.undo_redo(
            "Paste",
            move |c| {
                if let Err(e) = c.insert_shapes(shapes.clone()) {
                    log::warn!("paste: {e}");
                }
                c.deselect_current_selected_elements();
                c.select_elements(&selection);
            },
            move |c| {
                c.deselect_current_selected_elements();
                c.delete_elements(&inserted);
                c.select_elements(&previous);
            },
        );
        Ok(roots)
    }

    // ─── Selection ──────────────────────────────────────────────────────

    pub fn select_all(&mut self) {
        let roots: Vec<ShapeId> = self
            .canvas
            .elements()
            .iter()
            .filter(|s| s.parent.is_none())
            .map(|s| s.id)
            .collect();
        self.replace_selection("Select All", roots);
    }

    pub fn deselect_all(&mut self) {
        self.replace_selection("Canvas", Vec::new());
    }

    /// Replace the selection with `ids`, undoably. No entry when nothing
    /// changes.
    pub fn select(&mut self, ids: &[ShapeId]) {
        self.replace_selection("Select", ids.to_vec());
    }

    fn replace_selection(&mut self, name: &str, ids: Vec<ShapeId>) {
        let previous = self.canvas.selected_elements().to_vec();
        if previous == ids {
            return;
        }
        self.undo_redo(
            name,
            move |c| {
                c.deselect_current_selected_elements();
                c.select_elements(&ids);
            },
            move |c| {
                c.deselect_current_selected_elements();
                c.select_elements(&previous);
            },
        );
    }

    // ─── Keyboard motion ────────────────────────────────────────────────

    /// Move the selection by `delta` as one "KeyboardMove" entry. A lone
    /// connector snaps, and any motion off a connection point detaches it.
    pub fn nudge(&mut self, delta: Delta) {
        if self.canvas.selected_elements().is_empty() {
            return;
        }
        self.snap.reset();
        self.snap.set_by_key_press(true);

        let single_connector = match self.canvas.selected_elements() {
            &[only] => self.canvas.elements().get(only).is_some_and(|s| s.is_connector()),
            _ => false,
        };
        let drag = |c: &mut CanvasController, d: Delta| c.drag_selected_elements(d);
        let snapped = single_connector
            && (self.snap.snap_check(&mut self.canvas, GripType::Start, delta, drag)
                || self.snap.snap_check(&mut self.canvas, GripType::End, delta, drag));
        if !snapped {
            self.canvas.drag_selected_elements(delta);
            self.snap.update_running_delta(delta);
        }

        let flushed = self.snap.do_undo_snap_actions(&mut self.undo, &mut self.canvas);
        let moved = self.snap.running_delta();
        if !moved.is_zero() {
            let cmd = Command::new(
                "KeyboardMove",
                |_: &mut CanvasController| {},
                move |c: &mut CanvasController| c.drag_selected_elements(-moved),
            )
            .with_redo(move |c: &mut CanvasController| c.drag_selected_elements(moved));
            self.undo.do_action(&mut self.canvas, cmd);
        } else if flushed > 0 {
            self.undo.finish_group(true);
        }
        self.snap.hide_connection_points(&mut self.canvas);
        self.snap.reset();
        self.snap.set_by_key_press(false);
    }

    // ─── Groups ─────────────────────────────────────────────────────────

    /// Group the selected free shapes and select the new group box.
    /// Selected group members stay where they are.
    pub fn group_selected(&mut self) -> Result<Option<ShapeId>, CanvasError> {
        let previous = self.canvas.selected_elements().to_vec();
        let mut children = Vec::with_capacity(previous.len());
        for &id in &previous {
            if self.canvas.elements().shape(id)?.parent.is_none() {
                children.push(id);
            }
        }
        if children.is_empty() {
            return Ok(None);
        }
        let group = ShapeId::fresh(ShapeKind::GroupBox.tag());
        self.undo_redo(
            "Group",
            move |c| {
                c.deselect_current_selected_elements();
                if let Err(e) = c.group_shapes_as(group, &children) {
                    log::warn!("group: {e}");
                }
                c.select_element(group);
            },
            move |c| {
                c.deselect_current_selected_elements();
                c.ungroup_shapes(&[group]);
                c.select_elements(&previous);
            },
        );
        Ok(Some(group))
    }

    /// Dissolve every selected group box and select its former members.
    pub fn ungroup_selected(&mut self) {
        let previous = self.canvas.selected_elements().to_vec();
        let groups: Vec<ShapeId> = previous
            .iter()
            .copied()
            .filter(|&id| self.canvas.elements().get(id).is_some_and(|s| s.is_group()))
            .collect();
        if groups.is_empty() {
            return;
        }
        let removed = self.canvas.capture_removal(&groups);
        let members: Vec<ShapeId> = groups
            .iter()
            .filter_map(|&g| self.canvas.elements().get(g))
            .flat_map(|g| g.children.iter().copied())
            .collect();
        self.undo_redo(
            "Ungroup",
            move |c| {
                c.deselect_current_selected_elements();
                c.ungroup_shapes(&groups);
                c.select_elements(&members);
            },
            move |c| {
                c.deselect_current_selected_elements();
                if let Err(e) = c.restore_removed(&removed) {
                    log::warn!("regroup: {e}");
                }
                c.select_elements(&previous);
            },
        );
    }

    // ─── Z-order ────────────────────────────────────────────────────────

    fn reorder_selected(&mut self, name: &str, change: fn(&mut CanvasController)) {
        if self.canvas.selected_elements().is_empty() {
            return;
        }
        let before = self.canvas.elements().ids().to_vec();
        self.undo_redo(name, change, move |c| c.restore_order(&before));
    }

    pub fn bring_to_front(&mut self) {
        self.reorder_selected("Topmost", CanvasController::topmost);
    }

    pub fn send_to_back(&mut self) {
        self.reorder_selected("Bottommost", CanvasController::bottommost);
    }

    pub fn bring_forward(&mut self) {
        self.reorder_selected("MoveUp", CanvasController::move_up);
    }

    pub fn send_backward(&mut self) {
        self.reorder_selected("MoveDown", CanvasController::move_down);
    }

    // ─── Properties ─────────────────────────────────────────────────────

    /// Replace the text of `id` undoably. Returns false for unknown shapes.
    pub fn set_text(&mut self, id: ShapeId, text: impl Into<String>) -> bool {
        let Some(previous) = self.canvas.elements().get(id).map(|s| s.text.clone()) else {
            return false;
        };
        let text = text.into();
        self.undo_redo(
            "Text",
            move |c| {
                c.set_text(id, text.clone());
            },
            move |c| {
                c.set_text(id, previous.clone());
            },
        );
        true
    }

    /// Replace the style of `id` undoably. Returns false for unknown shapes.
    pub fn set_style(&mut self, id: ShapeId, style: Style) -> bool {
        let Some(previous) = self.canvas.elements().get(id).map(|s| s.style) else {
            return false;
        };
        self.undo_redo(
            "Style",
            move |c| {
                c.set_style(id, style);
            },
            move |c| {
                c.set_style(id, previous);
            },
        );
        true
    }
}

//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. `ctrl` and
//! `meta` are interchangeable so the same table serves every platform.

use fc_core::geometry::Delta;

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Edit ──
    Undo,
    Redo,
    Delete,
    SelectAll,
    Copy,
    Cut,
    Paste,

    // ── Grouping ──
    Group,
    Ungroup,

    // ── Z-order ──
    BringToFront,
    SendToBack,
    BringForward,
    SendBackward,

    // ── Nudge ──
    NudgeLeft,
    NudgeRight,
    NudgeUp,
    NudgeDown,

    Deselect,
}

impl ShortcutAction {
    /// Unit motion for the nudge actions.
    pub fn nudge_delta(self) -> Option<Delta> {
        match self {
            ShortcutAction::NudgeLeft => Some(Delta::new(-1, 0)),
            ShortcutAction::NudgeRight => Some(Delta::new(1, 0)),
            ShortcutAction::NudgeUp => Some(Delta::new(0, -1)),
            ShortcutAction::NudgeDown => Some(Delta::new(0, 1)),
            _ => None,
        }
    }
}

pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`).
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(key: &str, ctrl: bool, shift: bool, _alt: bool, meta: bool) -> Option<ShortcutAction> {
        let cmd = ctrl || meta;

        if cmd && shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                "[" | "{" => Some(ShortcutAction::SendToBack),
                "]" | "}" => Some(ShortcutAction::BringToFront),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                "a" | "A" => Some(ShortcutAction::SelectAll),
                "c" | "C" => Some(ShortcutAction::Copy),
                "x" | "X" => Some(ShortcutAction::Cut),
                "v" | "V" => Some(ShortcutAction::Paste),
                "g" | "G" => Some(ShortcutAction::Group),
                "u" | "U" => Some(ShortcutAction::Ungroup),
                "[" => Some(ShortcutAction::SendBackward),
                "]" => Some(ShortcutAction::BringForward),
                _ => None,
            };
        }

        match key {
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            "Escape" => Some(ShortcutAction::Deselect),
            "ArrowLeft" => Some(ShortcutAction::NudgeLeft),
            "ArrowRight" => Some(ShortcutAction::NudgeRight),
            "ArrowUp" => Some(ShortcutAction::NudgeUp),
            "ArrowDown" => Some(ShortcutAction::NudgeDown),
            _ => None,
        }
    }
}

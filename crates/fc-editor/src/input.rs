//! Pointer and keyboard input events fed to the engine.

use fc_core::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    Down,
    Up,
    Move,
    DoubleClick,
}

/// Buttons held while the event fired. Up events usually report `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MouseButtons {
    #[default]
    None,
    Left,
    Right,
    Middle,
}

/// Modifier key state (from the platform event).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const CTRL: Modifiers = Modifiers {
        shift: false,
        ctrl: true,
        alt: false,
        meta: false,
    };

    /// Multi-select is Ctrl alone.
    pub fn is_multi_select(&self) -> bool {
        self.ctrl && !self.shift && !self.alt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub position: Point,
    pub buttons: MouseButtons,
    pub modifiers: Modifiers,
    /// Milliseconds on a monotonic clock chosen by the host.
    pub timestamp_ms: u64,
}

impl MouseEvent {
    pub fn new(kind: MouseEventKind, x: i32, y: i32, buttons: MouseButtons) -> Self {
        Self {
            kind,
            position: Point::new(x, y),
            buttons,
            modifiers: Modifiers::NONE,
            timestamp_ms: 0,
        }
    }

    pub fn down(x: i32, y: i32, buttons: MouseButtons) -> Self {
        Self::new(MouseEventKind::Down, x, y, buttons)
    }

    pub fn up(x: i32, y: i32) -> Self {
        Self::new(MouseEventKind::Up, x, y, MouseButtons::None)
    }

    pub fn moved(x: i32, y: i32, buttons: MouseButtons) -> Self {
        Self::new(MouseEventKind::Move, x, y, buttons)
    }

    pub fn double_click(x: i32, y: i32, timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            ..Self::new(MouseEventKind::DoubleClick, x, y, MouseButtons::Left)
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn at(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }
}

/// A key press. `key` follows `KeyboardEvent.key` naming ("z", "Delete",
/// "ArrowLeft").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: String,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }
}

/// Everything `Engine::handle_event` accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Mouse(MouseEvent),
    Key(KeyEvent),
}

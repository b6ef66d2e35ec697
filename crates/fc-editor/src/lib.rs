pub mod canvas;
pub mod commands;
pub mod engine;
pub mod input;
pub mod router;
pub mod shortcuts;
pub mod snap;

pub use canvas::{CanvasController, CanvasEvent, Removed};
pub use commands::{Command, Performing, UndoContext, UndoStack};
pub use engine::Engine;
pub use input::{InputEvent, KeyEvent, Modifiers, MouseButtons, MouseEvent, MouseEventKind};
pub use router::{MouseRoute, MouseState, ROUTES, RouteName};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use snap::{SnapAction, SnapEngine, SnapKind};

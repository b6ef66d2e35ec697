pub mod hit;
pub mod paint;
pub mod redraw;
pub mod surface;

pub use hit::{anchor_at, child_shape_at, root_shape_at, shapes_in_rect};
pub use redraw::{Renderer, affected_set};
pub use surface::{Background, Surface};

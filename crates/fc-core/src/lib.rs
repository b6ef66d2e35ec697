pub mod anchor;
pub mod config;
pub mod elements;
pub mod error;
pub mod geometry;
pub mod id;
pub mod model;
pub mod path;
pub mod persist;

pub use config::{EngineConfig, SnapConfig, SurfaceConfig};
pub use elements::Elements;
pub use error::CanvasError;
pub use geometry::{Delta, Point, Rect};
pub use id::ShapeId;
pub use model::*;
pub use persist::Snapshot;

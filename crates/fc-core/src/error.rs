use crate::id::ShapeId;
use thiserror::Error;

/// Failures surfaced by the shape model and its persistence layer.
///
/// Clamped resizes, rejected snap candidates and zero-length drags are
/// normal outcomes and never appear here.
#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("unknown shape {0}")]
    UnknownShape(ShapeId),

    #[error("shape {0} is already on the canvas")]
    DuplicateShape(ShapeId),

    #[error("{0} is not a connector")]
    NotAConnector(ShapeId),

    #[error("invalid surface size {width}x{height}")]
    InvalidSurface { width: u32, height: u32 },

    /// `owner` lists a connection to a shape that no longer exists.
    #[error("{owner} holds a connection to missing shape {missing}")]
    DanglingConnection { owner: ShapeId, missing: ShapeId },

    /// One side of a connection exists without its counterpart.
    #[error("connection between {shape} and connector {connector} is one-sided")]
    OneSidedConnection { shape: ShapeId, connector: ShapeId },

    #[error("a group needs at least one member")]
    EmptyGroup,

    #[error("group link between {parent} and {child} is one-sided")]
    BrokenGroup { parent: ShapeId, child: ShapeId },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("snapshot decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide interner backing every shape id.
static SHAPE_NAMES: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Monotonic counter for generated ids. Never reset, so an id freed by a
/// delete is never handed out again while an undo entry may still name it.
static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a shape on the canvas.
///
/// Connections, connector back-references, group links and undo entries all
/// refer to shapes through this id rather than through positions in the
/// element list, so reordering or deleting and restoring a shape keeps every
/// reference valid.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeId(Spur);

impl ShapeId {
    /// Use an explicit name (fixtures, persisted documents).
    pub fn named(name: &str) -> Self {
        ShapeId(SHAPE_NAMES.get_or_intern(name))
    }

    /// Generate a fresh id such as `box_12`.
    pub fn fresh(kind_tag: &str) -> Self {
        let n = NEXT_SERIAL.fetch_add(1, Ordering::Relaxed);
        Self::named(&format!("{kind_tag}_{n}"))
    }

    pub fn as_str(&self) -> &str {
        SHAPE_NAMES.resolve(&self.0)
    }
}

impl fmt::Debug for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ShapeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ShapeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(ShapeId::named(&name))
    }
}

//! Identifiers used throughout the document model.
//!
//! [`Uuid`] identifies documents, layers, objects, components, and contexts
//! with a stable, session-wide identity. The numeric ids alongside it
//! (`LayerId`, `ObjectId`, `TileId`, `TilesetId`) are the ones that are
//! actually persisted to save files.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque, session-stable identifier backed by a 128-bit UUID.
///
/// Wrapping `uuid::Uuid` (rather than re-exporting it) keeps the crate's
/// public identifier vocabulary self-contained and lets us add
/// domain-specific helpers (`Uuid::nil`, serde support tuned for the native
/// format) without reaching into `uuid`'s API everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uuid(uuid::Uuid);

impl Uuid {
    /// Generates a fresh, random identifier.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// The all-zero nil UUID, used as a sentinel in a few default states.
    pub const fn nil() -> Self {
        Self(uuid::Uuid::nil())
    }

    /// Returns the nil UUID check.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for Uuid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! numeric_id {
    ($name:ident, $repr:ty, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $repr);

        impl $name {
            /// Wraps a raw numeric value.
            pub const fn new(value: $repr) -> Self {
                Self(value)
            }

            /// Returns the raw numeric value.
            pub const fn get(self) -> $repr {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$repr> for $name {
            fn from(value: $repr) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(LayerId, i32, "Numeric, persisted identifier for a layer.");
numeric_id!(ObjectId, i32, "Numeric, persisted identifier for an object.");
numeric_id!(TilesetId, i32, "Numeric, persisted identifier for an attached tileset.");
numeric_id!(ComponentId, i32, "Numeric, persisted identifier for a component definition.");
numeric_id!(ContextId, i32, "Numeric, persisted identifier for a context.");

/// A globally-unique tile identifier within a map. `0` means "empty".
///
/// Distinct from [`TileIndex`], which is local to a single tileset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(pub i32);

impl TileId {
    /// The tile id representing an empty cell.
    pub const EMPTY: TileId = TileId(0);

    /// Whether this is the empty tile.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for TileId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

/// A zero-based position of a tile within its owning tileset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileIndex(pub u32);

impl TileIndex {
    /// Wraps a raw tileset-local index.
    pub const fn new(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TileIndex {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuids_are_unique_and_not_nil() {
        let a = Uuid::new();
        let b = Uuid::new();
        assert_ne!(a, b);
        assert!(!a.is_nil());
        assert!(Uuid::nil().is_nil());
    }

    #[test]
    fn tile_id_zero_is_empty() {
        assert!(TileId::EMPTY.is_empty());
        assert!(TileId(0).is_empty());
        assert!(!TileId(1).is_empty());
    }
}

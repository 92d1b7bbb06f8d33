//! The layer sum type and the tree that organizes layers into a hierarchy.

pub mod group_layer;
pub mod object_layer;
pub mod tile_layer;
pub mod tree;

pub use group_layer::GroupLayer;
pub use object_layer::ObjectLayer;
pub use tile_layer::TileLayer;
pub use tree::LayerTree;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::id::{LayerId, Uuid};

/// The three kinds a [`Layer`] can hold.
///
/// Chosen over a generic sparse-component registry per the design notes:
/// tagged variants keep a layer's shape-specific data (a tile matrix, an
/// object list, a child list) directly inline, with no indirection through a
/// type-erased store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerKind {
    Tile(TileLayer),
    Object(ObjectLayer),
    Group(GroupLayer),
}

impl LayerKind {
    pub fn as_tile(&self) -> Option<&TileLayer> {
        match self {
            LayerKind::Tile(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_tile_mut(&mut self) -> Option<&mut TileLayer> {
        match self {
            LayerKind::Tile(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectLayer> {
        match self {
            LayerKind::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectLayer> {
        match self {
            LayerKind::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupLayer> {
        match self {
            LayerKind::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut GroupLayer> {
        match self {
            LayerKind::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, LayerKind::Group(_))
    }
}

/// A layer in the map's tree: common fields (id, opacity, visibility) plus
/// variant-specific content in [`LayerKind`].
///
/// Each layer also owns a [`crate::context::Context`] for its name,
/// properties, and components, stored in the owning document's
/// [`crate::context::ContextStore`] under `uuid` — kept out of this struct
/// so that context lookups stay uniform across layers, objects, and
/// tilesets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub uuid: Uuid,
    pub id: LayerId,
    pub opacity: f32,
    pub visible: bool,
    pub kind: LayerKind,
}

impl Layer {
    pub fn new(uuid: Uuid, id: LayerId, kind: LayerKind) -> Self {
        Self { uuid, id, opacity: 1.0, visible: true, kind }
    }
}

/// Deep-copies everything about a layer except its identity (uuid and id),
/// which the caller supplies fresh. Used by [`tree::LayerTree::duplicate`]
/// and, indirectly, by the duplicate-layer command.
pub(crate) fn clone_layer_with_identity(source: &Layer, uuid: Uuid, id: LayerId) -> Layer {
    Layer { uuid, id, opacity: source.opacity, visible: source.visible, kind: source.kind.clone() }
}

/// Deep-copies a context, used when duplicating layers so the copy starts
/// with the same properties/components as the source.
pub(crate) fn clone_context(source: &Context) -> Context {
    source.clone()
}

//! Intermediate representation: plain data mirroring the document model,
//! with no engine references (no `Uuid`, no tree/context-store indirection).
//! Every dialect parses into this shape and lowers from it, per §4.7.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::attribute::Attribute;
use crate::map::{TileCompression, TileEncoding};
use crate::object::ObjectKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachedComponentIR {
    pub definition_name: String,
    pub values: Vec<(String, Attribute)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextIR {
    pub name: String,
    pub properties: Vec<(String, Attribute)>,
    pub components: Vec<AttachedComponentIR>,
}

impl ContextIR {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDefIR {
    pub name: String,
    pub attributes: Vec<(String, Attribute)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectIR {
    pub id: i32,
    pub kind: ObjectKind,
    pub position: (f32, f32),
    pub size: (f32, f32),
    pub tag: String,
    pub visible: bool,
    pub context: ContextIR,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameIR {
    pub local_index: u32,
    pub duration_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileIR {
    pub local_index: u32,
    pub frames: Vec<FrameIR>,
    pub objects: Vec<ObjectIR>,
    pub context: ContextIR,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilesetIR {
    pub name: String,
    pub first_tile: i32,
    pub tile_size: (i32, i32),
    pub tile_count: i32,
    pub column_count: i32,
    pub image_path: PathBuf,
    pub image_size: (u32, u32),
    pub embedded: bool,
    pub fancy_tiles: Vec<TileIR>,
    pub context: ContextIR,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayerIR {
    pub rows: usize,
    pub cols: usize,
    /// Row-major tile ids. Always present, even for an empty layer — an
    /// empty payload is emitted rather than a missing field (§6).
    pub data: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectLayerIR {
    pub objects: Vec<ObjectIR>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupLayerIR {
    pub children: Vec<LayerIR>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant-kind", rename_all = "kebab-case")]
pub enum LayerVariantIR {
    Tile(TileLayerIR),
    Object(ObjectLayerIR),
    Group(GroupLayerIR),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerIR {
    pub id: i32,
    pub opacity: f32,
    pub visible: bool,
    pub context: ContextIR,
    pub variant: LayerVariantIR,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileFormatIR {
    pub encoding: TileEncoding,
    pub compression: TileCompression,
    pub zlib_level: u32,
    pub zstd_level: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapIR {
    pub tile_width: i32,
    pub tile_height: i32,
    pub row_count: usize,
    pub column_count: usize,
    pub next_layer_id: i32,
    pub next_object_id: i32,
    pub tile_format: TileFormatIR,
    pub component_defs: Vec<ComponentDefIR>,
    pub tilesets: Vec<TilesetIR>,
    pub layers: Vec<LayerIR>,
    pub context: ContextIR,
}

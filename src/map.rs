//! The map: tile size and extent, the layer tree, attached tilesets, and the
//! tile-format defaults new tile layers are encoded with.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::id::{LayerId, ObjectId, TileId, Uuid};
use crate::layer::tree::LayerTree;
use crate::tile_matrix::Position;
use crate::tileset::AttachedTileset;

/// How tile layers are encoded on disk. Passed in at construction time (see
/// §9: "the spec treats this as input to the constructor, not a global
/// lookup") rather than read from a preferences singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TileEncoding {
    Plain,
    Base64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TileCompression {
    None,
    Zlib,
    Zstd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileFormat {
    pub encoding: TileEncoding,
    pub compression: TileCompression,
    pub zlib_level: u32,
    pub zstd_level: i32,
}

impl Default for TileFormat {
    /// Plain, uncompressed — the simplest format a fresh map can round-trip
    /// without any external tooling assumptions.
    fn default() -> Self {
        Self { encoding: TileEncoding::Plain, compression: TileCompression::None, zlib_level: 6, zstd_level: 3 }
    }
}

/// A map: its layer tree, attached tilesets, and the counters that hand out
/// fresh layer/object ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Map {
    pub tile_size: (i32, i32),
    extent: (usize, usize),
    pub next_layer_id: LayerId,
    pub next_object_id: ObjectId,
    pub root: LayerTree,
    tilesets: IndexMap<Uuid, AttachedTileset>,
    /// `first_tile_id -> tileset uuid`, rebuilt on every attach/detach.
    /// Looking up the owner of a tile id is a predecessor search: the
    /// greatest key `<=` the id, whose attachment must then be checked to
    /// contain it.
    tile_range_index: BTreeMap<i32, Uuid>,
    next_tile_id: i32,
    pub active_layer: Option<Uuid>,
    pub active_tileset: Option<Uuid>,
    pub tile_format: TileFormat,
}

impl Map {
    pub fn new(tile_size: (i32, i32), rows: usize, cols: usize, tile_format: TileFormat) -> Self {
        crate::assert_logic!(tile_size.0 > 0 && tile_size.1 > 0, "tile size must be positive");
        crate::assert_logic!(rows >= 1 && cols >= 1, "map extent must be at least 1x1");
        Self {
            tile_size,
            extent: (rows, cols),
            next_layer_id: LayerId(0),
            next_object_id: ObjectId(0),
            root: LayerTree::new(),
            tilesets: IndexMap::new(),
            tile_range_index: BTreeMap::new(),
            next_tile_id: 1,
            active_layer: None,
            active_tileset: None,
            tile_format,
        }
    }

    pub fn extent(&self) -> (usize, usize) {
        self.extent
    }

    pub fn rows(&self) -> usize {
        self.extent.0
    }

    pub fn cols(&self) -> usize {
        self.extent.1
    }

    /// Allocates and returns a fresh [`LayerId`].
    pub fn allocate_layer_id(&mut self) -> LayerId {
        let id = self.next_layer_id;
        self.next_layer_id = LayerId(id.0 + 1);
        id
    }

    /// Allocates and returns a fresh [`ObjectId`].
    pub fn allocate_object_id(&mut self) -> ObjectId {
        let id = self.next_object_id;
        self.next_object_id = ObjectId(id.0 + 1);
        id
    }

    /// Appends an empty row to every tile layer and grows the map extent.
    pub fn add_row(&mut self) {
        for (_, layer) in self.root.tile_layers_mut() {
            layer.matrix.add_row();
        }
        self.extent.0 += 1;
    }

    /// Appends an empty column to every tile layer and grows the map extent.
    pub fn add_col(&mut self) {
        for (_, layer) in self.root.tile_layers_mut() {
            layer.matrix.add_col();
        }
        self.extent.1 += 1;
    }

    /// Removes the bottom row from every tile layer and shrinks the map
    /// extent, returning each affected layer's discarded row contents keyed
    /// by layer uuid — the command's undo snapshot.
    pub fn remove_row(&mut self) -> IndexMap<Uuid, Vec<TileId>> {
        crate::assert_logic!(self.extent.0 > 1, "cannot remove the last row");
        let mut snapshot = IndexMap::new();
        for (uuid, layer) in self.root.tile_layers_mut() {
            snapshot.insert(uuid, layer.matrix.remove_row());
        }
        self.extent.0 -= 1;
        snapshot
    }

    /// Removes the rightmost column from every tile layer and shrinks the
    /// map extent, returning each affected layer's discarded column
    /// contents keyed by layer uuid.
    pub fn remove_col(&mut self) -> IndexMap<Uuid, Vec<TileId>> {
        crate::assert_logic!(self.extent.1 > 1, "cannot remove the last column");
        let mut snapshot = IndexMap::new();
        for (uuid, layer) in self.root.tile_layers_mut() {
            snapshot.insert(uuid, layer.matrix.remove_col());
        }
        self.extent.1 -= 1;
        snapshot
    }

    pub fn tilesets(&self) -> &IndexMap<Uuid, AttachedTileset> {
        &self.tilesets
    }

    /// Attaches a tileset with `tile_count` tiles, allocating the next
    /// sequential range of global tile ids.
    pub fn attach_tileset(&mut self, tileset_uuid: Uuid, tile_count: i32, embedded: bool) -> AttachedTileset {
        let attached = AttachedTileset::new(tileset_uuid, TileId(self.next_tile_id), tile_count, embedded);
        self.next_tile_id = attached.last_tile_id.0 + 1;
        self.tile_range_index.insert(attached.first_tile_id.0, tileset_uuid);
        self.tilesets.insert(tileset_uuid, attached);
        if self.active_tileset.is_none() {
            self.active_tileset = Some(tileset_uuid);
        }
        attached
    }

    /// Detaches a tileset, removing its range from the side table. If it
    /// was the active tileset, the first remaining one becomes active (or
    /// `None`).
    pub fn detach_tileset(&mut self, tileset_uuid: Uuid) -> Option<AttachedTileset> {
        let attached = self.tilesets.shift_remove(&tileset_uuid)?;
        self.tile_range_index.remove(&attached.first_tile_id.0);
        if self.active_tileset == Some(tileset_uuid) {
            self.active_tileset = self.tilesets.keys().next().copied();
        }
        Some(attached)
    }

    /// Reattaches a previously-detached tileset to its exact former range,
    /// used by the undo path of the detach command.
    pub fn reattach_tileset(&mut self, attached: AttachedTileset) {
        self.tile_range_index.insert(attached.first_tile_id.0, attached.tileset);
        self.tilesets.insert(attached.tileset, attached);
    }

    /// The uuid of the tileset owning `id`, if any attachment's range
    /// contains it.
    pub fn tileset_owning(&self, id: TileId) -> Option<Uuid> {
        let (_, &uuid) = self.tile_range_index.range(..=id.0).next_back()?;
        let attached = self.tilesets.get(&uuid)?;
        attached.contains(id).then_some(uuid)
    }

    /// Whether `id` is either empty or falls within some attached tileset's
    /// range.
    pub fn is_valid_tile(&self, id: TileId) -> bool {
        id.is_empty() || self.tileset_owning(id).is_some()
    }

    /// Scans every tile layer and replaces any tile id that doesn't belong
    /// to an attached tileset with the empty tile, returning the original
    /// `(position, id)` pairs per affected layer so undo can restore them
    /// exactly.
    pub fn fix_invalid_tiles(&mut self) -> IndexMap<Uuid, Vec<(Position, TileId)>> {
        let tile_range_index = &self.tile_range_index;
        let tilesets = &self.tilesets;
        let is_owned = |id: TileId| -> bool {
            tile_range_index
                .range(..=id.0)
                .next_back()
                .and_then(|(_, uuid)| tilesets.get(uuid))
                .is_some_and(|attached| attached.contains(id))
        };

        let mut snapshot = IndexMap::new();
        for (uuid, layer) in self.root.tile_layers_mut() {
            let mut replaced = Vec::new();
            let positions: Vec<_> = layer.matrix.iter().filter(|(_, id)| !id.is_empty()).collect();
            for (pos, id) in positions {
                if !is_owned(id) {
                    layer.matrix.set(pos, TileId::EMPTY);
                    replaced.push((pos, id));
                }
            }
            if !replaced.is_empty() {
                snapshot.insert(uuid, replaced);
            }
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{Layer, LayerKind, TileLayer};

    fn map_with_one_tile_layer(rows: usize, cols: usize) -> (Map, Uuid) {
        let mut map = Map::new((32, 32), rows, cols, TileFormat::default());
        let id = map.allocate_layer_id();
        let uuid = Uuid::new();
        let layer = Layer::new(uuid, id, LayerKind::Tile(TileLayer::new(rows, cols)));
        map.root.add(None, layer);
        (map, uuid)
    }

    #[test]
    fn add_row_grows_extent_and_every_tile_layer() {
        let (mut map, uuid) = map_with_one_tile_layer(5, 5);
        map.add_row();
        map.add_row();
        map.add_row();
        assert_eq!(map.extent(), (8, 5));
        let layer = map.root.get(uuid).unwrap().kind.as_tile().unwrap();
        assert_eq!(layer.matrix.rows(), 8);
    }

    #[test]
    fn remove_row_snapshot_restores_exact_contents() {
        let (mut map, uuid) = map_with_one_tile_layer(3, 2);
        {
            let layer = map.root.get_mut(uuid).unwrap().kind.as_tile_mut().unwrap();
            layer.matrix.set((2, 0), TileId(9));
            layer.matrix.set((2, 1), TileId(8));
        }
        let snapshot = map.remove_row();
        assert_eq!(map.extent(), (2, 2));
        assert_eq!(snapshot[&uuid], vec![TileId(9), TileId(8)]);
    }

    #[test]
    fn attach_allocates_sequential_ranges_and_tracks_owner() {
        let mut map = Map::new((32, 32), 4, 4, TileFormat::default());
        let first = Uuid::new();
        let second = Uuid::new();
        let a1 = map.attach_tileset(first, 16, false);
        let a2 = map.attach_tileset(second, 8, false);
        assert_eq!(a1.first_tile_id, TileId(1));
        assert_eq!(a2.first_tile_id, TileId(17));
        assert_eq!(map.tileset_owning(TileId(20)), Some(second));
        assert_eq!(map.tileset_owning(TileId(100)), None);
    }

    #[test]
    fn detaching_active_tileset_falls_back_to_first_remaining() {
        let mut map = Map::new((32, 32), 4, 4, TileFormat::default());
        let first = Uuid::new();
        let second = Uuid::new();
        map.attach_tileset(first, 4, false);
        map.attach_tileset(second, 4, false);
        assert_eq!(map.active_tileset, Some(first));
        map.detach_tileset(first);
        assert_eq!(map.active_tileset, Some(second));
        map.detach_tileset(second);
        assert_eq!(map.active_tileset, None);
    }

    #[test]
    fn fix_invalid_tiles_clears_ids_outside_every_range() {
        let (mut map, uuid) = map_with_one_tile_layer(2, 2);
        map.attach_tileset(Uuid::new(), 4, false);
        {
            let layer = map.root.get_mut(uuid).unwrap().kind.as_tile_mut().unwrap();
            layer.matrix.set((0, 0), TileId(2));
            layer.matrix.set((0, 1), TileId(99));
        }
        let snapshot = map.fix_invalid_tiles();
        assert_eq!(snapshot[&uuid], vec![((0, 1), TileId(99))]);
        let layer = map.root.get(uuid).unwrap().kind.as_tile().unwrap();
        assert_eq!(layer.matrix.get((0, 0)), Some(TileId(2)));
        assert_eq!(layer.matrix.get((0, 1)), Some(TileId::EMPTY));
    }
}

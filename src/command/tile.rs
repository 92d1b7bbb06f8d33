//! Map-wide tile commands: row/column resize, invalid-tile cleanup, and the
//! three interactive drawing sequences (stamp, eraser, bucket fill).

use std::any::Any;

use indexmap::IndexMap;

use crate::command::{Command, CommandKind};
use crate::document::Document;
use crate::id::{TileId, Uuid};
use crate::layer::tile_layer::{apply_eraser_step, apply_stamp_step, OldTileCache, StampCell};
use crate::tile_matrix::Position;

/// Appends `count` rows (or columns) to the map, mergeable with a prior
/// resize of the same direction so repeated clicks of "add row" collapse
/// into one undo step, per §8 scenario 3.
#[derive(Debug)]
pub struct AddRowCommand {
    count: u32,
}

impl AddRowCommand {
    pub fn new() -> Self {
        Self { count: 1 }
    }
}

impl Default for AddRowCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl Command for AddRowCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::AddRow
    }

    fn redo(&mut self, doc: &mut Document) {
        doc.map_mut().add_row();
    }

    fn undo(&mut self, doc: &mut Document) {
        doc.map_mut().remove_row();
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        let Some(other) = other.as_any().downcast_ref::<AddRowCommand>() else { return false };
        self.count += other.count;
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct AddColumnCommand {
    count: u32,
}

impl AddColumnCommand {
    pub fn new() -> Self {
        Self { count: 1 }
    }
}

impl Default for AddColumnCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl Command for AddColumnCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::AddColumn
    }

    fn redo(&mut self, doc: &mut Document) {
        doc.map_mut().add_col();
    }

    fn undo(&mut self, doc: &mut Document) {
        doc.map_mut().remove_col();
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        let Some(other) = other.as_any().downcast_ref::<AddColumnCommand>() else { return false };
        self.count += other.count;
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Removes the bottom row, keeping its discarded contents for undo.
#[derive(Debug)]
pub struct RemoveRowCommand {
    snapshot: Option<IndexMap<Uuid, Vec<TileId>>>,
}

impl RemoveRowCommand {
    pub fn new() -> Self {
        Self { snapshot: None }
    }
}

impl Default for RemoveRowCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl Command for RemoveRowCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RemoveRow
    }

    fn redo(&mut self, doc: &mut Document) {
        self.snapshot = Some(doc.map_mut().remove_row());
    }

    fn undo(&mut self, doc: &mut Document) {
        let snapshot = self.snapshot.take().expect("undo called before redo");
        let map = doc.map_mut();
        map.add_row();
        let new_row = map.rows() - 1;
        for (uuid, layer) in map.root.tile_layers_mut() {
            if let Some(contents) = snapshot.get(&uuid) {
                for (col, &tile) in contents.iter().enumerate() {
                    layer.matrix.set((new_row, col), tile);
                }
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct RemoveColumnCommand {
    snapshot: Option<IndexMap<Uuid, Vec<TileId>>>,
}

impl RemoveColumnCommand {
    pub fn new() -> Self {
        Self { snapshot: None }
    }
}

impl Default for RemoveColumnCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl Command for RemoveColumnCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RemoveColumn
    }

    fn redo(&mut self, doc: &mut Document) {
        self.snapshot = Some(doc.map_mut().remove_col());
    }

    fn undo(&mut self, doc: &mut Document) {
        let snapshot = self.snapshot.take().expect("undo called before redo");
        let map = doc.map_mut();
        map.add_col();
        let new_col = map.cols() - 1;
        for (uuid, layer) in map.root.tile_layers_mut() {
            if let Some(contents) = snapshot.get(&uuid) {
                for (row, &tile) in contents.iter().enumerate() {
                    layer.matrix.set((row, new_col), tile);
                }
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Clears every tile id that doesn't belong to any attached tileset,
/// restoring the exact original ids on undo.
#[derive(Debug)]
pub struct FixInvalidTilesCommand {
    snapshot: Option<IndexMap<Uuid, Vec<(Position, TileId)>>>,
}

impl FixInvalidTilesCommand {
    pub fn new() -> Self {
        Self { snapshot: None }
    }
}

impl Default for FixInvalidTilesCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl Command for FixInvalidTilesCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::FixInvalidTiles
    }

    fn redo(&mut self, doc: &mut Document) {
        self.snapshot = Some(doc.map_mut().fix_invalid_tiles());
    }

    fn undo(&mut self, doc: &mut Document) {
        let snapshot = self.snapshot.take().expect("undo called before redo");
        let map = doc.map_mut();
        for (uuid, layer) in map.root.tile_layers_mut() {
            if let Some(entries) = snapshot.get(&uuid) {
                for &(pos, tile) in entries {
                    layer.matrix.set(pos, tile);
                }
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One interactive stamp-tool drag: a sequence of stamp steps against a
/// single tile layer, with first-touch undo caching across the whole
/// sequence (§4.3).
#[derive(Debug)]
pub struct StampSequenceCommand {
    layer: Uuid,
    steps: Vec<(Position, Vec<StampCell>)>,
    cache: OldTileCache,
}

impl StampSequenceCommand {
    pub fn new(layer: Uuid, steps: Vec<(Position, Vec<StampCell>)>) -> Self {
        Self { layer, steps, cache: OldTileCache::new() }
    }
}

impl Command for StampSequenceCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::StampSequence
    }

    fn redo(&mut self, doc: &mut Document) {
        let map = doc.map_mut();
        let layer = map.root.get_mut(self.layer).expect("stamp target layer missing").kind.as_tile_mut().expect("stamp target is not a tile layer");
        for (cursor, selection) in &self.steps {
            apply_stamp_step(&mut layer.matrix, *cursor, selection, &mut self.cache);
        }
    }

    fn undo(&mut self, doc: &mut Document) {
        let map = doc.map_mut();
        let layer = map.root.get_mut(self.layer).expect("stamp target layer missing").kind.as_tile_mut().expect("stamp target is not a tile layer");
        for (pos, tile) in self.cache.iter() {
            layer.matrix.set(pos, tile);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One interactive eraser-tool drag, mirroring [`StampSequenceCommand`]'s
/// first-touch cache discipline.
#[derive(Debug)]
pub struct EraserSequenceCommand {
    layer: Uuid,
    steps: Vec<Vec<Position>>,
    cache: OldTileCache,
}

impl EraserSequenceCommand {
    pub fn new(layer: Uuid, steps: Vec<Vec<Position>>) -> Self {
        Self { layer, steps, cache: OldTileCache::new() }
    }
}

impl Command for EraserSequenceCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::EraserSequence
    }

    fn redo(&mut self, doc: &mut Document) {
        let map = doc.map_mut();
        let layer = map.root.get_mut(self.layer).expect("eraser target layer missing").kind.as_tile_mut().expect("eraser target is not a tile layer");
        for positions in &self.steps {
            apply_eraser_step(&mut layer.matrix, positions, &mut self.cache);
        }
    }

    fn undo(&mut self, doc: &mut Document) {
        let map = doc.map_mut();
        let layer = map.root.get_mut(self.layer).expect("eraser target layer missing").kind.as_tile_mut().expect("eraser target is not a tile layer");
        for (pos, tile) in self.cache.iter() {
            layer.matrix.set(pos, tile);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A single bucket-fill flood, recording every position it actually
/// overwrote for undo.
///
/// Every flooded cell shares one prior value: [`TileMatrix::flood`] only
/// ever continues into neighbours matching the tile at `origin`, so that
/// single value (captured before the flood runs) restores the whole region.
#[derive(Debug)]
pub struct BucketFillCommand {
    layer: Uuid,
    origin: Position,
    replacement: TileId,
    affected: Vec<Position>,
    previous: TileId,
}

impl BucketFillCommand {
    pub fn new(layer: Uuid, origin: Position, replacement: TileId) -> Self {
        Self { layer, origin, replacement, affected: Vec::new(), previous: TileId::EMPTY }
    }
}

impl Command for BucketFillCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::BucketFill
    }

    fn redo(&mut self, doc: &mut Document) {
        let map = doc.map_mut();
        let layer = map.root.get_mut(self.layer).expect("bucket-fill target layer missing").kind.as_tile_mut().expect("bucket-fill target is not a tile layer");
        self.previous = layer.matrix.get(self.origin).unwrap_or(TileId::EMPTY);
        let mut affected = Vec::new();
        layer.matrix.flood(self.origin, self.replacement, &mut affected);
        self.affected = affected;
    }

    fn undo(&mut self, doc: &mut Document) {
        let map = doc.map_mut();
        let layer = map.root.get_mut(self.layer).expect("bucket-fill target layer missing").kind.as_tile_mut().expect("bucket-fill target is not a tile layer");
        for &pos in &self.affected {
            layer.matrix.set(pos, self.previous);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentContent;
    use crate::layer::{Layer, LayerKind, TileLayer};
    use crate::map::{Map, TileFormat};

    fn test_doc(rows: usize, cols: usize) -> (Document, Uuid) {
        let mut map = Map::new((32, 32), rows, cols, TileFormat::default());
        let id = map.allocate_layer_id();
        let uuid = Uuid::new();
        map.root.add(None, Layer::new(uuid, id, LayerKind::Tile(TileLayer::new(rows, cols))));
        let mut doc = Document::new(DocumentContent::Map(map), 100);
        doc.contexts.insert(uuid, crate::context::Context::new("Tiles"));
        (doc, uuid)
    }

    #[test]
    fn add_row_commands_merge_their_counts() {
        let (mut doc, _) = test_doc(2, 2);
        let mut first = AddRowCommand::new();
        first.redo(&mut doc);
        let mut second = AddRowCommand::new();
        second.redo(&mut doc);
        assert!(first.merge_with(&second));
        assert_eq!(first.count, 2);
        assert_eq!(doc.map().rows(), 4);
    }

    #[test]
    fn remove_row_undo_restores_exact_contents() {
        let (mut doc, layer_uuid) = test_doc(3, 2);
        {
            let layer = doc.map_mut().root.get_mut(layer_uuid).unwrap().kind.as_tile_mut().unwrap();
            layer.matrix.set((2, 0), TileId(9));
            layer.matrix.set((2, 1), TileId(8));
        }
        let mut cmd = RemoveRowCommand::new();
        cmd.redo(&mut doc);
        assert_eq!(doc.map().rows(), 2);
        cmd.undo(&mut doc);
        assert_eq!(doc.map().rows(), 3);
        let layer = doc.map().root.get(layer_uuid).unwrap().kind.as_tile().unwrap();
        assert_eq!(layer.matrix.get((2, 0)), Some(TileId(9)));
        assert_eq!(layer.matrix.get((2, 1)), Some(TileId(8)));
    }

    #[test]
    fn bucket_fill_undo_restores_prior_values() {
        let (mut doc, layer_uuid) = test_doc(3, 3);
        let mut cmd = BucketFillCommand::new(layer_uuid, (1, 1), TileId(7));
        cmd.redo(&mut doc);
        let layer = doc.map().root.get(layer_uuid).unwrap().kind.as_tile().unwrap();
        assert_eq!(layer.matrix.get((0, 0)), Some(TileId(7)));

        cmd.undo(&mut doc);
        let layer = doc.map().root.get(layer_uuid).unwrap().kind.as_tile().unwrap();
        assert_eq!(layer.matrix.get((0, 0)), Some(TileId::EMPTY));
    }

    #[test]
    fn stamp_sequence_undo_restores_first_touch_values() {
        let (mut doc, layer_uuid) = test_doc(4, 4);
        {
            let layer = doc.map_mut().root.get_mut(layer_uuid).unwrap().kind.as_tile_mut().unwrap();
            layer.matrix.set((1, 1), TileId(3));
        }
        let selection = vec![StampCell { offset: (0, 0), tile: TileId(5) }];
        let mut cmd = StampSequenceCommand::new(layer_uuid, vec![((1, 1), selection.clone()), ((1, 1), selection)]);
        cmd.redo(&mut doc);
        let layer = doc.map().root.get(layer_uuid).unwrap().kind.as_tile().unwrap();
        assert_eq!(layer.matrix.get((1, 1)), Some(TileId(5)));

        cmd.undo(&mut doc);
        let layer = doc.map().root.get(layer_uuid).unwrap().kind.as_tile().unwrap();
        assert_eq!(layer.matrix.get((1, 1)), Some(TileId(3)));
    }
}

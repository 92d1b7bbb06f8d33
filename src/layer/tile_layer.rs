//! Tile layers: a [`TileMatrix`] plus the stamp/eraser cache discipline used
//! by interactive tools.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::id::TileId;
use crate::tile_matrix::{Position, TileMatrix};

/// A layer whose content is a grid of tile ids.
///
/// Invariant: `matrix.extent()` equals the owning map's extent at every
/// point observable outside of a resize command's internal bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayer {
    pub matrix: TileMatrix,
}

impl TileLayer {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { matrix: TileMatrix::new(rows, cols) }
    }
}

/// Accumulates the "first touch wins" previous-value cache shared by stamp
/// and eraser sequences: before a cell is overwritten for the first time
/// during one interactive sequence, its prior value is recorded here.
/// Undo restores every cached value; redo reapplies the final written
/// values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OldTileCache {
    entries: HashMap<Position, TileId>,
}

impl OldTileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `pos`'s current value the first time it's touched; no-op on
    /// subsequent touches of the same position.
    pub fn record_first_touch(&mut self, pos: Position, current: TileId) {
        self.entries.entry(pos).or_insert(current);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, TileId)> + '_ {
        self.entries.iter().map(|(&p, &v)| (p, v))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One selected source cell from a tileset, relative to the selection's
/// center, used to drive a stamp sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StampCell {
    /// Offset of this source cell from the selection center.
    pub offset: (i32, i32),
    pub tile: TileId,
}

/// Applies one stamp step at `cursor`, writing every non-empty selected
/// cell whose target falls within the map, recording prior values in
/// `cache` on first touch. Returns the final written `(position, tile)`
/// pairs for this step, in selection order.
pub fn apply_stamp_step(
    matrix: &mut TileMatrix,
    cursor: Position,
    selection: &[StampCell],
    cache: &mut OldTileCache,
) -> Vec<(Position, TileId)> {
    let mut written = Vec::new();
    for cell in selection {
        if cell.tile.is_empty() {
            continue;
        }
        let target_row = cursor.0 as i64 + cell.offset.0 as i64;
        let target_col = cursor.1 as i64 + cell.offset.1 as i64;
        if target_row < 0 || target_col < 0 {
            continue;
        }
        let target = (target_row as usize, target_col as usize);
        if !matrix.in_bounds(target) {
            continue;
        }
        let previous = matrix.get(target).unwrap();
        cache.record_first_touch(target, previous);
        matrix.set(target, cell.tile);
        written.push((target, cell.tile));
    }
    written
}

/// Applies one eraser step at `cursor`: writes the empty tile to every
/// position in `positions`, using the same first-touch cache discipline as
/// the stamp tool.
pub fn apply_eraser_step(
    matrix: &mut TileMatrix,
    positions: &[Position],
    cache: &mut OldTileCache,
) {
    for &pos in positions {
        if !matrix.in_bounds(pos) {
            continue;
        }
        let previous = matrix.get(pos).unwrap();
        cache.record_first_touch(pos, previous);
        matrix.set(pos, TileId::EMPTY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_skips_empty_source_tiles_and_out_of_bounds_targets() {
        let mut matrix = TileMatrix::new(8, 8);
        let mut cache = OldTileCache::new();
        let selection = [
            StampCell { offset: (-1, -1), tile: TileId(1) },
            StampCell { offset: (0, 0), tile: TileId::EMPTY },
            StampCell { offset: (1, 1), tile: TileId(2) },
        ];
        let written = apply_stamp_step(&mut matrix, (0, 0), &selection, &mut cache);
        // (-1,-1) is out of bounds, (0,0) source is empty: only (1,1) lands.
        assert_eq!(written, vec![((1, 1), TileId(2))]);
    }

    #[test]
    fn stamp_caches_only_first_touch_per_cell() {
        let mut matrix = TileMatrix::new(4, 4);
        let mut cache = OldTileCache::new();
        matrix.set((2, 2), TileId(9));
        let selection = [StampCell { offset: (0, 0), tile: TileId(1) }];
        apply_stamp_step(&mut matrix, (2, 2), &selection, &mut cache);
        apply_stamp_step(&mut matrix, (2, 2), &selection, &mut cache);
        let cached: Vec<_> = cache.iter().collect();
        assert_eq!(cached, vec![((2, 2), TileId(9))]);
    }

    #[test]
    fn eraser_writes_empty_tile_everywhere_visited() {
        let mut matrix = TileMatrix::new(4, 4);
        matrix.set((0, 0), TileId(1));
        matrix.set((0, 1), TileId(2));
        let mut cache = OldTileCache::new();
        apply_eraser_step(&mut matrix, &[(0, 0), (0, 1)], &mut cache);
        assert_eq!(matrix.get((0, 0)), Some(TileId::EMPTY));
        assert_eq!(matrix.get((0, 1)), Some(TileId::EMPTY));
    }
}

//! Tilesets: the source image for a map's tiles, plus the animation and
//! per-tile data ("fancy tiles") that a handful of tiles carry beyond their
//! plain appearance.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::id::{TileId, TileIndex, Uuid};
use crate::object::Object;
use crate::tile_matrix::Position;

/// Where a tileset's source image lives and how large it is, in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureRef {
    pub path: PathBuf,
    pub size: (u32, u32),
}

/// One frame of a tile animation: a tileset-local tile index and how long
/// (in milliseconds) it stays current before advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub tile_index: TileIndex,
    pub duration_ms: u32,
}

/// An ordered, non-empty sequence of frames plus playback state.
///
/// Construction enforces "≥ 1 frame when present" (§3): an animation with no
/// frames simply doesn't exist — see [`Tileset::remove_animation_frame`],
/// which drops the `Animation` entirely once its last frame is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    frames: Vec<Frame>,
    current: usize,
    #[serde(skip, default = "Instant::now")]
    last_update: Instant,
}

impl Animation {
    /// Builds a new animation starting at frame 0. Returns `None` for an
    /// empty frame list.
    pub fn new(frames: Vec<Frame>) -> Option<Self> {
        if frames.is_empty() {
            return None;
        }
        Some(Self { frames, current: 0, last_update: Instant::now() })
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn current_frame_index(&self) -> usize {
        self.current
    }

    /// The tile index that should currently be rendered.
    pub fn current_tile_index(&self) -> TileIndex {
        self.frames[self.current].tile_index
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Advances playback by one step if the current frame's duration has
    /// elapsed. Never skips more than one frame per call ("no catch-up for
    /// long stalls").
    pub fn tick(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_update);
        let due = Duration::from_millis(self.frames[self.current].duration_ms as u64);
        if elapsed >= due {
            self.current = (self.current + 1) % self.frames.len();
            self.last_update = now;
        }
    }

    /// Resets playback to the first frame, as every animation edit does.
    pub fn reset_playback(&mut self, now: Instant) {
        self.current = 0;
        self.last_update = now;
    }

    /// Inserts a frame at `index` (`index == len()` appends) and resets
    /// playback.
    pub fn insert_frame(&mut self, index: usize, frame: Frame, now: Instant) {
        crate::assert_logic!(index <= self.frames.len(), "animation frame index out of bounds");
        self.frames.insert(index, frame);
        self.reset_playback(now);
    }

    /// Removes the frame at `index`, resetting playback if any frames
    /// remain. Returns the removed frame.
    pub fn remove_frame(&mut self, index: usize, now: Instant) -> Frame {
        crate::assert_logic!(index < self.frames.len(), "animation frame index out of bounds");
        let removed = self.frames.remove(index);
        if !self.frames.is_empty() {
            self.reset_playback(now);
        }
        removed
    }
}

/// Per-tile data for a tile that carries more than its bare appearance: an
/// animation, nested objects (collision shapes, hotspots), or context
/// (name/properties/components, stored separately in the document's
/// `ContextStore` under `context_uuid`).
///
/// Tiles that carry none of this are simply absent from
/// [`Tileset::fancy_tiles`] and are treated as defaults — see §3's "fancy
/// tile".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FancyTile {
    pub context_uuid: Uuid,
    pub animation: Option<Animation>,
    pub objects: Vec<Object>,
}

impl FancyTile {
    pub fn new() -> Self {
        Self { context_uuid: Uuid::new(), animation: None, objects: Vec::new() }
    }

    /// Whether this entry carries no data at all and could be pruned.
    /// Context is intentionally excluded: a tile that was merely renamed
    /// still counts as fancy.
    pub fn is_bare(&self) -> bool {
        self.animation.is_none() && self.objects.is_empty()
    }
}

impl Default for FancyTile {
    fn default() -> Self {
        Self::new()
    }
}

/// A tileset: the source image sliced into a grid of tiles, plus whichever
/// tiles carry extra data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tileset {
    pub uuid: Uuid,
    pub texture: TextureRef,
    pub tile_size: (i32, i32),
    pub row_count: i32,
    pub column_count: i32,
    fancy_tiles: IndexMap<TileIndex, FancyTile>,
}

impl Tileset {
    pub fn new(uuid: Uuid, texture: TextureRef, tile_size: (i32, i32), row_count: i32, column_count: i32) -> Self {
        crate::assert_logic!(tile_size.0 > 0 && tile_size.1 > 0, "tile size must be positive");
        crate::assert_logic!(row_count > 0 && column_count > 0, "tileset extent must be positive");
        Self { uuid, texture, tile_size, row_count, column_count, fancy_tiles: IndexMap::new() }
    }

    pub fn tile_count(&self) -> i32 {
        self.row_count * self.column_count
    }

    pub fn fancy_tiles(&self) -> &IndexMap<TileIndex, FancyTile> {
        &self.fancy_tiles
    }

    pub fn fancy_tile(&self, index: TileIndex) -> Option<&FancyTile> {
        self.fancy_tiles.get(&index)
    }

    pub fn fancy_tile_mut(&mut self, index: TileIndex) -> Option<&mut FancyTile> {
        self.fancy_tiles.get_mut(&index)
    }

    /// Inserts a fully-formed fancy tile at `index`, replacing any previous
    /// entry. Used by deserializers reconstructing a tileset from disk,
    /// where the incremental `add_animation_frame`/`remove_animation_frame`
    /// editing API doesn't apply.
    pub fn set_fancy_tile(&mut self, index: TileIndex, tile: FancyTile) {
        self.fancy_tiles.insert(index, tile);
    }

    /// The rendered tile index for `index`: the current animation frame if
    /// animated, otherwise `index` itself unchanged.
    pub fn appearance(&self, index: TileIndex) -> TileIndex {
        match self.fancy_tile(index).and_then(|t| t.animation.as_ref()) {
            Some(anim) => anim.current_tile_index(),
            None => index,
        }
    }

    /// Advances every animated tile's playback by one step.
    pub fn tick_animations(&mut self, now: Instant) {
        for tile in self.fancy_tiles.values_mut() {
            if let Some(anim) = &mut tile.animation {
                anim.tick(now);
            }
        }
    }

    /// Adds an animation frame to `index` at position `at`. If `index` is
    /// not yet animated, `at` must be `0` and this starts a fresh
    /// single-frame animation ("the first frame may only be added to a
    /// non-animated tile").
    pub fn add_animation_frame(&mut self, index: TileIndex, at: usize, frame: Frame, now: Instant) {
        let tile = self.fancy_tiles.entry(index).or_default();
        match &mut tile.animation {
            Some(anim) => anim.insert_frame(at, frame, now),
            None => {
                crate::assert_logic!(at == 0, "first animation frame must be inserted at index 0");
                tile.animation = Animation::new(vec![frame]);
            }
        }
    }

    /// Removes the animation frame at `at` on `index`'s animation. If the
    /// animation becomes empty, it is dropped entirely; if the tile is then
    /// bare, its `fancy_tiles` entry is pruned too.
    pub fn remove_animation_frame(&mut self, index: TileIndex, at: usize, now: Instant) {
        let Some(tile) = self.fancy_tiles.get_mut(&index) else { return };
        let Some(anim) = &mut tile.animation else { return };
        anim.remove_frame(at, now);
        if anim.is_empty() {
            tile.animation = None;
        }
        if tile.is_bare() {
            self.fancy_tiles.shift_remove(&index);
        }
    }
}

/// A tileset as attached to one particular map: the global tile-id range it
/// occupies, plus a map-local selection region used to drive stamp tools.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttachedTileset {
    pub tileset: Uuid,
    pub first_tile_id: TileId,
    pub last_tile_id: TileId,
    pub embedded: bool,
    pub selection: Option<(Position, Position)>,
}

impl AttachedTileset {
    /// Allocates a fresh attachment starting at `first_tile_id` for a
    /// tileset with `tile_count` tiles.
    pub fn new(tileset: Uuid, first_tile_id: TileId, tile_count: i32, embedded: bool) -> Self {
        crate::assert_logic!(tile_count > 0, "tileset must have at least one tile");
        let last_tile_id = TileId(first_tile_id.0 + tile_count - 1);
        Self { tileset, first_tile_id, last_tile_id, embedded, selection: None }
    }

    pub fn tile_count(&self) -> i32 {
        self.last_tile_id.0 - self.first_tile_id.0 + 1
    }

    pub fn contains(&self, id: TileId) -> bool {
        id.0 >= self.first_tile_id.0 && id.0 <= self.last_tile_id.0
    }

    /// Converts a global tile id to a tileset-local index. Returns `None`
    /// for ids outside this attachment's range.
    pub fn to_tile_index(&self, id: TileId) -> Option<TileIndex> {
        if !self.contains(id) {
            return None;
        }
        Some(TileIndex((id.0 - self.first_tile_id.0) as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture() -> TextureRef {
        TextureRef { path: PathBuf::from("tiles.png"), size: (256, 256) }
    }

    #[test]
    fn appearance_falls_back_to_the_tile_itself_when_not_animated() {
        let tileset = Tileset::new(Uuid::new(), texture(), (16, 16), 4, 4);
        assert_eq!(tileset.appearance(TileIndex(3)), TileIndex(3));
    }

    #[test]
    fn appearance_uses_current_animation_frame() {
        let mut tileset = Tileset::new(Uuid::new(), texture(), (16, 16), 4, 4);
        let now = Instant::now();
        tileset.add_animation_frame(TileIndex(0), 0, Frame { tile_index: TileIndex(5), duration_ms: 100 }, now);
        assert_eq!(tileset.appearance(TileIndex(0)), TileIndex(5));
    }

    #[test]
    fn removing_last_frame_drops_the_animation() {
        let mut tileset = Tileset::new(Uuid::new(), texture(), (16, 16), 4, 4);
        let now = Instant::now();
        tileset.add_animation_frame(TileIndex(0), 0, Frame { tile_index: TileIndex(5), duration_ms: 100 }, now);
        tileset.remove_animation_frame(TileIndex(0), 0, now);
        assert!(tileset.fancy_tile(TileIndex(0)).is_none());
    }

    #[test]
    fn tick_advances_only_after_duration_elapses_with_no_catch_up() {
        let mut tileset = Tileset::new(Uuid::new(), texture(), (16, 16), 2, 1);
        let start = Instant::now();
        tileset.add_animation_frame(TileIndex(0), 0, Frame { tile_index: TileIndex(0), duration_ms: 10 }, start);
        tileset.add_animation_frame(TileIndex(0), 1, Frame { tile_index: TileIndex(1), duration_ms: 10 }, start);

        tileset.tick_animations(start + Duration::from_millis(5));
        assert_eq!(tileset.appearance(TileIndex(0)), TileIndex(0));

        let after_first = start + Duration::from_millis(15);
        tileset.tick_animations(after_first);
        assert_eq!(tileset.appearance(TileIndex(0)), TileIndex(1));

        // A huge stall still only advances a single frame.
        tileset.tick_animations(after_first + Duration::from_secs(60));
        assert_eq!(tileset.appearance(TileIndex(0)), TileIndex(0));
    }

    #[test]
    fn attached_tileset_range_and_index_conversion() {
        let attached = AttachedTileset::new(Uuid::new(), TileId(1), 16, false);
        assert_eq!(attached.last_tile_id, TileId(16));
        assert_eq!(attached.tile_count(), 16);
        assert_eq!(attached.to_tile_index(TileId(1)), Some(TileIndex(0)));
        assert_eq!(attached.to_tile_index(TileId(16)), Some(TileIndex(15)));
        assert_eq!(attached.to_tile_index(TileId(17)), None);
    }
}

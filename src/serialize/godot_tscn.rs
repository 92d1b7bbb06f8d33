//! Write-only export to a Godot 4 `.tscn` scene: one `TileMap` node per
//! exported map, with one layer per tile layer. Object and group layers are
//! dropped — Godot's `TileMap` node has no equivalent, and importing a
//! Tactile project into Godot is a one-way trip, not a dialect meant to
//! round-trip (§9).
//!
//! Godot's scene format is a small text format of its own (not XML or JSON),
//! so this module builds it directly with `write!`, the way the teacher
//! assembles `.tmx` text nodes by hand rather than through a generic tree
//! builder.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::{IoErrorKind, Result, TactileError};
use crate::external::FileSystem;

use super::ir::{LayerVariantIR, MapIR};

fn tile_layer_count(ir: &MapIR) -> usize {
    ir.layers.iter().filter(|l| matches!(l.variant, LayerVariantIR::Tile(_))).count()
}

/// Renders `ir` as a Godot 4 `.tscn` scene text.
///
/// Non-goal: this does not attempt to preserve tile atlas source ids,
/// animations, or collision shapes — only position and raw tile index, which
/// is enough to re-lay the same map out in the Godot editor.
pub fn write_to_string(ir: &MapIR, scene_name: &str) -> Result<String> {
    let mut out = String::new();
    let layer_count = tile_layer_count(ir).max(1);
    let load_steps = layer_count + 1;

    writeln!(out, "[gd_scene load_steps={load_steps} format=3]").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "[node name=\"{scene_name}\" type=\"Node2D\"]").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "[node name=\"TileMap\" type=\"TileMap\" parent=\".\"]").unwrap();
    writeln!(out, "tile_set = SubResource(\"TileSet_0\")").unwrap();
    writeln!(out, "format = 2").unwrap();

    let mut layer_index = 0;
    for layer in &ir.layers {
        let LayerVariantIR::Tile(tile) = &layer.variant else { continue };
        let mut cells = String::new();
        for row in 0..tile.rows {
            for col in 0..tile.cols {
                let id = tile.data[row * tile.cols + col];
                if id != 0 {
                    write!(cells, "{}, {}, 0, {}, 0, ", col, row, id - 1).unwrap();
                }
            }
        }
        writeln!(out, "layer_{}/name = \"{}\"", layer_index, layer.context.name).unwrap();
        writeln!(out, "layer_{}/enabled = {}", layer_index, layer.visible).unwrap();
        writeln!(out, "layer_{}/modulate = Color(1, 1, 1, {})", layer_index, layer.opacity).unwrap();
        writeln!(out, "layer_{}/tile_data = PackedInt32Array({})", layer_index, cells.trim_end_matches(", ")).unwrap();
        layer_index += 1;
    }

    Ok(out)
}

/// Writes `ir` to `path` as a Godot `.tscn` scene. `scene_name` becomes the
/// root node's name.
pub fn save(ir: &MapIR, path: &Path, scene_name: &str, fs: &dyn FileSystem) -> Result<()> {
    let text = write_to_string(ir, scene_name)?;
    fs.write(path, text.as_bytes()).map_err(|_| TactileError::io(IoErrorKind::WriteFailed(path.to_path_buf())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{TileCompression, TileEncoding};
    use crate::serialize::ir::{ContextIR, LayerIR, TileFormatIR, TileLayerIR};

    fn sample_ir() -> MapIR {
        MapIR {
            tile_width: 16,
            tile_height: 16,
            row_count: 2,
            column_count: 2,
            next_layer_id: 1,
            next_object_id: 0,
            tile_format: TileFormatIR { encoding: TileEncoding::Plain, compression: TileCompression::None, zlib_level: 6, zstd_level: 3 },
            component_defs: Vec::new(),
            tilesets: Vec::new(),
            layers: vec![LayerIR {
                id: 0,
                opacity: 1.0,
                visible: true,
                context: ContextIR::named("Ground"),
                variant: LayerVariantIR::Tile(TileLayerIR { rows: 2, cols: 2, data: vec![1, 0, 0, 2] }),
            }],
            context: ContextIR::named("map"),
        }
    }

    #[test]
    fn emits_one_tile_map_node_with_nonempty_cells_only() {
        let text = write_to_string(&sample_ir(), "Level").unwrap();
        assert!(text.contains("type=\"TileMap\""));
        assert!(text.contains("layer_0/name = \"Ground\""));
        assert!(text.contains("0, 0, 0, 0, 0"));
        assert!(text.contains("1, 1, 0, 1, 0"));
    }

    #[test]
    fn object_and_group_layers_are_skipped() {
        let ir = sample_ir();
        assert_eq!(tile_layer_count(&ir), 1);
    }
}

//! Tiled JSON (`.tmj`/`.json`) dialect: read + write. Components degrade to
//! plain properties named `"<definition>.<attribute>"`; there is no Tiled
//! concept to round-trip them back into components, so loading a Tiled map
//! never reconstructs [`crate::component::ComponentDefinition`]s (§9).

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ParseErrorKind, Result, SourceLocation, TactileError};
use crate::external::FileSystem;
use crate::map::{TileCompression, TileEncoding};

use super::ir::{ContextIR, FrameIR, GroupLayerIR, LayerIR, LayerVariantIR, MapIR, ObjectIR, ObjectLayerIR, TileFormatIR, TileIR, TileLayerIR, TilesetIR};
use super::tile_encoding;

const SCHEMA_VERSION: &str = "1.10";

#[derive(Debug, Serialize, Deserialize)]
struct TiledProperty {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    value: Value,
}

fn properties_to_tiled(context: &ContextIR) -> Vec<TiledProperty> {
    let mut out: Vec<TiledProperty> = context
        .properties
        .iter()
        .map(|(name, value)| tiled_property_of_attribute(name.clone(), value))
        .collect();

    for component in &context.components {
        for (attr_name, value) in &component.values {
            out.push(tiled_property_of_attribute(format!("{}.{}", component.definition_name, attr_name), value));
        }
    }
    out
}

fn tiled_property_of_attribute(name: String, value: &crate::attribute::Attribute) -> TiledProperty {
    use crate::attribute::Attribute;
    match value {
        Attribute::String(s) => TiledProperty { name, kind: "string".into(), value: Value::String(s.clone()) },
        Attribute::Int(i) => TiledProperty { name, kind: "int".into(), value: Value::from(*i) },
        Attribute::Float(f) => TiledProperty { name, kind: "float".into(), value: Value::from(*f) },
        Attribute::Bool(b) => TiledProperty { name, kind: "bool".into(), value: Value::Bool(*b) },
        Attribute::Color(c) => {
            TiledProperty { name, kind: "color".into(), value: Value::String(format!("#{:02x}{:02x}{:02x}{:02x}", c.alpha, c.red, c.green, c.blue)) }
        }
        Attribute::FilePath(p) => TiledProperty { name, kind: "file".into(), value: Value::String(p.to_string_lossy().into_owned()) },
        Attribute::ObjectRef(id) => TiledProperty { name, kind: "object".into(), value: Value::from(id.map(|i| i.get()).unwrap_or(0)) },
    }
}

/// Properties read back from a Tiled file land as plain string/number/bool
/// properties on the context; the `"definition.attribute"` naming convention
/// is not reversed back into components on load (§9).
fn context_from_tiled(name: String, properties: &[TiledProperty]) -> ContextIR {
    use crate::attribute::Attribute;
    let mut context = ContextIR::named(name);
    for prop in properties {
        let value = match prop.kind.as_str() {
            "int" => Attribute::Int(prop.value.as_i64().unwrap_or(0) as i32),
            "float" => Attribute::Float(prop.value.as_f64().unwrap_or(0.0) as f32),
            "bool" => Attribute::Bool(prop.value.as_bool().unwrap_or(false)),
            "file" => Attribute::FilePath(prop.value.as_str().unwrap_or_default().into()),
            _ => Attribute::String(prop.value.as_str().map(str::to_owned).unwrap_or_else(|| prop.value.to_string())),
        };
        context.properties.push((prop.name.clone(), value));
    }
    context
}

fn object_to_json(obj: &ObjectIR) -> Value {
    let (point, ellipse) = match obj.kind {
        crate::object::ObjectKind::Point => (true, false),
        crate::object::ObjectKind::Ellipse => (false, true),
        crate::object::ObjectKind::Rect => (false, false),
    };
    serde_json::json!({
        "id": obj.id,
        "name": obj.context.name,
        "x": obj.position.0,
        "y": obj.position.1,
        "width": obj.size.0,
        "height": obj.size.1,
        "visible": obj.visible,
        "point": point,
        "ellipse": ellipse,
        "type": obj.tag,
        "properties": properties_to_tiled(&obj.context),
    })
}

fn object_from_json(value: &Value) -> ObjectIR {
    let name = value.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
    let properties: Vec<TiledProperty> = value.get("properties").cloned().map(serde_json::from_value).transpose().ok().flatten().unwrap_or_default();
    let kind = if value.get("point").and_then(Value::as_bool).unwrap_or(false) {
        crate::object::ObjectKind::Point
    } else if value.get("ellipse").and_then(Value::as_bool).unwrap_or(false) {
        crate::object::ObjectKind::Ellipse
    } else {
        crate::object::ObjectKind::Rect
    };
    ObjectIR {
        id: value.get("id").and_then(Value::as_i64).unwrap_or(0) as i32,
        kind,
        position: (value.get("x").and_then(Value::as_f64).unwrap_or(0.0) as f32, value.get("y").and_then(Value::as_f64).unwrap_or(0.0) as f32),
        size: (value.get("width").and_then(Value::as_f64).unwrap_or(0.0) as f32, value.get("height").and_then(Value::as_f64).unwrap_or(0.0) as f32),
        tag: value.get("type").and_then(Value::as_str).unwrap_or_default().to_string(),
        visible: value.get("visible").and_then(Value::as_bool).unwrap_or(true),
        context: context_from_tiled(name, &properties),
    }
}

fn layer_to_json(layer: &LayerIR) -> Value {
    let mut json = serde_json::json!({
        "id": layer.id,
        "name": layer.context.name,
        "opacity": layer.opacity,
        "visible": layer.visible,
        "properties": properties_to_tiled(&layer.context),
    });
    let object = json.as_object_mut().unwrap();
    match &layer.variant {
        LayerVariantIR::Tile(tile) => {
            object.insert("type".into(), Value::String("tilelayer".into()));
            object.insert("width".into(), Value::from(tile.cols));
            object.insert("height".into(), Value::from(tile.rows));
            object.insert("encoding".into(), Value::String("csv".into()));
            object.insert("data".into(), Value::from(tile.data.clone()));
        }
        LayerVariantIR::Object(layer) => {
            object.insert("type".into(), Value::String("objectgroup".into()));
            object.insert("objects".into(), Value::Array(layer.objects.iter().map(object_to_json).collect()));
        }
        LayerVariantIR::Group(group) => {
            object.insert("type".into(), Value::String("group".into()));
            object.insert("layers".into(), Value::Array(group.children.iter().map(layer_to_json).collect()));
        }
    }
    json
}

fn layer_from_json(value: &Value, source: &SourceLocation) -> Result<LayerIR> {
    let name = value.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
    let properties: Vec<TiledProperty> = value.get("properties").cloned().map(serde_json::from_value).transpose().ok().flatten().unwrap_or_default();
    let id = value.get("id").and_then(Value::as_i64).unwrap_or(0) as i32;
    let opacity = value.get("opacity").and_then(Value::as_f64).unwrap_or(1.0) as f32;
    let visible = value.get("visible").and_then(Value::as_bool).unwrap_or(true);
    let context = context_from_tiled(name, &properties);

    let kind = value.get("type").and_then(Value::as_str).ok_or_else(|| TactileError::parse(ParseErrorKind::MissingField("type".into()), source.clone()))?;
    let variant = match kind {
        "tilelayer" => {
            let rows = value.get("height").and_then(Value::as_u64).unwrap_or(0) as usize;
            let cols = value.get("width").and_then(Value::as_u64).unwrap_or(0) as usize;
            let encoding = value.get("encoding").and_then(Value::as_str).unwrap_or("csv");
            let data = match encoding {
                "csv" => value
                    .get("data")
                    .and_then(Value::as_array)
                    .ok_or_else(|| TactileError::parse(ParseErrorKind::MissingField("data".into()), source.clone()))?
                    .iter()
                    .map(|v| v.as_i64().unwrap_or(0) as i32)
                    .collect(),
                "base64" => {
                    let payload = value.get("data").and_then(Value::as_str).unwrap_or_default();
                    let compression = match value.get("compression").and_then(Value::as_str) {
                        Some("zlib") => TileCompression::Zlib,
                        Some("zstd") => TileCompression::Zstd,
                        Some(other) => return Err(TactileError::parse(ParseErrorKind::UnknownCompression(other.to_string()), source.clone())),
                        None => TileCompression::None,
                    };
                    tile_encoding::decode_base64(payload, compression, source)?
                }
                other => return Err(TactileError::parse(ParseErrorKind::UnknownEncoding(other.to_string()), source.clone())),
            };
            LayerVariantIR::Tile(TileLayerIR { rows, cols, data })
        }
        "objectgroup" => {
            let objects = value.get("objects").and_then(Value::as_array).map(|arr| arr.iter().map(object_from_json).collect()).unwrap_or_default();
            LayerVariantIR::Object(ObjectLayerIR { objects })
        }
        "group" => {
            let children = value
                .get("layers")
                .and_then(Value::as_array)
                .map(|arr| arr.iter().map(|v| layer_from_json(v, source)).collect::<Result<Vec<_>>>())
                .transpose()?
                .unwrap_or_default();
            LayerVariantIR::Group(GroupLayerIR { children })
        }
        other => return Err(TactileError::parse(ParseErrorKind::InvalidEnum { name: "layer type", value: other.to_string() }, source.clone())),
    };

    Ok(LayerIR { id, opacity, visible, context, variant })
}

fn tileset_to_json(ts: &TilesetIR) -> Value {
    serde_json::json!({
        "name": ts.name,
        "firstgid": ts.first_tile,
        "tilewidth": ts.tile_size.0,
        "tileheight": ts.tile_size.1,
        "tilecount": ts.tile_count,
        "columns": ts.column_count,
        "image": ts.image_path.to_string_lossy(),
        "imagewidth": ts.image_size.0,
        "imageheight": ts.image_size.1,
        "tiles": ts.fancy_tiles.iter().map(|t| serde_json::json!({
            "id": t.local_index,
            "animation": t.frames.iter().map(|f| serde_json::json!({"tileid": f.local_index, "duration": f.duration_ms})).collect::<Vec<_>>(),
            "objectgroup": { "objects": t.objects.iter().map(object_to_json).collect::<Vec<_>>() },
            "properties": properties_to_tiled(&t.context),
        })).collect::<Vec<_>>(),
    })
}

fn tileset_from_json(value: &Value, source: &SourceLocation) -> Result<TilesetIR> {
    let first_tile = value.get("firstgid").and_then(Value::as_i64).unwrap_or(1) as i32;
    let name = value.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
    let fancy_tiles = value
        .get("tiles")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .map(|t| {
                    let local_index = t.get("id").and_then(Value::as_u64).unwrap_or(0) as u32;
                    let frames = t
                        .get("animation")
                        .and_then(Value::as_array)
                        .map(|frames| {
                            frames
                                .iter()
                                .map(|f| FrameIR { local_index: f.get("tileid").and_then(Value::as_u64).unwrap_or(0) as u32, duration_ms: f.get("duration").and_then(Value::as_u64).unwrap_or(0) as u32 })
                                .collect()
                        })
                        .unwrap_or_default();
                    let objects = t
                        .get("objectgroup")
                        .and_then(|g| g.get("objects"))
                        .and_then(Value::as_array)
                        .map(|arr| arr.iter().map(object_from_json).collect())
                        .unwrap_or_default();
                    let properties: Vec<TiledProperty> = t.get("properties").cloned().map(serde_json::from_value).transpose().ok().flatten().unwrap_or_default();
                    TileIR { local_index, frames, objects, context: context_from_tiled(String::new(), &properties) }
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(TilesetIR {
        name: name.clone(),
        first_tile,
        tile_size: (value.get("tilewidth").and_then(Value::as_i64).unwrap_or(16) as i32, value.get("tileheight").and_then(Value::as_i64).unwrap_or(16) as i32),
        tile_count: value.get("tilecount").and_then(Value::as_i64).unwrap_or(0) as i32,
        column_count: value.get("columns").and_then(Value::as_i64).unwrap_or(1) as i32,
        image_path: value.get("image").and_then(Value::as_str).unwrap_or_default().into(),
        image_size: (value.get("imagewidth").and_then(Value::as_i64).unwrap_or(0) as u32, value.get("imageheight").and_then(Value::as_i64).unwrap_or(0) as u32),
        embedded: value.get("source").is_none(),
        fancy_tiles,
        context: ContextIR::named(name),
    })
}

/// Lowers a [`MapIR`] to the Tiled JSON text format. Component instances are
/// flattened to `"definition.attribute"` properties; component definitions
/// themselves have no Tiled equivalent and are not emitted.
pub fn write_to_string(ir: &MapIR) -> Result<String> {
    let json = serde_json::json!({
        "type": "map",
        "version": SCHEMA_VERSION,
        "orientation": "orthogonal",
        "renderorder": "right-down",
        "width": ir.column_count,
        "height": ir.row_count,
        "tilewidth": ir.tile_width,
        "tileheight": ir.tile_height,
        "nextlayerid": ir.next_layer_id,
        "nextobjectid": ir.next_object_id,
        "infinite": false,
        "tilesets": ir.tilesets.iter().map(tileset_to_json).collect::<Vec<_>>(),
        "layers": ir.layers.iter().map(layer_to_json).collect::<Vec<_>>(),
    });
    serde_json::to_string_pretty(&json).map_err(|e| TactileError::parse(ParseErrorKind::CorruptTileData, SourceLocation::new(format!("<tiled-json: {e}>"))))
}

/// Parses the Tiled JSON text format. Component definitions are never
/// reconstructed (§9); only the flattened properties land in each context.
pub fn read_from_str(text: &str, source_path: &Path) -> Result<MapIR> {
    let source = SourceLocation::new(source_path);
    let value: Value = serde_json::from_str(text).map_err(|e| TactileError::parse(ParseErrorKind::MissingField(e.to_string()), source.clone()))?;

    let row_count = value.get("height").and_then(Value::as_u64).ok_or_else(|| TactileError::parse(ParseErrorKind::MissingField("height".into()), source.clone()))? as usize;
    let column_count = value.get("width").and_then(Value::as_u64).ok_or_else(|| TactileError::parse(ParseErrorKind::MissingField("width".into()), source.clone()))? as usize;

    let tilesets = value
        .get("tilesets")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().map(|v| tileset_from_json(v, &source)).collect::<Result<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();

    let layers = value
        .get("layers")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().map(|v| layer_from_json(v, &source)).collect::<Result<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();

    Ok(MapIR {
        tile_width: value.get("tilewidth").and_then(Value::as_i64).unwrap_or(16) as i32,
        tile_height: value.get("tileheight").and_then(Value::as_i64).unwrap_or(16) as i32,
        row_count,
        column_count,
        next_layer_id: value.get("nextlayerid").and_then(Value::as_i64).unwrap_or(1) as i32,
        next_object_id: value.get("nextobjectid").and_then(Value::as_i64).unwrap_or(1) as i32,
        tile_format: TileFormatIR { encoding: TileEncoding::Plain, compression: TileCompression::None, zlib_level: 6, zstd_level: 3 },
        component_defs: Vec::new(),
        tilesets,
        layers,
        context: ContextIR::named("map"),
    })
}

/// Saves `ir` to `path` as Tiled JSON.
pub fn save(ir: &MapIR, path: &Path, fs: &dyn FileSystem) -> Result<()> {
    let text = write_to_string(ir)?;
    fs.write(path, text.as_bytes()).map_err(|_| TactileError::io(crate::error::IoErrorKind::WriteFailed(path.to_path_buf())))
}

/// Loads a Tiled JSON map from `path`.
pub fn load(path: &Path, fs: &dyn FileSystem) -> Result<MapIR> {
    let bytes = fs.read(path).map_err(|_| TactileError::io(crate::error::IoErrorKind::FileNotFound(path.to_path_buf())))?;
    read_from_str(&String::from_utf8_lossy(&bytes), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::ir::{ComponentDefIR, TileFormatIR};

    fn sample_ir() -> MapIR {
        MapIR {
            tile_width: 16,
            tile_height: 16,
            row_count: 2,
            column_count: 2,
            next_layer_id: 2,
            next_object_id: 1,
            tile_format: TileFormatIR { encoding: TileEncoding::Plain, compression: TileCompression::None, zlib_level: 6, zstd_level: 3 },
            component_defs: vec![ComponentDefIR { name: "Health".into(), attributes: vec![] }],
            tilesets: vec![],
            layers: vec![LayerIR {
                id: 1,
                opacity: 1.0,
                visible: true,
                context: ContextIR::named("Ground"),
                variant: LayerVariantIR::Tile(TileLayerIR { rows: 2, cols: 2, data: vec![1, 2, 3, 4] }),
            }],
            context: ContextIR::named("map"),
        }
    }

    #[test]
    fn round_trips_tile_layer_data() {
        let ir = sample_ir();
        let text = write_to_string(&ir).unwrap();
        let reloaded = read_from_str(&text, Path::new("map.tmj")).unwrap();
        assert_eq!(reloaded.row_count, 2);
        assert_eq!(reloaded.column_count, 2);
        let LayerVariantIR::Tile(layer) = &reloaded.layers[0].variant else { panic!("expected tile layer") };
        assert_eq!(layer.data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn component_instances_flatten_to_named_properties() {
        let mut ir = sample_ir();
        ir.layers[0].context.components.push(crate::serialize::ir::AttachedComponentIR {
            definition_name: "Health".into(),
            values: vec![("hp".into(), crate::attribute::Attribute::Int(10))],
        });
        let text = write_to_string(&ir).unwrap();
        assert!(text.contains("Health.hp"));
    }

    #[test]
    fn read_rejects_malformed_json() {
        assert!(read_from_str("{not json", Path::new("bad.tmj")).is_err());
    }
}

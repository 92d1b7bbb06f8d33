//! The canonical native format: round-trips the full model, including
//! component definitions/instances and per-tile contexts (§4.7).

use std::collections::HashMap;
use std::path::Path;

use crate::component::{AttachedComponent, ComponentDefinition, ComponentIndex};
use crate::context::{Context, ContextStore};
use crate::document::{Document, DocumentContent, ObjectStore, TilesetStore};
use crate::error::{IoErrorKind, ParseErrorKind, Result, SourceLocation, TactileError};
use crate::external::FileSystem;
use crate::id::{LayerId, ObjectId, TileId, TileIndex, Uuid};
use crate::layer::tree::LayerTree;
use crate::layer::{GroupLayer, Layer, LayerKind, ObjectLayer, TileLayer};
use crate::map::{Map, TileFormat};
use crate::object::Object;
use crate::tileset::{Animation, FancyTile, Frame, TextureRef, Tileset};

use super::ir::{
    AttachedComponentIR, ComponentDefIR, ContextIR, FrameIR, GroupLayerIR, LayerIR, LayerVariantIR, MapIR, ObjectIR, ObjectLayerIR, TileFormatIR, TileIR, TileLayerIR,
    TilesetIR,
};
use super::path_policy;

fn context_to_ir(doc: &Document, uuid: Uuid) -> ContextIR {
    let context = doc.contexts.get(uuid);
    ContextIR {
        name: context.name.clone(),
        properties: context.properties().iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        components: context
            .components()
            .values()
            .map(|instance| AttachedComponentIR {
                definition_name: doc.components.get(instance.definition).expect("attached component's definition missing").name.clone(),
                values: instance.values.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            })
            .collect(),
    }
}

fn context_from_ir(ir: &ContextIR, name_to_def: &HashMap<String, Uuid>) -> Context {
    let mut context = Context::new(ir.name.clone());
    for (name, value) in &ir.properties {
        context.add_property(name.clone(), value.clone());
    }
    for component in &ir.components {
        let Some(&definition) = name_to_def.get(&component.definition_name) else { continue };
        let values = component.values.iter().cloned().collect();
        context.attach_component(AttachedComponent { definition, values });
    }
    context
}

fn object_value_to_ir(doc: &Document, object: &Object) -> ObjectIR {
    ObjectIR {
        id: object.id.get(),
        kind: object.kind,
        position: object.position,
        size: object.size,
        tag: object.tag.clone(),
        visible: object.visible,
        context: context_to_ir(doc, object.uuid),
    }
}

fn object_to_ir(doc: &Document, uuid: Uuid) -> ObjectIR {
    object_value_to_ir(doc, doc.objects.get(&uuid).expect("object missing from store"))
}

/// Builds a fresh [`Object`] and registers its context in `contexts`, without
/// placing it in any object store — used both for layer-referenced objects
/// (which the caller then inserts into an [`ObjectStore`]) and for objects
/// embedded directly in a [`FancyTile`].
fn embedded_object_from_ir(ir: &ObjectIR, name_to_def: &HashMap<String, Uuid>, contexts: &mut ContextStore) -> Object {
    let uuid = Uuid::new();
    let mut object = Object::new(uuid, ObjectId::new(ir.id), ir.kind, ir.position);
    object.size = ir.size;
    object.tag = ir.tag.clone();
    object.visible = ir.visible;
    contexts.insert(uuid, context_from_ir(&ir.context, name_to_def));
    object
}

fn object_from_ir(ir: &ObjectIR, name_to_def: &HashMap<String, Uuid>, objects: &mut ObjectStore, contexts: &mut ContextStore) -> Uuid {
    let object = embedded_object_from_ir(ir, name_to_def, contexts);
    let uuid = object.uuid;
    objects.insert(uuid, object);
    uuid
}

fn layer_to_ir(doc: &Document, uuid: Uuid) -> LayerIR {
    let layer = doc.map().root.get(uuid).expect("layer missing from tree");
    let variant = match &layer.kind {
        LayerKind::Tile(tile) => LayerVariantIR::Tile(TileLayerIR {
            rows: tile.matrix.rows(),
            cols: tile.matrix.cols(),
            data: tile.matrix.iter().map(|(_, id)| id.0).collect(),
        }),
        LayerKind::Object(objects) => LayerVariantIR::Object(ObjectLayerIR { objects: objects.objects().iter().map(|&o| object_to_ir(doc, o)).collect() }),
        LayerKind::Group(group) => LayerVariantIR::Group(GroupLayerIR { children: group.children().iter().map(|&c| layer_to_ir(doc, c)).collect() }),
    };
    LayerIR { id: layer.id.get(), opacity: layer.opacity, visible: layer.visible, context: context_to_ir(doc, uuid), variant }
}

fn layer_from_ir(ir: &LayerIR, parent: Option<Uuid>, tree: &mut LayerTree, contexts: &mut ContextStore, objects: &mut ObjectStore, name_to_def: &HashMap<String, Uuid>) -> Uuid {
    let uuid = Uuid::new();
    let kind = match &ir.variant {
        LayerVariantIR::Tile(tile_ir) => {
            let mut tile_layer = TileLayer::new(tile_ir.rows, tile_ir.cols);
            for (index, &id) in tile_ir.data.iter().enumerate() {
                let pos = (index / tile_ir.cols.max(1), index % tile_ir.cols.max(1));
                tile_layer.matrix.set(pos, TileId(id));
            }
            LayerKind::Tile(tile_layer)
        }
        LayerVariantIR::Object(object_ir) => {
            let mut layer = ObjectLayer::new();
            for obj in &object_ir.objects {
                layer.push(object_from_ir(obj, name_to_def, objects, contexts));
            }
            LayerKind::Object(layer)
        }
        LayerVariantIR::Group(_) => LayerKind::Group(GroupLayer::new()),
    };

    let layer = Layer::new(uuid, LayerId::new(ir.id), kind);
    tree.add(parent, layer);
    contexts.insert(uuid, context_from_ir(&ir.context, name_to_def));

    if let LayerVariantIR::Group(group_ir) = &ir.variant {
        for child in &group_ir.children {
            let child_uuid = layer_from_ir(child, Some(uuid), tree, contexts, objects, name_to_def);
            tree.get_mut(uuid).unwrap().kind.as_group_mut().unwrap().push(child_uuid);
        }
    }

    uuid
}

fn tileset_to_ir(doc: &Document, tileset: &Tileset, attached: &crate::tileset::AttachedTileset) -> TilesetIR {
    let context = context_to_ir(doc, attached.tileset);
    TilesetIR {
        name: context.name.clone(),
        first_tile: attached.first_tile_id.0,
        tile_size: tileset.tile_size,
        tile_count: tileset.tile_count(),
        column_count: tileset.column_count,
        image_path: tileset.texture.path.clone(),
        image_size: tileset.texture.size,
        embedded: attached.embedded,
        fancy_tiles: tileset
            .fancy_tiles()
            .iter()
            .map(|(&index, tile)| TileIR {
                local_index: index.0,
                frames: tile.animation.as_ref().map(|a| a.frames().iter().map(|f| FrameIR { local_index: f.tile_index.0, duration_ms: f.duration_ms }).collect()).unwrap_or_default(),
                objects: tile.objects.iter().map(|o| object_value_to_ir(doc, o)).collect(),
                context: context_to_ir(doc, tile.context_uuid),
            })
            .collect(),
        context,
    }
}

fn tileset_from_ir(tileset_ir: &TilesetIR, name_to_def: &HashMap<String, Uuid>, contexts: &mut ContextStore) -> (Uuid, Tileset) {
    let texture = TextureRef { path: tileset_ir.image_path.clone(), size: tileset_ir.image_size };
    let column_count = tileset_ir.column_count.max(1);
    let row_count = ((tileset_ir.tile_count + column_count - 1) / column_count).max(1);
    let uuid = Uuid::new();
    let mut tileset = Tileset::new(uuid, texture, tileset_ir.tile_size, row_count, column_count);

    for tile_ir in &tileset_ir.fancy_tiles {
        let index = TileIndex::new(tile_ir.local_index);
        let mut fancy = FancyTile::new();

        if let Some((first, rest)) = tile_ir.frames.split_first() {
            let mut frames = vec![Frame { tile_index: TileIndex::new(first.local_index), duration_ms: first.duration_ms }];
            for frame_ir in rest {
                frames.push(Frame { tile_index: TileIndex::new(frame_ir.local_index), duration_ms: frame_ir.duration_ms });
            }
            fancy.animation = Animation::new(frames);
        }

        fancy.objects = tile_ir.objects.iter().map(|o| embedded_object_from_ir(o, name_to_def, contexts)).collect();

        contexts.insert(fancy.context_uuid, context_from_ir(&tile_ir.context, name_to_def));
        tileset.set_fancy_tile(index, fancy);
    }

    (uuid, tileset)
}

/// Lowers an in-memory [`Document`] (which must hold a [`Map`]) into the
/// intermediate representation.
pub fn to_ir(doc: &Document) -> MapIR {
    let map = doc.map();

    let component_defs = doc
        .components
        .iter()
        .map(|def| ComponentDefIR { name: def.name.clone(), attributes: def.attributes.iter().map(|(k, v)| (k.clone(), v.clone())).collect() })
        .collect();

    let tilesets = map
        .tilesets()
        .values()
        .map(|attached| {
            let tileset = doc.tilesets.get(&attached.tileset).expect("attached tileset missing its working copy");
            tileset_to_ir(doc, tileset, attached)
        })
        .collect();

    let layers = map.root.root_children().iter().map(|&uuid| layer_to_ir(doc, uuid)).collect();

    MapIR {
        tile_width: map.tile_size.0,
        tile_height: map.tile_size.1,
        row_count: map.rows(),
        column_count: map.cols(),
        next_layer_id: map.next_layer_id.get(),
        next_object_id: map.next_object_id.get(),
        tile_format: TileFormatIR { encoding: map.tile_format.encoding, compression: map.tile_format.compression, zlib_level: map.tile_format.zlib_level, zstd_level: map.tile_format.zstd_level },
        component_defs,
        tilesets,
        layers,
        context: ContextIR::named("map"),
    }
}

/// Lifts a [`MapIR`] back into a fresh [`Document`]. Per §4.7's equivalence,
/// every entity gets a fresh [`Uuid`]; only persisted numeric ids and
/// structure are preserved.
pub fn from_ir(ir: &MapIR) -> Document {
    let tile_format = TileFormat { encoding: ir.tile_format.encoding, compression: ir.tile_format.compression, zlib_level: ir.tile_format.zlib_level, zstd_level: ir.tile_format.zstd_level };
    let mut map = Map::new((ir.tile_width, ir.tile_height), ir.row_count.max(1), ir.column_count.max(1), tile_format);
    map.next_layer_id = LayerId::new(ir.next_layer_id);
    map.next_object_id = ObjectId::new(ir.next_object_id);

    let mut document = Document::new(DocumentContent::Map(map), 100);

    let mut components = ComponentIndex::new();
    let mut name_to_def = HashMap::new();
    for def_ir in &ir.component_defs {
        let mut def = ComponentDefinition::new(def_ir.name.clone());
        for (name, value) in &def_ir.attributes {
            def.attributes.insert(name.clone(), value.clone());
        }
        let uuid = def.uuid;
        name_to_def.insert(def_ir.name.clone(), uuid);
        components.define(def);
    }
    document.components = components;

    let mut tilesets = TilesetStore::new();
    for tileset_ir in &ir.tilesets {
        let (uuid, tileset) = tileset_from_ir(tileset_ir, &name_to_def, &mut document.contexts);
        document.map_mut().attach_tileset(uuid, tileset_ir.tile_count, tileset_ir.embedded);
        document.contexts.insert(uuid, context_from_ir(&tileset_ir.context, &name_to_def));
        tilesets.insert(uuid, tileset);
    }
    document.tilesets = tilesets;

    let mut tree = LayerTree::new();
    let mut contexts = std::mem::take(&mut document.contexts);
    let mut objects = ObjectStore::new();
    for layer_ir in &ir.layers {
        layer_from_ir(layer_ir, None, &mut tree, &mut contexts, &mut objects, &name_to_def);
    }
    document.contexts = contexts;
    document.objects = objects;
    document.map_mut().root = tree;

    document
}

/// Serializes a document to the native YAML text format.
pub fn save_to_string(doc: &Document) -> Result<String> {
    let ir = to_ir(doc);
    serde_yaml_ng::to_string(&ir).map_err(|e| TactileError::parse(ParseErrorKind::CorruptTileData, SourceLocation::new(format!("<native-yaml: {e}>"))))
}

/// Parses the native YAML text format into a fresh document.
pub fn load_from_string(yaml: &str, source_path: &Path) -> Result<Document> {
    let ir: MapIR =
        serde_yaml_ng::from_str(yaml).map_err(|e| TactileError::parse(ParseErrorKind::MissingField(e.to_string()), SourceLocation::new(source_path)))?;
    Ok(from_ir(&ir))
}

/// Saves a document to `path` through `fs`.
pub fn save(doc: &Document, path: &Path, fs: &dyn FileSystem) -> Result<()> {
    let yaml = save_to_string(doc)?;
    fs.write(path, yaml.as_bytes()).map_err(|_| TactileError::io(IoErrorKind::WriteFailed(path.to_path_buf())))
}

/// Loads a document from `path` through `fs`.
pub fn load(path: &Path, fs: &dyn FileSystem) -> Result<Document> {
    let bytes = fs.read(path).map_err(|_| TactileError::io(IoErrorKind::FileNotFound(path.to_path_buf())))?;
    let text = String::from_utf8_lossy(&bytes);
    load_from_string(&text, path)
}

/// Renders a texture path relative to the map's directory, per the on-disk
/// path policy (§4.7).
pub fn texture_relative_path(map_dir: &Path, texture_path: &Path) -> std::path::PathBuf {
    path_policy::to_relative(map_dir, texture_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Attribute;
    use crate::map::TileFormat as TF;

    fn sample_document() -> Document {
        let mut map = Map::new((32, 32), 2, 2, TF::default());
        let id = map.allocate_layer_id();
        let tile_uuid = Uuid::new();
        let mut tile_layer = TileLayer::new(2, 2);
        tile_layer.matrix.set((0, 0), TileId(1));
        tile_layer.matrix.set((0, 1), TileId(2));
        tile_layer.matrix.set((1, 0), TileId(3));
        tile_layer.matrix.set((1, 1), TileId(4));
        map.root.add(None, Layer::new(tile_uuid, id, LayerKind::Tile(tile_layer)));

        let mut doc = Document::new(DocumentContent::Map(map), 100);
        doc.contexts.insert(tile_uuid, Context::new("Tiles"));

        let object_layer_id = doc.map_mut().allocate_layer_id();
        let object_layer_uuid = Uuid::new();
        doc.map_mut().root.add(None, Layer::new(object_layer_uuid, object_layer_id, LayerKind::Object(ObjectLayer::new())));
        doc.contexts.insert(object_layer_uuid, Context::new("Objects"));

        let object_uuid = Uuid::new();
        let mut rect = Object::new(object_uuid, ObjectId::new(1), crate::object::ObjectKind::Rect, (10.0, 20.0));
        rect.size = (30.0, 40.0);
        doc.objects.insert(object_uuid, rect);
        doc.contexts.insert(object_uuid, Context::new("Rectangle 1"));
        doc.map_mut().root.get_mut(object_layer_uuid).unwrap().kind.as_object_mut().unwrap().push(object_uuid);

        let mut def = ComponentDefinition::new("Health");
        def.attributes.insert("hp".to_string(), Attribute::Int(100));
        let def_uuid = def.uuid;
        doc.components.define(def);
        doc.contexts.get_mut(object_uuid).attach_component(AttachedComponent { definition: def_uuid, values: [("hp".to_string(), Attribute::Int(42))].into_iter().collect() });

        doc
    }

    #[test]
    fn round_trips_tile_data_and_extent() {
        let doc = sample_document();
        let yaml = save_to_string(&doc).unwrap();
        let reloaded = load_from_string(&yaml, Path::new("test.yaml")).unwrap();

        assert_eq!(reloaded.map().extent(), (2, 2));
        let tile_uuid = reloaded.map().root.root_children()[0];
        let layer = reloaded.map().root.get(tile_uuid).unwrap().kind.as_tile().unwrap();
        assert_eq!(layer.matrix.get((0, 0)), Some(TileId(1)));
        assert_eq!(layer.matrix.get((1, 1)), Some(TileId(4)));
    }

    #[test]
    fn round_trips_object_with_component_instance() {
        let doc = sample_document();
        let yaml = save_to_string(&doc).unwrap();
        let reloaded = load_from_string(&yaml, Path::new("test.yaml")).unwrap();

        let object_layer_uuid = reloaded.map().root.root_children()[1];
        let object_uuid = reloaded.map().root.get(object_layer_uuid).unwrap().kind.as_object().unwrap().objects()[0];
        let object = reloaded.objects.get(&object_uuid).unwrap();
        assert_eq!(object.position, (10.0, 20.0));
        assert_eq!(object.size, (30.0, 40.0));

        let def = reloaded.components.find_by_name("Health").unwrap();
        let instance = reloaded.contexts.get(object_uuid).get_component(def.uuid).unwrap();
        assert_eq!(instance.values["hp"], Attribute::Int(42));
    }

    #[test]
    fn load_rejects_malformed_yaml() {
        assert!(load_from_string("not: [valid, map, ir", Path::new("bad.yaml")).is_err());
    }
}

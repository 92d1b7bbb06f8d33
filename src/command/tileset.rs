//! Tileset-attachment commands: attach, detach, rename.

use std::any::Any;

use crate::command::{Command, CommandKind};
use crate::context::Context;
use crate::document::Document;
use crate::id::Uuid;
use crate::tileset::{AttachedTileset, Tileset};

/// Attaches a tileset to the active map, allocating a fresh tile-id range.
#[derive(Debug)]
pub struct AddTilesetCommand {
    tileset: Option<Tileset>,
    name: String,
    tile_count: i32,
    embedded: bool,
    attached: Option<AttachedTileset>,
}

impl AddTilesetCommand {
    pub fn new(tileset: Tileset, name: impl Into<String>, embedded: bool) -> Self {
        let tile_count = tileset.tile_count();
        Self { tileset: Some(tileset), name: name.into(), tile_count, embedded, attached: None }
    }
}

impl Command for AddTilesetCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::AddTileset
    }

    fn redo(&mut self, doc: &mut Document) {
        let uuid = self.tileset.as_ref().expect("tileset already consumed without being undone").uuid;
        let attached = doc.map_mut().attach_tileset(uuid, self.tile_count, self.embedded);
        doc.contexts.insert(uuid, Context::new(self.name.clone()));
        if let Some(tileset) = self.tileset.take() {
            doc.tilesets.insert(uuid, tileset);
        }
        self.attached = Some(attached);
    }

    fn undo(&mut self, doc: &mut Document) {
        let attached = self.attached.take().expect("undo called before redo");
        doc.map_mut().detach_tileset(attached.tileset);
        doc.contexts.destroy(attached.tileset);
        self.tileset = doc.tilesets.shift_remove(&attached.tileset);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Detaches a tileset from the active map, keeping it (and its context) for
/// undo.
#[derive(Debug)]
pub struct RemoveTilesetCommand {
    target: Uuid,
    attached: Option<AttachedTileset>,
    context: Option<Context>,
    tileset: Option<Tileset>,
}

impl RemoveTilesetCommand {
    pub fn new(target: Uuid) -> Self {
        Self { target, attached: None, context: None, tileset: None }
    }
}

impl Command for RemoveTilesetCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RemoveTileset
    }

    fn redo(&mut self, doc: &mut Document) {
        self.attached = doc.map_mut().detach_tileset(self.target);
        self.context = doc.contexts.destroy(self.target);
        self.tileset = doc.tilesets.shift_remove(&self.target);
    }

    fn undo(&mut self, doc: &mut Document) {
        let attached = self.attached.take().expect("undo called before redo");
        let context = self.context.take().expect("undo called before redo");
        let tileset = self.tileset.take().expect("undo called before redo");
        doc.map_mut().reattach_tileset(attached);
        doc.contexts.insert(self.target, context);
        doc.tilesets.insert(self.target, tileset);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct RenameTilesetCommand {
    target: Uuid,
    new_name: String,
    previous_name: Option<String>,
}

impl RenameTilesetCommand {
    pub fn new(target: Uuid, new_name: impl Into<String>) -> Self {
        Self { target, new_name: new_name.into(), previous_name: None }
    }
}

impl Command for RenameTilesetCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RenameTileset
    }

    fn redo(&mut self, doc: &mut Document) {
        let context = doc.contexts.get_mut(self.target);
        self.previous_name = Some(std::mem::replace(&mut context.name, self.new_name.clone()));
    }

    fn undo(&mut self, doc: &mut Document) {
        let previous = self.previous_name.take().expect("undo called before redo");
        doc.contexts.get_mut(self.target).name = previous;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentContent;
    use crate::map::{Map, TileFormat};
    use crate::tileset::TextureRef;
    use std::path::PathBuf;

    fn test_doc() -> Document {
        Document::new(DocumentContent::Map(Map::new((32, 32), 4, 4, TileFormat::default())), 100)
    }

    fn tileset() -> Tileset {
        let texture = TextureRef { path: PathBuf::from("tiles.png"), size: (256, 256) };
        Tileset::new(Uuid::new(), texture, (32, 32), 4, 4)
    }

    #[test]
    fn add_then_undo_detaches_and_destroys_context() {
        let mut doc = test_doc();
        let source = tileset();
        let uuid = source.uuid;
        let mut cmd = AddTilesetCommand::new(source, "Tiles", false);
        cmd.redo(&mut doc);
        assert!(doc.map().tilesets().contains_key(&uuid));
        assert!(doc.tilesets.contains_key(&uuid));
        assert_eq!(doc.contexts.get(uuid).name, "Tiles");

        cmd.undo(&mut doc);
        assert!(doc.map().tilesets().is_empty());
        assert!(doc.tilesets.is_empty());
    }

    #[test]
    fn remove_then_undo_restores_attachment_and_context() {
        let mut doc = test_doc();
        let mut add = AddTilesetCommand::new(tileset(), "Tiles", false);
        add.redo(&mut doc);
        let uuid = doc.map().tilesets().keys().next().copied().unwrap();

        let mut remove = RemoveTilesetCommand::new(uuid);
        remove.redo(&mut doc);
        assert!(doc.map().tilesets().is_empty());

        remove.undo(&mut doc);
        assert!(doc.map().tilesets().contains_key(&uuid));
        assert_eq!(doc.contexts.get(uuid).name, "Tiles");
    }
}

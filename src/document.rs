//! Documents: the unit the shell opens, edits, and saves. A `Document`
//! bundles a command stack with either a `Map` or a standalone `Tileset`
//! being edited directly, plus the context/component storage shared by
//! whichever content it holds.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::command::CommandStack;
use crate::component::ComponentIndex;
use crate::context::ContextStore;
use crate::id::Uuid;
use crate::map::Map;
use crate::object::Object;
use crate::tileset::Tileset;

/// Storage for the full [`Tileset`] data backing every tileset attached to a
/// map document — [`crate::map::Map`] itself only keeps the lightweight
/// [`crate::tileset::AttachedTileset`] range record, keyed by the same uuid.
/// Embedded and externally-referenced tilesets are both kept here; embedded
/// vs. external only affects how the tileset is (de)serialized, not where
/// its working copy lives while the document is open.
pub type TilesetStore = IndexMap<Uuid, Tileset>;

/// Storage for every [`Object`] placed in the document's map —
/// [`crate::layer::object_layer::ObjectLayer`] only keeps the uuid ordering,
/// the same split used for tilesets above.
pub type ObjectStore = IndexMap<Uuid, Object>;

/// Which kind of content a [`Document`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    Map,
    Tileset,
}

/// A document's editable content: a full map, or a tileset opened on its
/// own (e.g. to edit fancy-tile data outside of any particular map).
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentContent {
    Map(Map),
    Tileset(Tileset),
}

impl DocumentContent {
    pub fn kind(&self) -> DocumentKind {
        match self {
            DocumentContent::Map(_) => DocumentKind::Map,
            DocumentContent::Tileset(_) => DocumentKind::Tileset,
        }
    }
}

/// One open document: its content, its undo history, and the
/// name/property/component storage for every entity it contains.
///
/// Context and component storage live here (not on `Map`/`Tileset`
/// themselves) so that every nameable entity in the document — map, layer,
/// object, tileset, tile — resolves through the same
/// [`crate::context::ContextStore`], matching §4.1's "registry" contract.
pub struct Document {
    pub uuid: Uuid,
    pub file_path: Option<PathBuf>,
    pub command_stack: CommandStack,
    pub contexts: ContextStore,
    pub components: ComponentIndex,
    /// Working copies of every tileset attached to this document's map.
    /// Empty and unused for a [`DocumentContent::Tileset`] document (whose
    /// single tileset lives in `content` directly).
    pub tilesets: TilesetStore,
    /// Every placed object, keyed by uuid. Empty and unused for a
    /// [`DocumentContent::Tileset`] document.
    pub objects: ObjectStore,
    pub content: DocumentContent,
}

impl Document {
    pub fn new(content: DocumentContent, command_capacity: usize) -> Self {
        Self {
            uuid: Uuid::new(),
            file_path: None,
            command_stack: CommandStack::new(command_capacity),
            contexts: ContextStore::new(),
            components: ComponentIndex::new(),
            tilesets: TilesetStore::new(),
            objects: ObjectStore::new(),
            content,
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.content.kind()
    }

    /// Borrows the map content. Panics (a [`crate::error::LogicError`]
    /// assertion) if this document holds a tileset instead — calling a
    /// map-only operation on the wrong document kind is a programmer error.
    pub fn map(&self) -> &Map {
        match &self.content {
            DocumentContent::Map(map) => map,
            DocumentContent::Tileset(_) => {
                crate::assert_logic!(false, "document does not hold a map");
                unreachable!("document does not hold a map")
            }
        }
    }

    pub fn map_mut(&mut self) -> &mut Map {
        match &mut self.content {
            DocumentContent::Map(map) => map,
            DocumentContent::Tileset(_) => {
                crate::assert_logic!(false, "document does not hold a map");
                unreachable!("document does not hold a map")
            }
        }
    }

    pub fn tileset(&self) -> &Tileset {
        match &self.content {
            DocumentContent::Tileset(tileset) => tileset,
            DocumentContent::Map(_) => {
                crate::assert_logic!(false, "document does not hold a tileset");
                unreachable!("document does not hold a tileset")
            }
        }
    }

    pub fn tileset_mut(&mut self) -> &mut Tileset {
        match &mut self.content {
            DocumentContent::Tileset(tileset) => tileset,
            DocumentContent::Map(_) => {
                crate::assert_logic!(false, "document does not hold a tileset");
                unreachable!("document does not hold a tileset")
            }
        }
    }
}

/// Owns every open [`Document`], in open order, plus which one is active.
#[derive(Default)]
pub struct DocumentManager {
    documents: IndexMap<Uuid, Document>,
    open_order: Vec<Uuid>,
    active: Option<Uuid>,
}

impl DocumentManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly-created document and makes it active.
    pub fn add(&mut self, document: Document) -> Uuid {
        let uuid = document.uuid;
        self.documents.insert(uuid, document);
        self.open_order.push(uuid);
        self.active = Some(uuid);
        uuid
    }

    /// Closes and drops a document, picking a neighbour as the new active
    /// document if the closed one was active.
    pub fn close(&mut self, uuid: Uuid) -> Option<Document> {
        let removed = self.documents.shift_remove(&uuid)?;
        let Some(position) = self.open_order.iter().position(|&u| u == uuid) else {
            return Some(removed);
        };
        self.open_order.remove(position);

        if self.active == Some(uuid) {
            self.active = self.open_order.get(position).or_else(|| position.checked_sub(1).and_then(|i| self.open_order.get(i))).copied();
        }

        Some(removed)
    }

    pub fn get(&self, uuid: Uuid) -> Option<&Document> {
        self.documents.get(&uuid)
    }

    pub fn get_mut(&mut self, uuid: Uuid) -> Option<&mut Document> {
        self.documents.get_mut(&uuid)
    }

    pub fn open_order(&self) -> &[Uuid] {
        &self.open_order
    }

    pub fn active(&self) -> Option<Uuid> {
        self.active
    }

    pub fn set_active(&mut self, uuid: Uuid) {
        crate::assert_logic!(self.documents.contains_key(&uuid), "cannot activate an unopened document");
        self.active = Some(uuid);
    }

    pub fn active_document(&self) -> Option<&Document> {
        self.active.and_then(|uuid| self.documents.get(&uuid))
    }

    pub fn active_document_mut(&mut self) -> Option<&mut Document> {
        let uuid = self.active?;
        self.documents.get_mut(&uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::TileFormat;

    fn map_document() -> Document {
        Document::new(DocumentContent::Map(Map::new((32, 32), 4, 4, TileFormat::default())), 100)
    }

    #[test]
    fn closing_active_document_falls_back_to_a_neighbour() {
        let mut manager = DocumentManager::new();
        let a = manager.add(map_document());
        let b = manager.add(map_document());
        assert_eq!(manager.active(), Some(b));

        manager.close(b);
        assert_eq!(manager.active(), Some(a));
    }

    #[test]
    fn closing_last_document_leaves_nothing_active() {
        let mut manager = DocumentManager::new();
        let a = manager.add(map_document());
        manager.close(a);
        assert_eq!(manager.active(), None);
        assert!(manager.open_order().is_empty());
    }
}

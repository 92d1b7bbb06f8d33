//! Layer commands: add, remove, rename, duplicate, reorder, opacity, and
//! visibility. Grounded on the command-stack contract in
//! `command_stack.cpp` and the tree operations in
//! [`crate::layer::tree::LayerTree`].

use std::any::Any;

use crate::command::{same_kind_and_uuid, Command, CommandKind};
use crate::context::Context;
use crate::document::Document;
use crate::id::{LayerId, Uuid};
use crate::layer::tree::DetachedSubtree;
use crate::layer::{GroupLayer, Layer, LayerKind, ObjectLayer, TileLayer};

/// Which kind of empty layer [`AddLayerCommand`] creates. A tile layer is
/// built at `redo` time, sized to the map's current extent, rather than
/// carrying a fixed size picked when the command was constructed — undo/redo
/// can run after the map has been resized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewLayerKind {
    Tile,
    Object,
    Group,
}

impl NewLayerKind {
    fn build(self, rows: usize, cols: usize) -> LayerKind {
        match self {
            NewLayerKind::Tile => LayerKind::Tile(TileLayer::new(rows, cols)),
            NewLayerKind::Object => LayerKind::Object(ObjectLayer::new()),
            NewLayerKind::Group => LayerKind::Group(GroupLayer::new()),
        }
    }
}

/// Adds a freshly-created layer of `kind` under `parent` (`None` for the
/// root), allocating a fresh id and context on first `redo`.
#[derive(Debug)]
pub struct AddLayerCommand {
    parent: Option<Uuid>,
    name: String,
    kind: NewLayerKind,
    added: Option<Uuid>,
}

impl AddLayerCommand {
    pub fn new(parent: Option<Uuid>, name: impl Into<String>, kind: NewLayerKind) -> Self {
        Self { parent, name: name.into(), kind, added: None }
    }
}

impl Command for AddLayerCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::AddLayer
    }

    fn redo(&mut self, doc: &mut Document) {
        let map = doc.map_mut();
        let uuid = match self.added {
            Some(uuid) => uuid,
            None => Uuid::new(),
        };
        let id = map.allocate_layer_id();
        let layer_kind = self.kind.build(map.rows(), map.cols());
        let layer = Layer::new(uuid, id, layer_kind);
        map.root.add(self.parent, layer);
        map.active_layer = Some(uuid);
        self.added = Some(uuid);
        doc.contexts.insert(uuid, Context::new(self.name.clone()));
    }

    fn undo(&mut self, doc: &mut Document) {
        let uuid = self.added.expect("undo called before redo");
        let map = doc.map_mut();
        map.root.remove(uuid);
        if map.active_layer == Some(uuid) {
            map.active_layer = None;
        }
        doc.contexts.destroy(uuid);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Removes a layer (and its subtree), keeping the detached subtree and its
/// contexts so undo can restore it exactly.
#[derive(Debug)]
pub struct RemoveLayerCommand {
    target: Uuid,
    detached: Option<DetachedSubtree>,
    contexts: Vec<(Uuid, Context)>,
    prior_active: Option<Uuid>,
}

impl RemoveLayerCommand {
    pub fn new(target: Uuid) -> Self {
        Self { target, detached: None, contexts: Vec::new(), prior_active: None }
    }
}

impl Command for RemoveLayerCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RemoveLayer
    }

    fn redo(&mut self, doc: &mut Document) {
        let map = doc.map_mut();
        self.prior_active = map.root.active_after_removal(self.target, map.active_layer);
        let detached = map.root.remove(self.target).expect("target layer missing");
        map.active_layer = self.prior_active;
        self.contexts = detached.uuids().map(|u| (u, doc.contexts.destroy(u).expect("context missing"))).collect();
        self.detached = Some(detached);
    }

    fn undo(&mut self, doc: &mut Document) {
        for (uuid, context) in self.contexts.drain(..) {
            doc.contexts.insert(uuid, context);
        }
        let detached = self.detached.take().expect("undo called before redo");
        doc.map_mut().root.reattach(detached);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Renames a layer's context, storing the previous name for undo.
#[derive(Debug)]
pub struct RenameLayerCommand {
    target: Uuid,
    new_name: String,
    previous_name: Option<String>,
}

impl RenameLayerCommand {
    pub fn new(target: Uuid, new_name: impl Into<String>) -> Self {
        Self { target, new_name: new_name.into(), previous_name: None }
    }
}

impl Command for RenameLayerCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RenameLayer
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

/// Duplicates a layer subtree via [`crate::layer::tree::LayerTree::duplicate`].
#[derive(Debug)]
pub struct DuplicateLayerCommand {
    source: Uuid,
    copy: Option<Uuid>,
}

impl DuplicateLayerCommand {
    pub fn new(source: Uuid) -> Self {
        Self { source, copy: None }
    }
}

impl Command for DuplicateLayerCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::DuplicateLayer
    }

    fn redo(&mut self, doc: &mut Document) {
        let contexts = &mut doc.contexts;
        let map = match &mut doc.content {
            crate::document::DocumentContent::Map(map) => map,
            crate::document::DocumentContent::Tileset(_) => {
                crate::assert_logic!(false, "document does not hold a map");
                unreachable!("document does not hold a map")
            }
        };
        let mut next_id = map.next_layer_id;
        let copy = map
            .root
            .duplicate(self.source, contexts, || {
                let id = next_id;
                next_id = LayerId(next_id.0 + 1);
                id
            })
            .expect("source layer missing");
        map.next_layer_id = next_id;
        self.copy = Some(copy);
    }

    fn undo(&mut self, doc: &mut Document) {
        let uuid = self.copy.expect("undo called before redo");
        let map = doc.map_mut();
        if let Some(detached) = map.root.remove(uuid) {
            for u in detached.uuids() {
                doc.contexts.destroy(u);
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct MoveLayerUpCommand {
    target: Uuid,
}

impl MoveLayerUpCommand {
    pub fn new(target: Uuid) -> Self {
        Self { target }
    }
}

impl Command for MoveLayerUpCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::MoveLayerUp
    }

    fn redo(&mut self, doc: &mut Document) {
        doc.map_mut().root.move_up(self.target);
    }

    fn undo(&mut self, doc: &mut Document) {
        doc.map_mut().root.move_down(self.target);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct MoveLayerDownCommand {
    target: Uuid,
}

impl MoveLayerDownCommand {
    pub fn new(target: Uuid) -> Self {
        Self { target }
    }
}

impl Command for MoveLayerDownCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::MoveLayerDown
    }

    fn redo(&mut self, doc: &mut Document) {
        doc.map_mut().root.move_down(self.target);
    }

    fn undo(&mut self, doc: &mut Document) {
        doc.map_mut().root.move_up(self.target);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Sets a layer's opacity. Mergeable with a prior `SetLayerOpacity` on the
/// same layer, per §4.2's drag-slider scenario: intermediate values collapse
/// into a single undo step bridging the original and final opacity.
#[derive(Debug)]
pub struct SetLayerOpacityCommand {
    target: Uuid,
    new_opacity: f32,
    previous_opacity: Option<f32>,
}

impl SetLayerOpacityCommand {
    pub fn new(target: Uuid, new_opacity: f32) -> Self {
        Self { target, new_opacity, previous_opacity: None }
    }
}

impl Command for SetLayerOpacityCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::SetLayerOpacity
    }

    fn redo(&mut self, doc: &mut Document) {
        let layer = doc.map_mut().root.get_mut(self.target).expect("target layer missing");
        if self.previous_opacity.is_none() {
            self.previous_opacity = Some(layer.opacity);
        }
        layer.opacity = self.new_opacity;
    }

    fn undo(&mut self, doc: &mut Document) {
        let previous = self.previous_opacity.expect("undo called before redo");
        doc.map_mut().root.get_mut(self.target).expect("target layer missing").opacity = previous;
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        let Some(other) = other.as_any().downcast_ref::<SetLayerOpacityCommand>() else { return false };
        if !same_kind_and_uuid(other, self.kind(), self.target, other.target) {
            return false;
        }
        self.new_opacity = other.new_opacity;
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct SetLayerVisibilityCommand {
    target: Uuid,
    new_visible: bool,
    previous_visible: Option<bool>,
}

impl SetLayerVisibilityCommand {
    pub fn new(target: Uuid, new_visible: bool) -> Self {
        Self { target, new_visible, previous_visible: None }
    }
}

impl Command for SetLayerVisibilityCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::SetLayerVisibility
    }

    fn redo(&mut self, doc: &mut Document) {
        let layer = doc.map_mut().root.get_mut(self.target).expect("target layer missing");
        if self.previous_visible.is_none() {
            self.previous_visible = Some(layer.visible);
        }
        layer.visible = self.new_visible;
    }

    fn undo(&mut self, doc: &mut Document) {
        let previous = self.previous_visible.expect("undo called before redo");
        doc.map_mut().root.get_mut(self.target).expect("target layer missing").visible = previous;
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        let Some(other) = other.as_any().downcast_ref::<SetLayerVisibilityCommand>() else { return false };
        if !same_kind_and_uuid(other, self.kind(), self.target, other.target) {
            return false;
        }
        self.new_visible = other.new_visible;
        true
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

    fn test_doc() -> Document {
        Document::new(DocumentContent::Map(Map::new((32, 32), 4, 4, TileFormat::default())), 100)
    }

    #[test]
    fn add_tile_layer_sizes_matrix_to_the_map_extent() {
        let mut doc = test_doc();
        let mut cmd = AddLayerCommand::new(None, "Ground", NewLayerKind::Tile);
        cmd.redo(&mut doc);
        let uuid = cmd.added.unwrap();
        let layer = doc.map().root.get(uuid).unwrap();
        assert_eq!(layer.kind.as_tile().unwrap().matrix.extent(), (4, 4));
    }

    #[test]
    fn add_then_undo_removes_layer_and_context() {
        let mut doc = test_doc();
        let mut cmd = AddLayerCommand::new(None, "Layer", NewLayerKind::Object);
        cmd.redo(&mut doc);
        let uuid = cmd.added.unwrap();
        assert!(doc.map().root.contains(uuid));
        assert_eq!(doc.contexts.get(uuid).name, "Layer");

        cmd.undo(&mut doc);
        assert!(!doc.map().root.contains(uuid));
    }

    #[test]
    fn remove_then_undo_restores_subtree_and_contexts() {
        let mut doc = test_doc();
        let mut add = AddLayerCommand::new(None, "L", NewLayerKind::Group);
        add.redo(&mut doc);
        let uuid = add.added.unwrap();

        let mut remove = RemoveLayerCommand::new(uuid);
        remove.redo(&mut doc);
        assert!(!doc.map().root.contains(uuid));

        remove.undo(&mut doc);
        assert!(doc.map().root.contains(uuid));
        assert_eq!(doc.contexts.get(uuid).name, "L");
    }

    #[test]
    fn opacity_commands_merge_on_same_target() {
        let mut doc = test_doc();
        let mut add = AddLayerCommand::new(None, "L", NewLayerKind::Object);
        add.redo(&mut doc);
        let uuid = add.added.unwrap();

        let mut first = SetLayerOpacityCommand::new(uuid, 0.5);
        first.redo(&mut doc);
        let mut second = SetLayerOpacityCommand::new(uuid, 0.2);
        second.redo(&mut doc);
        assert!(first.merge_with(&second));
        assert_eq!(first.new_opacity, 0.2);

        first.undo(&mut doc);
        assert_eq!(doc.map().root.get(uuid).unwrap().opacity, 1.0);
    }

    #[test]
    fn rename_layer_restores_previous_name_on_undo() {
        let mut doc = test_doc();
        let mut add = AddLayerCommand::new(None, "Original", NewLayerKind::Object);
        add.redo(&mut doc);
        let uuid = add.added.unwrap();

        let mut rename = RenameLayerCommand::new(uuid, "Renamed");
        rename.redo(&mut doc);
        assert_eq!(doc.contexts.get(uuid).name, "Renamed");
        rename.undo(&mut doc);
        assert_eq!(doc.contexts.get(uuid).name, "Original");
    }
}

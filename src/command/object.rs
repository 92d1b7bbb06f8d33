//! Object commands: place, move (mergeable), rename, tag, show/hide.

use std::any::Any;

use crate::command::{Command, CommandKind};
use crate::context::Context;
use crate::document::Document;
use crate::id::{ObjectId, Uuid};
use crate::object::{Object, ObjectKind};

/// Places a new object of the given kind on a target object layer.
#[derive(Debug)]
pub struct AddObjectCommand {
    layer: Uuid,
    kind: ObjectKind,
    position: (f32, f32),
    size: (f32, f32),
    placed: Option<Uuid>,
}

impl AddObjectCommand {
    pub fn rect(layer: Uuid, position: (f32, f32), size: (f32, f32)) -> Self {
        Self { layer, kind: ObjectKind::Rect, position, size, placed: None }
    }

    pub fn ellipse(layer: Uuid, position: (f32, f32), size: (f32, f32)) -> Self {
        Self { layer, kind: ObjectKind::Ellipse, position, size, placed: None }
    }

    pub fn point(layer: Uuid, position: (f32, f32)) -> Self {
        Self { layer, kind: ObjectKind::Point, position, size: (0.0, 0.0), placed: None }
    }
}

impl Command for AddObjectCommand {
    fn kind(&self) -> CommandKind {
        match self.kind {
            ObjectKind::Rect => CommandKind::AddRectangleObject,
            ObjectKind::Ellipse => CommandKind::AddEllipseObject,
            ObjectKind::Point => CommandKind::AddPointObject,
        }
    }

    fn redo(&mut self, doc: &mut Document) {
        let (uuid, id) = match self.placed {
            Some(uuid) => (uuid, doc.objects.get(&uuid).expect("object missing on re-redo").id),
            None => {
                let id = doc.map_mut().allocate_object_id();
                (Uuid::new(), id)
            }
        };

        let mut object = Object::new(uuid, id, self.kind, self.position);
        object.size = self.size;

        let map = doc.map_mut();
        map.root.get_mut(self.layer).expect("target object layer missing").kind.as_object_mut().expect("target is not an object layer").push(uuid);

        doc.objects.insert(uuid, object);
        doc.contexts.insert(uuid, Context::new(default_name(self.kind, id)));
        self.placed = Some(uuid);
    }

    fn undo(&mut self, doc: &mut Document) {
        let uuid = self.placed.expect("undo called before redo");
        let map = doc.map_mut();
        map.root.get_mut(self.layer).expect("target object layer missing").kind.as_object_mut().expect("target is not an object layer").remove(uuid);
        doc.objects.shift_remove(&uuid);
        doc.contexts.destroy(uuid);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn default_name(kind: ObjectKind, id: ObjectId) -> String {
    let label = match kind {
        ObjectKind::Rect => "Rectangle",
        ObjectKind::Ellipse => "Ellipse",
        ObjectKind::Point => "Point",
    };
    format!("{label} {}", id.0)
}

/// Moves an object to a new position. Mergeable with a prior move of the
/// same object, so dragging collapses into a single undo step.
#[derive(Debug)]
pub struct MoveObjectCommand {
    target: Uuid,
    new_position: (f32, f32),
    previous_position: Option<(f32, f32)>,
}

impl MoveObjectCommand {
    pub fn new(target: Uuid, new_position: (f32, f32)) -> Self {
        Self { target, new_position, previous_position: None }
    }
}

impl Command for MoveObjectCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::MoveObject
    }

    fn redo(&mut self, doc: &mut Document) {
        let object = doc.objects.get_mut(&self.target).expect("target object missing");
        if self.previous_position.is_none() {
            self.previous_position = Some(object.position);
        }
        object.position = self.new_position;
    }

    fn undo(&mut self, doc: &mut Document) {
        let previous = self.previous_position.expect("undo called before redo");
        doc.objects.get_mut(&self.target).expect("target object missing").position = previous;
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        let Some(other) = other.as_any().downcast_ref::<MoveObjectCommand>() else { return false };
        if other.kind() != self.kind() || other.target != self.target {
            return false;
        }
        self.new_position = other.new_position;
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct RenameObjectCommand {
    target: Uuid,
    new_name: String,
    previous_name: Option<String>,
}

impl RenameObjectCommand {
    pub fn new(target: Uuid, new_name: impl Into<String>) -> Self {
        Self { target, new_name: new_name.into(), previous_name: None }
    }
}

impl Command for RenameObjectCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RenameObject
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

#[derive(Debug)]
pub struct TagObjectCommand {
    target: Uuid,
    new_tag: String,
    previous_tag: Option<String>,
}

impl TagObjectCommand {
    pub fn new(target: Uuid, new_tag: impl Into<String>) -> Self {
        Self { target, new_tag: new_tag.into(), previous_tag: None }
    }
}

impl Command for TagObjectCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::TagObject
    }

    fn redo(&mut self, doc: &mut Document) {
        let object = doc.objects.get_mut(&self.target).expect("target object missing");
        self.previous_tag = Some(std::mem::replace(&mut object.tag, self.new_tag.clone()));
    }

    fn undo(&mut self, doc: &mut Document) {
        let previous = self.previous_tag.take().expect("undo called before redo");
        doc.objects.get_mut(&self.target).expect("target object missing").tag = previous;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct ShowHideObjectCommand {
    target: Uuid,
    new_visible: bool,
}

impl ShowHideObjectCommand {
    pub fn new(target: Uuid, new_visible: bool) -> Self {
        Self { target, new_visible }
    }
}

impl Command for ShowHideObjectCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::ShowHideObject
    }

    fn redo(&mut self, doc: &mut Document) {
        doc.objects.get_mut(&self.target).expect("target object missing").visible = self.new_visible;
    }

    fn undo(&mut self, doc: &mut Document) {
        doc.objects.get_mut(&self.target).expect("target object missing").visible = !self.new_visible;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentContent;
    use crate::layer::{Layer, LayerKind, ObjectLayer};
    use crate::map::{Map, TileFormat};

    fn test_doc() -> (Document, Uuid) {
        let mut map = Map::new((32, 32), 4, 4, TileFormat::default());
        let id = map.allocate_layer_id();
        let layer_uuid = Uuid::new();
        let layer = Layer::new(layer_uuid, id, LayerKind::Object(ObjectLayer::new()));
        map.root.add(None, layer);
        let mut doc = Document::new(DocumentContent::Map(map), 100);
        doc.contexts.insert(layer_uuid, Context::new("Objects"));
        (doc, layer_uuid)
    }

    #[test]
    fn add_then_undo_removes_object_and_context() {
        let (mut doc, layer) = test_doc();
        let mut add = AddObjectCommand::rect(layer, (1.0, 2.0), (4.0, 4.0));
        add.redo(&mut doc);
        assert_eq!(doc.objects.len(), 1);
        let uuid = *doc.objects.keys().next().unwrap();
        assert!(doc.map().root.get(layer).unwrap().kind.as_object().unwrap().contains(uuid));

        add.undo(&mut doc);
        assert!(doc.objects.is_empty());
        assert!(!doc.map().root.get(layer).unwrap().kind.as_object().unwrap().contains(uuid));
    }

    #[test]
    fn move_commands_merge_and_undo_restores_original_position() {
        let (mut doc, layer) = test_doc();
        let mut add = AddObjectCommand::point(layer, (0.0, 0.0));
        add.redo(&mut doc);
        let uuid = *doc.objects.keys().next().unwrap();

        let mut first = MoveObjectCommand::new(uuid, (5.0, 5.0));
        first.redo(&mut doc);
        let mut second = MoveObjectCommand::new(uuid, (9.0, 9.0));
        second.redo(&mut doc);
        assert!(first.merge_with(&second));

        first.undo(&mut doc);
        assert_eq!(doc.objects.get(&uuid).unwrap().position, (0.0, 0.0));
    }

    #[test]
    fn show_hide_toggles_and_undoes() {
        let (mut doc, layer) = test_doc();
        let mut add = AddObjectCommand::point(layer, (0.0, 0.0));
        add.redo(&mut doc);
        let uuid = *doc.objects.keys().next().unwrap();

        let mut hide = ShowHideObjectCommand::new(uuid, false);
        hide.redo(&mut doc);
        assert!(!doc.objects.get(&uuid).unwrap().visible);
        hide.undo(&mut doc);
        assert!(doc.objects.get(&uuid).unwrap().visible);
    }
}

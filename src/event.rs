//! The UI event queue and its dispatcher.
//!
//! Per §6, the shell posts typed events into a queue rather than calling
//! commands directly; per §5, the dispatcher drains that queue once per
//! frame in FIFO order, and each event's command push (plus its snapshot
//! work) completes before the next event is handled. `Event` enumerates
//! every operation listed in §4.2's "command kinds" — one variant per
//! command, carrying exactly the arguments its command constructor needs.

use std::collections::VecDeque;

use crate::attribute::{Attribute, AttributeType};
use crate::command::component::{
    AttachComponentCommand, CreateComponentAttributeCommand, CreateComponentDefinitionCommand, DetachComponentCommand, DuplicateComponentDefinitionCommand,
    RemoveComponentAttributeCommand, RemoveComponentDefinitionCommand, RenameComponentAttributeCommand, RenameComponentDefinitionCommand, ResetAttachedComponentCommand,
    RetypeComponentAttributeCommand, UpdateAttachedComponentCommand,
};
use crate::command::layer::{AddLayerCommand, DuplicateLayerCommand, MoveLayerDownCommand, MoveLayerUpCommand, RemoveLayerCommand, RenameLayerCommand, SetLayerOpacityCommand, SetLayerVisibilityCommand};
use crate::command::object::{AddObjectCommand, MoveObjectCommand, RenameObjectCommand, ShowHideObjectCommand, TagObjectCommand};
use crate::command::property::{AddPropertyCommand, ChangePropertyTypeCommand, RemovePropertyCommand, RenamePropertyCommand, UpdatePropertyCommand};
use crate::command::tile::{AddColumnCommand, AddRowCommand, BucketFillCommand, EraserSequenceCommand, FixInvalidTilesCommand, RemoveColumnCommand, RemoveRowCommand, StampSequenceCommand};
use crate::command::tileset::{AddTilesetCommand, RemoveTilesetCommand, RenameTilesetCommand};
use crate::command::{Command, CommandStack};
use crate::document::Document;
use crate::id::{TileId, Uuid};
use crate::layer::tile_layer::StampCell;
use crate::object::ObjectKind;
use crate::tile_matrix::Position;
use crate::tileset::Tileset;

pub use crate::command::layer::NewLayerKind;

/// One placed-object request for [`Event::AddObject`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NewObject {
    Rect { position: (f32, f32), size: (f32, f32) },
    Ellipse { position: (f32, f32), size: (f32, f32) },
    Point { position: (f32, f32) },
}

/// Every operation the shell can ask the core to perform, one variant per
/// §4.2 command kind.
#[derive(Debug, Clone)]
pub enum Event {
    AddLayer { parent: Option<Uuid>, name: String, kind: NewLayerKind },
    RemoveLayer { target: Uuid },
    RenameLayer { target: Uuid, new_name: String },
    DuplicateLayer { source: Uuid },
    MoveLayerUp { target: Uuid },
    MoveLayerDown { target: Uuid },
    SetLayerOpacity { target: Uuid, new_opacity: f32 },
    SetLayerVisibility { target: Uuid, new_visible: bool },

    AddRow,
    AddColumn,
    RemoveRow,
    RemoveColumn,
    FixInvalidTiles,
    StampSequence { layer: Uuid, steps: Vec<(Position, Vec<StampCell>)> },
    EraserSequence { layer: Uuid, steps: Vec<Vec<Position>> },
    BucketFill { layer: Uuid, origin: Position, replacement: TileId },

    AddTileset { tileset: Tileset, name: String, embedded: bool },
    RemoveTileset { target: Uuid },
    RenameTileset { target: Uuid, new_name: String },

    AddProperty { context: Uuid, name: String, value: Attribute },
    RemoveProperty { context: Uuid, name: String },
    RenameProperty { context: Uuid, old_name: String, new_name: String },
    UpdateProperty { context: Uuid, name: String, new_value: Attribute },
    ChangePropertyType { context: Uuid, name: String, new_type: AttributeType },

    CreateComponentDefinition { name: String },
    RenameComponentDefinition { target: Uuid, new_name: String },
    RemoveComponentDefinition { target: Uuid, affected_contexts: Vec<Uuid> },
    DuplicateComponentDefinition { source: Uuid, new_name: String },
    CreateComponentAttribute { definition: Uuid, name: String, default: Attribute },
    RemoveComponentAttribute { definition: Uuid, name: String },
    RenameComponentAttribute { definition: Uuid, old_name: String, new_name: String },
    RetypeComponentAttribute { definition: Uuid, name: String, new_type: AttributeType },
    AttachComponent { context: Uuid, definition: Uuid },
    DetachComponent { context: Uuid, definition: Uuid },
    UpdateAttachedComponent { context: Uuid, definition: Uuid, attribute: String, new_value: Attribute },
    ResetAttachedComponent { context: Uuid, definition: Uuid },

    AddObject { layer: Uuid, object: NewObject },
    MoveObject { target: Uuid, new_position: (f32, f32) },
    RenameObject { target: Uuid, new_name: String },
    TagObject { target: Uuid, new_tag: String },
    ShowHideObject { target: Uuid, new_visible: bool },

    Undo,
    Redo,
}

/// Builds the boxed [`Command`] for every event except [`Event::Undo`]/
/// [`Event::Redo`], which move the stack cursor directly instead of pushing.
fn build_command(event: Event) -> Option<Box<dyn Command>> {
    Some(match event {
        Event::AddLayer { parent, name, kind } => Box::new(AddLayerCommand::new(parent, name, kind)) as Box<dyn Command>,
        Event::RemoveLayer { target } => Box::new(RemoveLayerCommand::new(target)),
        Event::RenameLayer { target, new_name } => Box::new(RenameLayerCommand::new(target, new_name)),
        Event::DuplicateLayer { source } => Box::new(DuplicateLayerCommand::new(source)),
        Event::MoveLayerUp { target } => Box::new(MoveLayerUpCommand::new(target)),
        Event::MoveLayerDown { target } => Box::new(MoveLayerDownCommand::new(target)),
        Event::SetLayerOpacity { target, new_opacity } => Box::new(SetLayerOpacityCommand::new(target, new_opacity)),
        Event::SetLayerVisibility { target, new_visible } => Box::new(SetLayerVisibilityCommand::new(target, new_visible)),

        Event::AddRow => Box::new(AddRowCommand::new()),
        Event::AddColumn => Box::new(AddColumnCommand::new()),
        Event::RemoveRow => Box::new(RemoveRowCommand::new()),
        Event::RemoveColumn => Box::new(RemoveColumnCommand::new()),
        Event::FixInvalidTiles => Box::new(FixInvalidTilesCommand::new()),
        Event::StampSequence { layer, steps } => Box::new(StampSequenceCommand::new(layer, steps)),
        Event::EraserSequence { layer, steps } => Box::new(EraserSequenceCommand::new(layer, steps)),
        Event::BucketFill { layer, origin, replacement } => Box::new(BucketFillCommand::new(layer, origin, replacement)),

        Event::AddTileset { tileset, name, embedded } => Box::new(AddTilesetCommand::new(tileset, name, embedded)),
        Event::RemoveTileset { target } => Box::new(RemoveTilesetCommand::new(target)),
        Event::RenameTileset { target, new_name } => Box::new(RenameTilesetCommand::new(target, new_name)),

        Event::AddProperty { context, name, value } => Box::new(AddPropertyCommand::new(context, name, value)),
        Event::RemoveProperty { context, name } => Box::new(RemovePropertyCommand::new(context, name)),
        Event::RenameProperty { context, old_name, new_name } => Box::new(RenamePropertyCommand::new(context, old_name, new_name)),
        Event::UpdateProperty { context, name, new_value } => Box::new(UpdatePropertyCommand::new(context, name, new_value)),
        Event::ChangePropertyType { context, name, new_type } => Box::new(ChangePropertyTypeCommand::new(context, name, new_type)),

        Event::CreateComponentDefinition { name } => Box::new(CreateComponentDefinitionCommand::new(name)),
        Event::RenameComponentDefinition { target, new_name } => Box::new(RenameComponentDefinitionCommand::new(target, new_name)),
        Event::RemoveComponentDefinition { target, affected_contexts } => Box::new(RemoveComponentDefinitionCommand::new(target, affected_contexts)),
        Event::DuplicateComponentDefinition { source, new_name } => Box::new(DuplicateComponentDefinitionCommand::new(source, new_name)),
        Event::CreateComponentAttribute { definition, name, default } => Box::new(CreateComponentAttributeCommand::new(definition, name, default)),
        Event::RemoveComponentAttribute { definition, name } => Box::new(RemoveComponentAttributeCommand::new(definition, name)),
        Event::RenameComponentAttribute { definition, old_name, new_name } => Box::new(RenameComponentAttributeCommand::new(definition, old_name, new_name)),
        Event::RetypeComponentAttribute { definition, name, new_type } => Box::new(RetypeComponentAttributeCommand::new(definition, name, new_type)),
        Event::AttachComponent { context, definition } => Box::new(AttachComponentCommand::new(context, definition)),
        Event::DetachComponent { context, definition } => Box::new(DetachComponentCommand::new(context, definition)),
        Event::UpdateAttachedComponent { context, definition, attribute, new_value } => Box::new(UpdateAttachedComponentCommand::new(context, definition, attribute, new_value)),
        Event::ResetAttachedComponent { context, definition } => Box::new(ResetAttachedComponentCommand::new(context, definition)),

        Event::AddObject { layer, object } => Box::new(match object {
            NewObject::Rect { position, size } => AddObjectCommand::rect(layer, position, size),
            NewObject::Ellipse { position, size } => AddObjectCommand::ellipse(layer, position, size),
            NewObject::Point { position } => AddObjectCommand::point(layer, position),
        }),
        Event::MoveObject { target, new_position } => Box::new(MoveObjectCommand::new(target, new_position)),
        Event::RenameObject { target, new_name } => Box::new(RenameObjectCommand::new(target, new_name)),
        Event::TagObject { target, new_tag } => Box::new(TagObjectCommand::new(target, new_tag)),
        Event::ShowHideObject { target, new_visible } => Box::new(ShowHideObjectCommand::new(target, new_visible)),

        Event::Undo | Event::Redo => return None,
    })
}

/// Runs `f` against `doc`'s command stack with the stack briefly swapped
/// out of the document, since every `CommandStack` method that mutates
/// history also needs `&mut Document` to replay a command against — and
/// `doc.command_stack.push(cmd, doc)` would borrow `doc` twice.
fn with_stack_detached(doc: &mut Document, f: impl FnOnce(&mut CommandStack, &mut Document)) {
    let mut stack = std::mem::replace(&mut doc.command_stack, CommandStack::new(0));
    f(&mut stack, doc);
    doc.command_stack = stack;
}

/// Applies one event to `doc`: builds and pushes its command, or moves the
/// undo/redo cursor directly.
pub fn dispatch(doc: &mut Document, event: Event) {
    match event {
        Event::Undo => with_stack_detached(doc, |stack, doc| stack.undo(doc)),
        Event::Redo => with_stack_detached(doc, |stack, doc| stack.redo(doc)),
        other => {
            if let Some(command) = build_command(other) {
                with_stack_detached(doc, |stack, doc| stack.push(command, doc));
            }
        }
    }
}

/// A FIFO queue of pending events, drained once per frame by
/// [`EventDispatcher::drain`] (§5: "the event dispatcher delivers events in
/// FIFO order; each event completes ... before the next begins").
#[derive(Debug, Default)]
pub struct EventDispatcher {
    queue: VecDeque<Event>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Posts an event, to be applied on the next [`Self::drain`].
    pub fn post(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Applies every queued event to `doc`, oldest first, leaving the queue
    /// empty. An event posted by the shell mid-drain (there is no such path
    /// today, since commands don't post events) would run on the *next*
    /// drain, not this one.
    pub fn drain(&mut self, doc: &mut Document) {
        while let Some(event) = self.queue.pop_front() {
            dispatch(doc, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentContent;
    use crate::map::{Map, TileFormat};

    fn map_document() -> Document {
        Document::new(DocumentContent::Map(Map::new((32, 32), 4, 4, TileFormat::default())), 100)
    }

    #[test]
    fn add_layer_event_creates_an_object_layer() {
        let mut doc = map_document();
        let mut dispatcher = EventDispatcher::new();
        dispatcher.post(Event::AddLayer { parent: None, name: "Actors".into(), kind: NewLayerKind::Object });
        dispatcher.drain(&mut doc);
        assert_eq!(doc.map().root.uuids().count(), 1);
    }

    #[test]
    fn events_apply_in_fifo_order() {
        let mut doc = map_document();
        let mut dispatcher = EventDispatcher::new();
        dispatcher.post(Event::AddLayer { parent: None, name: "First".into(), kind: NewLayerKind::Group });
        dispatcher.post(Event::AddLayer { parent: None, name: "Second".into(), kind: NewLayerKind::Group });
        dispatcher.drain(&mut doc);
        let names: Vec<_> = doc.map().root.preorder().into_iter().map(|uuid| doc.contexts.get(uuid).name.clone()).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn undo_event_reverts_the_last_pushed_command() {
        let mut doc = map_document();
        let mut dispatcher = EventDispatcher::new();
        dispatcher.post(Event::AddLayer { parent: None, name: "Temp".into(), kind: NewLayerKind::Group });
        dispatcher.drain(&mut doc);
        assert_eq!(doc.map().root.uuids().count(), 1);

        dispatcher.post(Event::Undo);
        dispatcher.drain(&mut doc);
        assert_eq!(doc.map().root.uuids().count(), 0);
    }
}

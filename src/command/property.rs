//! Property commands: add, remove, rename, update (mergeable), change type.

use std::any::Any;

use crate::attribute::{Attribute, AttributeType};
use crate::command::{Command, CommandKind};
use crate::document::Document;
use crate::id::Uuid;

#[derive(Debug)]
pub struct AddPropertyCommand {
    context: Uuid,
    name: String,
    value: Attribute,
}

impl AddPropertyCommand {
    pub fn new(context: Uuid, name: impl Into<String>, value: Attribute) -> Self {
        Self { context, name: name.into(), value }
    }
}

impl Command for AddPropertyCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::AddProperty
    }

    fn redo(&mut self, doc: &mut Document) {
        let added = doc.contexts.get_mut(self.context).add_property(self.name.clone(), self.value.clone());
        crate::assert_logic!(added, "property name already exists");
    }

    fn undo(&mut self, doc: &mut Document) {
        doc.contexts.get_mut(self.context).remove_property(&self.name);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct RemovePropertyCommand {
    context: Uuid,
    name: String,
    previous_value: Option<Attribute>,
}

impl RemovePropertyCommand {
    pub fn new(context: Uuid, name: impl Into<String>) -> Self {
        Self { context, name: name.into(), previous_value: None }
    }
}

impl Command for RemovePropertyCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RemoveProperty
    }

    fn redo(&mut self, doc: &mut Document) {
        self.previous_value = doc.contexts.get_mut(self.context).remove_property(&self.name);
    }

    fn undo(&mut self, doc: &mut Document) {
        let value = self.previous_value.take().expect("undo called before redo");
        doc.contexts.get_mut(self.context).add_property(self.name.clone(), value);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct RenamePropertyCommand {
    context: Uuid,
    old_name: String,
    new_name: String,
}

impl RenamePropertyCommand {
    pub fn new(context: Uuid, old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self { context, old_name: old_name.into(), new_name: new_name.into() }
    }
}

impl Command for RenamePropertyCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RenameProperty
    }

    fn redo(&mut self, doc: &mut Document) {
        let renamed = doc.contexts.get_mut(self.context).rename_property(&self.old_name, self.new_name.clone());
        crate::assert_logic!(renamed, "property rename failed: missing source or name collision");
    }

    fn undo(&mut self, doc: &mut Document) {
        doc.contexts.get_mut(self.context).rename_property(&self.new_name, self.old_name.clone());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Overwrites a property's value. Mergeable with a prior update of the same
/// property on the same context, per §4.2.
#[derive(Debug)]
pub struct UpdatePropertyCommand {
    context: Uuid,
    name: String,
    new_value: Attribute,
    previous_value: Option<Attribute>,
}

impl UpdatePropertyCommand {
    pub fn new(context: Uuid, name: impl Into<String>, new_value: Attribute) -> Self {
        Self { context, name: name.into(), new_value, previous_value: None }
    }
}

impl Command for UpdatePropertyCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::UpdateProperty
    }

    fn redo(&mut self, doc: &mut Document) {
        let previous = doc.contexts.get_mut(self.context).update_property(&self.name, self.new_value.clone());
        if self.previous_value.is_none() {
            self.previous_value = previous;
        }
    }

    fn undo(&mut self, doc: &mut Document) {
        let previous = self.previous_value.clone().expect("undo called before redo");
        doc.contexts.get_mut(self.context).update_property(&self.name, previous);
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        let Some(other) = other.as_any().downcast_ref::<UpdatePropertyCommand>() else { return false };
        if other.kind() != self.kind() || other.context != self.context || other.name != self.name {
            return false;
        }
        self.new_value = other.new_value.clone();
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Converts a property's value to a new type, resetting to that type's
/// default (per [`Attribute::default_for`]).
#[derive(Debug)]
pub struct ChangePropertyTypeCommand {
    context: Uuid,
    name: String,
    new_type: AttributeType,
    previous_value: Option<Attribute>,
}

impl ChangePropertyTypeCommand {
    pub fn new(context: Uuid, name: impl Into<String>, new_type: AttributeType) -> Self {
        Self { context, name: name.into(), new_type, previous_value: None }
    }
}

impl Command for ChangePropertyTypeCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::ChangePropertyType
    }

    fn redo(&mut self, doc: &mut Document) {
        let default = Attribute::default_for(self.new_type);
        let previous = doc.contexts.get_mut(self.context).update_property(&self.name, default);
        self.previous_value = previous;
    }

    fn undo(&mut self, doc: &mut Document) {
        let previous = self.previous_value.take().expect("undo called before redo");
        doc.contexts.get_mut(self.context).update_property(&self.name, previous);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::document::DocumentContent;
    use crate::map::{Map, TileFormat};

    fn test_doc() -> (Document, Uuid) {
        let mut doc = Document::new(DocumentContent::Map(Map::new((32, 32), 4, 4, TileFormat::default())), 100);
        let uuid = Uuid::new();
        doc.contexts.insert(uuid, Context::new("thing"));
        (doc, uuid)
    }

    #[test]
    fn add_then_undo_removes_property() {
        let (mut doc, ctx) = test_doc();
        let mut cmd = AddPropertyCommand::new(ctx, "hp", Attribute::Int(10));
        cmd.redo(&mut doc);
        assert_eq!(doc.contexts.get(ctx).get_property("hp"), Some(&Attribute::Int(10)));
        cmd.undo(&mut doc);
        assert_eq!(doc.contexts.get(ctx).get_property("hp"), None);
    }

    #[test]
    fn update_merges_and_undo_restores_original() {
        let (mut doc, ctx) = test_doc();
        doc.contexts.get_mut(ctx).add_property("hp", Attribute::Int(10));

        let mut first = UpdatePropertyCommand::new(ctx, "hp", Attribute::Int(20));
        first.redo(&mut doc);
        let mut second = UpdatePropertyCommand::new(ctx, "hp", Attribute::Int(30));
        second.redo(&mut doc);
        assert!(first.merge_with(&second));

        first.undo(&mut doc);
        assert_eq!(doc.contexts.get(ctx).get_property("hp"), Some(&Attribute::Int(10)));
    }

    #[test]
    fn change_type_resets_to_default_and_undo_restores_value() {
        let (mut doc, ctx) = test_doc();
        doc.contexts.get_mut(ctx).add_property("hp", Attribute::Int(10));

        let mut cmd = ChangePropertyTypeCommand::new(ctx, "hp", AttributeType::String);
        cmd.redo(&mut doc);
        assert_eq!(doc.contexts.get(ctx).get_property("hp"), Some(&Attribute::String(String::new())));

        cmd.undo(&mut doc);
        assert_eq!(doc.contexts.get(ctx).get_property("hp"), Some(&Attribute::Int(10)));
    }
}

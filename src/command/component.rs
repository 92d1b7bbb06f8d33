//! Component-definition and attached-component commands.

use std::any::Any;

use indexmap::IndexMap;

use crate::attribute::{Attribute, AttributeType};
use crate::command::{Command, CommandKind};
use crate::component::{AttachedComponent, ComponentDefinition};
use crate::document::Document;
use crate::id::Uuid;

#[derive(Debug)]
pub struct CreateComponentDefinitionCommand {
    definition: Option<ComponentDefinition>,
}

impl CreateComponentDefinitionCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self { definition: Some(ComponentDefinition::new(name)) }
    }
}

impl Command for CreateComponentDefinitionCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::CreateComponentDefinition
    }

    fn redo(&mut self, doc: &mut Document) {
        let definition = self.definition.take().expect("redo called twice without an intervening undo");
        let uuid = definition.uuid;
        doc.components.define(definition);
        self.definition = doc.components.get(uuid).cloned();
    }

    fn undo(&mut self, doc: &mut Document) {
        let uuid = self.definition.as_ref().expect("undo called before redo").uuid;
        self.definition = doc.components.remove(uuid);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct RenameComponentDefinitionCommand {
    target: Uuid,
    new_name: String,
    previous_name: Option<String>,
}

impl RenameComponentDefinitionCommand {
    pub fn new(target: Uuid, new_name: impl Into<String>) -> Self {
        Self { target, new_name: new_name.into(), previous_name: None }
    }
}

impl Command for RenameComponentDefinitionCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RenameComponentDefinition
    }

    fn redo(&mut self, doc: &mut Document) {
        let definition = doc.components.get_mut(self.target).expect("component definition missing");
        self.previous_name = Some(std::mem::replace(&mut definition.name, self.new_name.clone()));
    }

    fn undo(&mut self, doc: &mut Document) {
        let previous = self.previous_name.take().expect("undo called before redo");
        doc.components.get_mut(self.target).expect("component definition missing").name = previous;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Removes a component definition, detaching every instance of it from
/// every context that carried one. Per §3, the index holds no back-pointers
/// to contexts, so the command itself must be handed the affected contexts
/// up front by the dispatcher.
#[derive(Debug)]
pub struct RemoveComponentDefinitionCommand {
    target: Uuid,
    affected_contexts: Vec<Uuid>,
    definition: Option<ComponentDefinition>,
    detached: IndexMap<Uuid, AttachedComponent>,
}

impl RemoveComponentDefinitionCommand {
    pub fn new(target: Uuid, affected_contexts: Vec<Uuid>) -> Self {
        Self { target, affected_contexts, definition: None, detached: IndexMap::new() }
    }
}

impl Command for RemoveComponentDefinitionCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RemoveComponentDefinition
    }

    fn redo(&mut self, doc: &mut Document) {
        self.detached.clear();
        for &context in &self.affected_contexts {
            if let Some(instance) = doc.contexts.get_mut(context).detach_component(self.target) {
                self.detached.insert(context, instance);
            }
        }
        self.definition = doc.components.remove(self.target);
    }

    fn undo(&mut self, doc: &mut Document) {
        let definition = self.definition.take().expect("undo called before redo");
        doc.components.define(definition);
        for (context, instance) in self.detached.drain(..) {
            doc.contexts.get_mut(context).attach_component(instance);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Deep-copies a component definition under a new uuid and name.
#[derive(Debug)]
pub struct DuplicateComponentDefinitionCommand {
    source: Uuid,
    new_name: String,
    copy: Option<ComponentDefinition>,
}

impl DuplicateComponentDefinitionCommand {
    pub fn new(source: Uuid, new_name: impl Into<String>) -> Self {
        Self { source, new_name: new_name.into(), copy: None }
    }
}

impl Command for DuplicateComponentDefinitionCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::DuplicateComponentDefinition
    }

    fn redo(&mut self, doc: &mut Document) {
        let source = doc.components.get(self.source).expect("source component definition missing");
        let mut copy = ComponentDefinition::new(self.new_name.clone());
        copy.attributes = source.attributes.clone();
        let uuid = copy.uuid;
        doc.components.define(copy);
        self.copy = doc.components.get(uuid).cloned();
    }

    fn undo(&mut self, doc: &mut Document) {
        let uuid = self.copy.as_ref().expect("undo called before redo").uuid;
        doc.components.remove(uuid);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct CreateComponentAttributeCommand {
    definition: Uuid,
    name: String,
    default: Attribute,
}

impl CreateComponentAttributeCommand {
    pub fn new(definition: Uuid, name: impl Into<String>, default: Attribute) -> Self {
        Self { definition, name: name.into(), default }
    }
}

impl Command for CreateComponentAttributeCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::CreateComponentAttribute
    }

    fn redo(&mut self, doc: &mut Document) {
        let definition = doc.components.get_mut(self.definition).expect("component definition missing");
        definition.attributes.insert(self.name.clone(), self.default.clone());
    }

    fn undo(&mut self, doc: &mut Document) {
        let definition = doc.components.get_mut(self.definition).expect("component definition missing");
        definition.attributes.shift_remove(&self.name);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct RemoveComponentAttributeCommand {
    definition: Uuid,
    name: String,
    previous_default: Option<Attribute>,
    previous_index: Option<usize>,
}

impl RemoveComponentAttributeCommand {
    pub fn new(definition: Uuid, name: impl Into<String>) -> Self {
        Self { definition, name: name.into(), previous_default: None, previous_index: None }
    }
}

impl Command for RemoveComponentAttributeCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RemoveComponentAttribute
    }

    fn redo(&mut self, doc: &mut Document) {
        let definition = doc.components.get_mut(self.definition).expect("component definition missing");
        self.previous_index = definition.attributes.get_index_of(&self.name);
        self.previous_default = definition.attributes.shift_remove(&self.name);
    }

    fn undo(&mut self, doc: &mut Document) {
        let default = self.previous_default.take().expect("undo called before redo");
        let index = self.previous_index.take().expect("undo called before redo");
        let definition = doc.components.get_mut(self.definition).expect("component definition missing");
        definition.attributes.shift_insert(index, self.name.clone(), default);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct RenameComponentAttributeCommand {
    definition: Uuid,
    old_name: String,
    new_name: String,
}

impl RenameComponentAttributeCommand {
    pub fn new(definition: Uuid, old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self { definition, old_name: old_name.into(), new_name: new_name.into() }
    }
}

impl Command for RenameComponentAttributeCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RenameComponentAttribute
    }

    fn redo(&mut self, doc: &mut Document) {
        rename_in_place(doc.components.get_mut(self.definition).expect("component definition missing").attributes_mut(), &self.old_name, &self.new_name);
    }

    fn undo(&mut self, doc: &mut Document) {
        rename_in_place(doc.components.get_mut(self.definition).expect("component definition missing").attributes_mut(), &self.new_name, &self.old_name);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn rename_in_place(attributes: &mut IndexMap<String, Attribute>, old: &str, new: &str) {
    let mut rebuilt = IndexMap::with_capacity(attributes.len());
    for (key, value) in attributes.drain(..) {
        if key == old {
            rebuilt.insert(new.to_string(), value);
        } else {
            rebuilt.insert(key, value);
        }
    }
    *attributes = rebuilt;
}

#[derive(Debug)]
pub struct RetypeComponentAttributeCommand {
    definition: Uuid,
    name: String,
    new_type: AttributeType,
    previous_default: Option<Attribute>,
}

impl RetypeComponentAttributeCommand {
    pub fn new(definition: Uuid, name: impl Into<String>, new_type: AttributeType) -> Self {
        Self { definition, name: name.into(), new_type, previous_default: None }
    }
}

impl Command for RetypeComponentAttributeCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RetypeComponentAttribute
    }

    fn redo(&mut self, doc: &mut Document) {
        let definition = doc.components.get_mut(self.definition).expect("component definition missing");
        let default = Attribute::default_for(self.new_type);
        self.previous_default = definition.attributes.insert(self.name.clone(), default);
    }

    fn undo(&mut self, doc: &mut Document) {
        let previous = self.previous_default.take().expect("undo called before redo");
        doc.components.get_mut(self.definition).expect("component definition missing").attributes.insert(self.name.clone(), previous);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct AttachComponentCommand {
    context: Uuid,
    definition: Uuid,
}

impl AttachComponentCommand {
    pub fn new(context: Uuid, definition: Uuid) -> Self {
        Self { context, definition }
    }
}

impl Command for AttachComponentCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::AttachComponent
    }

    fn redo(&mut self, doc: &mut Document) {
        let definition = doc.components.get(self.definition).expect("component definition missing").clone();
        let attached = doc.contexts.get_mut(self.context).attach_component(AttachedComponent::from_definition(&definition));
        crate::assert_logic!(attached, "component already attached to this context");
    }

    fn undo(&mut self, doc: &mut Document) {
        doc.contexts.get_mut(self.context).detach_component(self.definition);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct DetachComponentCommand {
    context: Uuid,
    definition: Uuid,
    previous: Option<AttachedComponent>,
}

impl DetachComponentCommand {
    pub fn new(context: Uuid, definition: Uuid) -> Self {
        Self { context, definition, previous: None }
    }
}

impl Command for DetachComponentCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::DetachComponent
    }

    fn redo(&mut self, doc: &mut Document) {
        self.previous = doc.contexts.get_mut(self.context).detach_component(self.definition);
    }

    fn undo(&mut self, doc: &mut Document) {
        let previous = self.previous.take().expect("undo called before redo");
        doc.contexts.get_mut(self.context).attach_component(previous);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Overwrites one attribute value on an attached component instance.
/// Mergeable with a prior update of the same attribute on the same
/// instance, mirroring [`crate::command::property::UpdatePropertyCommand`].
#[derive(Debug)]
pub struct UpdateAttachedComponentCommand {
    context: Uuid,
    definition: Uuid,
    attribute: String,
    new_value: Attribute,
    previous_value: Option<Attribute>,
}

impl UpdateAttachedComponentCommand {
    pub fn new(context: Uuid, definition: Uuid, attribute: impl Into<String>, new_value: Attribute) -> Self {
        Self { context, definition, attribute: attribute.into(), new_value, previous_value: None }
    }
}

impl Command for UpdateAttachedComponentCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::UpdateAttachedComponent
    }

    fn redo(&mut self, doc: &mut Document) {
        let instance = doc.contexts.get_mut(self.context).get_component_mut(self.definition).expect("component not attached");
        let previous = instance.values.insert(self.attribute.clone(), self.new_value.clone());
        if self.previous_value.is_none() {
            self.previous_value = previous;
        }
    }

    fn undo(&mut self, doc: &mut Document) {
        let previous = self.previous_value.clone().expect("undo called before redo");
        let instance = doc.contexts.get_mut(self.context).get_component_mut(self.definition).expect("component not attached");
        instance.values.insert(self.attribute.clone(), previous);
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        let Some(other) = other.as_any().downcast_ref::<UpdateAttachedComponentCommand>() else { return false };
        if other.kind() != self.kind() || other.context != self.context || other.definition != self.definition || other.attribute != self.attribute {
            return false;
        }
        self.new_value = other.new_value.clone();
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Resets every attached value back to the definition's current defaults.
#[derive(Debug)]
pub struct ResetAttachedComponentCommand {
    context: Uuid,
    definition: Uuid,
    previous_values: Option<IndexMap<String, Attribute>>,
}

impl ResetAttachedComponentCommand {
    pub fn new(context: Uuid, definition: Uuid) -> Self {
        Self { context, definition, previous_values: None }
    }
}

impl Command for ResetAttachedComponentCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::ResetAttachedComponent
    }

    fn redo(&mut self, doc: &mut Document) {
        let definition = doc.components.get(self.definition).expect("component definition missing").clone();
        let instance = doc.contexts.get_mut(self.context).get_component_mut(self.definition).expect("component not attached");
        self.previous_values = Some(instance.values.clone());
        instance.reset_to_defaults(&definition);
    }

    fn undo(&mut self, doc: &mut Document) {
        let previous = self.previous_values.take().expect("undo called before redo");
        let instance = doc.contexts.get_mut(self.context).get_component_mut(self.definition).expect("component not attached");
        instance.values = previous;
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
        let context = Uuid::new();
        doc.contexts.insert(context, Context::new("thing"));
        (doc, context)
    }

    #[test]
    fn create_then_undo_removes_definition() {
        let (mut doc, _) = test_doc();
        let mut cmd = CreateComponentDefinitionCommand::new("Health");
        cmd.redo(&mut doc);
        assert_eq!(doc.components.len(), 1);
        cmd.undo(&mut doc);
        assert_eq!(doc.components.len(), 0);
    }

    #[test]
    fn attach_update_detach_round_trip() {
        let (mut doc, context) = test_doc();
        let mut create = CreateComponentDefinitionCommand::new("Health");
        create.redo(&mut doc);
        let definition = doc.definition_uuid();

        let mut attach = AttachComponentCommand::new(context, definition);
        attach.redo(&mut doc);
        assert!(doc.contexts.get(context).has_component(definition));

        let mut update = UpdateAttachedComponentCommand::new(context, definition, "hp", Attribute::Int(5));
        update.redo(&mut doc);
        assert_eq!(doc.contexts.get(context).get_component(definition).unwrap().values["hp"], Attribute::Int(5));
        update.undo(&mut doc);
        assert!(!doc.contexts.get(context).get_component(definition).unwrap().values.contains_key("hp"));

        attach.undo(&mut doc);
        assert!(!doc.contexts.get(context).has_component(definition));
    }

    #[test]
    fn remove_definition_detaches_from_every_affected_context_and_undo_restores() {
        let (mut doc, context) = test_doc();
        let mut create = CreateComponentDefinitionCommand::new("Health");
        create.redo(&mut doc);
        let definition = doc.definition_uuid();
        let mut attach = AttachComponentCommand::new(context, definition);
        attach.redo(&mut doc);

        let mut remove = RemoveComponentDefinitionCommand::new(definition, vec![context]);
        remove.redo(&mut doc);
        assert_eq!(doc.components.len(), 0);
        assert!(!doc.contexts.get(context).has_component(definition));

        remove.undo(&mut doc);
        assert_eq!(doc.components.len(), 1);
        assert!(doc.contexts.get(context).has_component(definition));
    }

    impl Document {
        fn definition_uuid(&self) -> Uuid {
            self.components.iter().next().unwrap().uuid
        }
    }
}

//! User-defined component schemas and the attached instances contexts carry.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::attribute::Attribute;
use crate::id::Uuid;

/// A user-defined schema of named, typed attributes that can be attached to
/// any [`crate::context::Context`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDefinition {
    pub uuid: Uuid,
    pub name: String,
    /// Ordered mapping from attribute name to its default value.
    pub attributes: IndexMap<String, Attribute>,
}

impl ComponentDefinition {
    /// Creates an empty component definition with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { uuid: Uuid::new(), name: name.into(), attributes: IndexMap::new() }
    }

    pub fn attributes_mut(&mut self) -> &mut IndexMap<String, Attribute> {
        &mut self.attributes
    }
}

/// An instance of a [`ComponentDefinition`] attached to a context, storing
/// only the values that differ from (or simply overlay) the definition's
/// current defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachedComponent {
    pub definition: Uuid,
    /// Ordered mapping from attribute name to the attached value.
    pub values: IndexMap<String, Attribute>,
}

impl AttachedComponent {
    /// Attaches a fresh instance of `definition`, copying its current
    /// defaults as the starting values.
    pub fn from_definition(definition: &ComponentDefinition) -> Self {
        Self { definition: definition.uuid, values: definition.attributes.clone() }
    }

    /// Resets every attached value back to the definition's current default,
    /// for attributes the definition still declares. Attributes the
    /// definition no longer has are dropped; new attributes the definition
    /// gained are added with their default.
    pub fn reset_to_defaults(&mut self, definition: &ComponentDefinition) {
        self.values = definition.attributes.clone();
    }
}

/// A registry of [`ComponentDefinition`]s, keyed by their stable uuid.
///
/// Owned by a [`crate::document::Document`]; at most one component index
/// exists per document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentIndex {
    definitions: IndexMap<Uuid, ComponentDefinition>,
}

impl ComponentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new component definition, returning its uuid.
    pub fn define(&mut self, definition: ComponentDefinition) -> Uuid {
        let uuid = definition.uuid;
        self.definitions.insert(uuid, definition);
        uuid
    }

    /// Removes a component definition. Callers are responsible for detaching
    /// any attached instances from contexts first (see the component
    /// commands), since the index itself holds no back-references to
    /// contexts.
    pub fn remove(&mut self, uuid: Uuid) -> Option<ComponentDefinition> {
        self.definitions.shift_remove(&uuid)
    }

    pub fn get(&self, uuid: Uuid) -> Option<&ComponentDefinition> {
        self.definitions.get(&uuid)
    }

    pub fn get_mut(&mut self, uuid: Uuid) -> Option<&mut ComponentDefinition> {
        self.definitions.get_mut(&uuid)
    }

    pub fn contains(&self, uuid: Uuid) -> bool {
        self.definitions.contains_key(&uuid)
    }

    /// Finds a definition by name, the way the dispatcher resolves a
    /// user-typed name to a uuid before pushing a "create component" command.
    pub fn find_by_name(&self, name: &str) -> Option<&ComponentDefinition> {
        self.definitions.values().find(|def| def.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_then_reset_restores_current_defaults() {
        let mut def = ComponentDefinition::new("Health");
        def.attributes.insert("hp".to_string(), Attribute::Int(100));

        let mut attached = AttachedComponent::from_definition(&def);
        attached.values.insert("hp".to_string(), Attribute::Int(42));
        assert_eq!(attached.values["hp"], Attribute::Int(42));

        attached.reset_to_defaults(&def);
        assert_eq!(attached.values["hp"], Attribute::Int(100));
    }

    #[test]
    fn index_find_by_name_and_remove() {
        let mut index = ComponentIndex::new();
        let uuid = index.define(ComponentDefinition::new("Health"));
        assert!(index.find_by_name("Health").is_some());
        assert!(index.remove(uuid).is_some());
        assert!(index.find_by_name("Health").is_none());
    }
}

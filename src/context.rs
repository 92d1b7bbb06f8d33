//! [`Context`]: the name + properties + attached-components bundle carried
//! by every nameable entity (map, layer, object, tileset, tile).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::attribute::Attribute;
use crate::component::AttachedComponent;
use crate::id::Uuid;

/// The name, ordered properties, and attached components of a single
/// nameable entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub name: String,
    /// Ordered mapping from property name to value. Names are unique within
    /// a context; insertion order is preserved across add/remove/rename.
    properties: IndexMap<String, Attribute>,
    /// Mapping from component-definition uuid to the attached instance. At
    /// most one attached instance per definition.
    components: IndexMap<Uuid, AttachedComponent>,
}

impl Context {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), properties: IndexMap::new(), components: IndexMap::new() }
    }

    pub fn properties(&self) -> &IndexMap<String, Attribute> {
        &self.properties
    }

    pub fn get_property(&self, name: &str) -> Option<&Attribute> {
        self.properties.get(name)
    }

    /// Adds a new property. Returns `false` without modifying anything if a
    /// property with this name already exists.
    pub fn add_property(&mut self, name: impl Into<String>, value: Attribute) -> bool {
        let name = name.into();
        if self.properties.contains_key(&name) {
            return false;
        }
        self.properties.insert(name, value);
        true
    }

    /// Removes a property, returning its prior value.
    pub fn remove_property(&mut self, name: &str) -> Option<Attribute> {
        self.properties.shift_remove(name)
    }

    /// Renames a property in place, preserving its insertion-order position
    /// and value. Returns `false` (no-op) if `old` doesn't exist or `new`
    /// already does.
    pub fn rename_property(&mut self, old: &str, new: impl Into<String>) -> bool {
        let new = new.into();
        if !self.properties.contains_key(old) || self.properties.contains_key(&new) {
            return false;
        }
        // IndexMap has no in-place key rename, so rebuild preserving order.
        let mut rebuilt = IndexMap::with_capacity(self.properties.len());
        for (key, value) in self.properties.drain(..) {
            if key == old {
                rebuilt.insert(new.clone(), value);
            } else {
                rebuilt.insert(key, value);
            }
        }
        self.properties = rebuilt;
        true
    }

    /// Overwrites a property's value in place. Returns the previous value.
    pub fn update_property(&mut self, name: &str, value: Attribute) -> Option<Attribute> {
        self.properties.insert(name.to_string(), value)
    }

    pub fn components(&self) -> &IndexMap<Uuid, AttachedComponent> {
        &self.components
    }

    pub fn has_component(&self, definition: Uuid) -> bool {
        self.components.contains_key(&definition)
    }

    /// Attaches a component instance. Returns `false` (no-op) if one for the
    /// same definition is already attached, since §3 allows at most one
    /// attached instance per definition per context.
    pub fn attach_component(&mut self, instance: AttachedComponent) -> bool {
        if self.components.contains_key(&instance.definition) {
            return false;
        }
        self.components.insert(instance.definition, instance);
        true
    }

    pub fn detach_component(&mut self, definition: Uuid) -> Option<AttachedComponent> {
        self.components.shift_remove(&definition)
    }

    pub fn get_component(&self, definition: Uuid) -> Option<&AttachedComponent> {
        self.components.get(&definition)
    }

    pub fn get_component_mut(&mut self, definition: Uuid) -> Option<&mut AttachedComponent> {
        self.components.get_mut(&definition)
    }
}

/// Storage for every context in a document, keyed by the owning entity's
/// uuid. Stands in for the generic "registry" of §4.1: rather than a sparse
/// component set indexed by arbitrary type, a document's contexts all live
/// in one flat, strongly-typed map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextStore {
    contexts: IndexMap<Uuid, Context>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context for a freshly-allocated entity and returns its
    /// uuid.
    pub fn create(&mut self, name: impl Into<String>) -> Uuid {
        let uuid = Uuid::new();
        self.contexts.insert(uuid, Context::new(name));
        uuid
    }

    /// Inserts a context under an explicit uuid, for entities (layers,
    /// objects, tilesets) that allocate their own identity and only
    /// register the context afterwards.
    pub fn insert(&mut self, uuid: Uuid, context: Context) {
        self.contexts.insert(uuid, context);
    }

    /// Removes a context entirely. Used when an entity is permanently
    /// destroyed (storage released after eviction from the undo stack).
    pub fn destroy(&mut self, uuid: Uuid) -> Option<Context> {
        self.contexts.shift_remove(&uuid)
    }

    pub fn try_get(&self, uuid: Uuid) -> Option<&Context> {
        self.contexts.get(&uuid)
    }

    pub fn try_get_mut(&mut self, uuid: Uuid) -> Option<&mut Context> {
        self.contexts.get_mut(&uuid)
    }

    /// Fetches a context, panicking (in debug builds) if `uuid` is unknown.
    /// Mirrors the generic registry's fatal `get<T>` contract from §4.1.
    pub fn get(&self, uuid: Uuid) -> &Context {
        match self.contexts.get(&uuid) {
            Some(ctx) => ctx,
            None => {
                crate::assert_logic!(false, "unknown context id");
                unreachable!("unknown context id {uuid}")
            }
        }
    }

    pub fn get_mut(&mut self, uuid: Uuid) -> &mut Context {
        if !self.contexts.contains_key(&uuid) {
            crate::assert_logic!(false, "unknown context id");
        }
        self.contexts.get_mut(&uuid).expect("unknown context id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_insertion_order_is_preserved() {
        let mut ctx = Context::new("layer");
        ctx.add_property("a", Attribute::Int(1));
        ctx.add_property("b", Attribute::Int(2));
        ctx.add_property("c", Attribute::Int(3));
        let names: Vec<_> = ctx.properties().keys().cloned().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn rename_property_preserves_position() {
        let mut ctx = Context::new("layer");
        ctx.add_property("a", Attribute::Int(1));
        ctx.add_property("b", Attribute::Int(2));
        ctx.rename_property("a", "renamed");
        let names: Vec<_> = ctx.properties().keys().cloned().collect();
        assert_eq!(names, vec!["renamed", "b"]);
    }

    #[test]
    fn duplicate_property_name_rejected() {
        let mut ctx = Context::new("layer");
        assert!(ctx.add_property("a", Attribute::Int(1)));
        assert!(!ctx.add_property("a", Attribute::Int(2)));
    }

    #[test]
    fn at_most_one_component_instance_per_definition() {
        use crate::component::ComponentDefinition;
        let def = ComponentDefinition::new("Health");
        let mut ctx = Context::new("obj");
        assert!(ctx.attach_component(AttachedComponent::from_definition(&def)));
        assert!(!ctx.attach_component(AttachedComponent::from_definition(&def)));
    }
}

//! The layer tree: the root virtual group layer and the operations defined
//! on it (add/remove/reorder/duplicate).
//!
//! Per the design notes, parent links are never embedded as back-pointers
//! inside layers. Instead, [`LayerTree`] derives parentage from a side
//! table (`parent: HashMap<Uuid, Option<Uuid>>`, `None` meaning "parented at
//! the virtual root") alongside each [`GroupLayer`]'s own child list.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::context::{Context, ContextStore};
use crate::id::{LayerId, Uuid};
use crate::layer::{clone_context, clone_layer_with_identity, GroupLayer, Layer, LayerKind, TileLayer};

/// A layer detached from the tree by [`LayerTree::remove`], along with
/// enough information to restore it to its exact former position.
///
/// Holds the entire detached subtree (the removed layer and every
/// descendant), matching §3's "removal does not free the entity
/// immediately — it is moved into the undo snapshot of the removing
/// command" — the command itself owns this value until it is evicted from
/// the stack.
#[derive(Debug, Clone, PartialEq)]
pub struct DetachedSubtree {
    pub root_uuid: Uuid,
    layers: IndexMap<Uuid, Layer>,
    pub parent: Option<Uuid>,
    pub index: usize,
}

impl DetachedSubtree {
    /// All uuids in the detached subtree, root first then descendants in
    /// preorder.
    pub fn uuids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.layers.keys().copied()
    }
}

/// The layer hierarchy of a map: a virtual root group plus the ordinary
/// layers nested beneath it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerTree {
    layers: IndexMap<Uuid, Layer>,
    root_children: Vec<Uuid>,
    parent: HashMap<Uuid, Option<Uuid>>,
}

impl LayerTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, uuid: Uuid) -> Option<&Layer> {
        self.layers.get(&uuid)
    }

    pub fn get_mut(&mut self, uuid: Uuid) -> Option<&mut Layer> {
        self.layers.get_mut(&uuid)
    }

    pub fn contains(&self, uuid: Uuid) -> bool {
        self.layers.contains_key(&uuid)
    }

    /// The top-level layer list, in order.
    pub fn root_children(&self) -> &[Uuid] {
        &self.root_children
    }

    fn children_of(&self, parent: Option<Uuid>) -> &[Uuid] {
        match parent {
            None => &self.root_children,
            Some(p) => self.layers.get(&p).and_then(|l| l.kind.as_group()).map(|g| g.children()).unwrap_or(&[]),
        }
    }

    fn children_of_mut(&mut self, parent: Option<Uuid>) -> &mut Vec<Uuid> {
        match parent {
            None => &mut self.root_children,
            Some(p) => {
                // Safe: callers only pass parents known to exist and be groups.
                match &mut self.layers.get_mut(&p).expect("unknown parent layer").kind {
                    LayerKind::Group(g) => g.children_mut(),
                    _ => panic!("parent layer is not a group"),
                }
            }
        }
    }

    /// Adds `layer` as the last child of `parent` (`None` for the virtual
    /// root).
    pub fn add(&mut self, parent: Option<Uuid>, layer: Layer) -> Uuid {
        let uuid = layer.uuid;
        self.layers.insert(uuid, layer);
        self.parent.insert(uuid, parent);
        self.children_of_mut(parent).push(uuid);
        uuid
    }

    fn insert_at(&mut self, parent: Option<Uuid>, index: usize, uuid: Uuid) {
        self.children_of_mut(parent).insert(index, uuid);
        self.parent.insert(uuid, parent);
    }

    /// Removes `uuid` and its entire descendant subtree from the tree,
    /// returning a [`DetachedSubtree`] that can later be handed back to
    /// [`Self::reattach`] to undo the removal exactly.
    pub fn remove(&mut self, uuid: Uuid) -> Option<DetachedSubtree> {
        if !self.layers.contains_key(&uuid) {
            return None;
        }
        let parent = *self.parent.get(&uuid)?;
        let index = self.children_of(parent).iter().position(|&c| c == uuid)?;
        self.children_of_mut(parent).remove(index);

        let mut subtree_uuids = Vec::new();
        let mut queue = vec![uuid];
        while let Some(u) = queue.pop() {
            subtree_uuids.push(u);
            if let Some(group) = self.layers.get(&u).and_then(|l| l.kind.as_group()) {
                queue.extend(group.children().iter().copied());
            }
        }

        let mut layers = IndexMap::new();
        for u in &subtree_uuids {
            self.parent.remove(u);
            if let Some(layer) = self.layers.shift_remove(u) {
                layers.insert(*u, layer);
            }
        }

        Some(DetachedSubtree { root_uuid: uuid, layers, parent, index })
    }

    /// Restores a subtree previously returned by [`Self::remove`] to its
    /// exact former position.
    pub fn reattach(&mut self, subtree: DetachedSubtree) {
        let DetachedSubtree { root_uuid, layers, parent, index } = subtree;
        for (uuid, layer) in layers {
            self.layers.insert(uuid, layer);
        }
        self.insert_at(parent, index, root_uuid);
        self.reindex_parents(root_uuid, parent);
    }

    /// Recomputes the `parent` table for `uuid` and its descendants,
    /// walking each group layer's own child list.
    fn reindex_parents(&mut self, uuid: Uuid, parent: Option<Uuid>) {
        self.parent.insert(uuid, parent);
        if let Some(group) = self.layers.get(&uuid).and_then(|l| l.kind.as_group()) {
            let children: Vec<Uuid> = group.children().to_vec();
            for child in children {
                self.reindex_parents(child, Some(uuid));
            }
        }
    }

    /// All tile layers in the tree, with their owning uuid, in no
    /// particular order — used by map-wide operations (resize, fix-invalid)
    /// that must touch every tile matrix regardless of tree position.
    pub fn tile_layers_mut(&mut self) -> impl Iterator<Item = (Uuid, &mut TileLayer)> {
        self.layers.iter_mut().filter_map(|(&uuid, layer)| layer.kind.as_tile_mut().map(|t| (uuid, t)))
    }

    pub fn parent_of(&self, uuid: Uuid) -> Option<Option<Uuid>> {
        self.parent.get(&uuid).copied()
    }

    /// Position among immediate siblings.
    pub fn local_index(&self, uuid: Uuid) -> Option<usize> {
        let parent = self.parent_of(uuid)?;
        self.children_of(parent).iter().position(|&c| c == uuid)
    }

    /// The highest valid local index among `uuid`'s siblings: `sibling
    /// count - 1`. A layer `can_move_down` exactly when its local index is
    /// less than this value.
    pub fn sibling_count(&self, uuid: Uuid) -> Option<usize> {
        let parent = self.parent_of(uuid)?;
        Some(self.children_of(parent).len() - 1)
    }

    pub fn can_move_up(&self, uuid: Uuid) -> bool {
        self.local_index(uuid).map(|i| i > 0).unwrap_or(false)
    }

    pub fn can_move_down(&self, uuid: Uuid) -> bool {
        match (self.local_index(uuid), self.sibling_count(uuid)) {
            (Some(i), Some(count)) => i < count,
            _ => false,
        }
    }

    /// Swaps `uuid` with its immediate sibling above. Panics (debug-only
    /// assertion) if `uuid` is already the first child — the dispatcher is
    /// required to check [`Self::can_move_up`] first.
    pub fn move_up(&mut self, uuid: Uuid) {
        crate::assert_logic!(self.can_move_up(uuid), "cannot move first child up");
        let parent = self.parent_of(uuid).flatten();
        if let Some(index) = self.local_index(uuid) {
            if index > 0 {
                self.children_of_mut(parent).swap(index - 1, index);
            }
        }
    }

    /// Swaps `uuid` with its immediate sibling below. Panics (debug-only
    /// assertion) if `uuid` is already the last child.
    pub fn move_down(&mut self, uuid: Uuid) {
        crate::assert_logic!(self.can_move_down(uuid), "cannot move last child down");
        let parent = self.parent_of(uuid).flatten();
        if let (Some(index), Some(count)) = (self.local_index(uuid), self.sibling_count(uuid)) {
            if index < count {
                self.children_of_mut(parent).swap(index, index + 1);
            }
        }
    }

    /// Moves `uuid` to `new_index` among its siblings via repeated
    /// single-step moves, per §4.4.
    pub fn set_local_index(&mut self, uuid: Uuid, new_index: usize) {
        loop {
            let Some(current) = self.local_index(uuid) else { return };
            if current == new_index {
                return;
            }
            if current < new_index {
                self.move_down(uuid);
            } else {
                self.move_up(uuid);
            }
        }
    }

    /// The pre-order visit number of `uuid` within the whole tree: the
    /// root's children first, descending into each group before continuing
    /// to the next sibling.
    pub fn global_index(&self, uuid: Uuid) -> Option<usize> {
        let mut counter = 0;
        self.preorder_find(&self.root_children, uuid, &mut counter)
    }

    fn preorder_find(&self, siblings: &[Uuid], target: Uuid, counter: &mut usize) -> Option<usize> {
        for &child in siblings {
            if child == target {
                return Some(*counter);
            }
            *counter += 1;
            if let Some(group) = self.layers.get(&child).and_then(|l| l.kind.as_group()) {
                if let Some(found) = self.preorder_find(group.children(), target, counter) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// All layer uuids in pre-order.
    pub fn preorder(&self) -> Vec<Uuid> {
        let mut out = Vec::with_capacity(self.layers.len());
        self.collect_preorder(&self.root_children, &mut out);
        out
    }

    fn collect_preorder(&self, siblings: &[Uuid], out: &mut Vec<Uuid>) {
        for &child in siblings {
            out.push(child);
            if let Some(group) = self.layers.get(&child).and_then(|l| l.kind.as_group()) {
                self.collect_preorder(group.children(), out);
            }
        }
    }

    /// Whether `candidate` is `ancestor` itself or a descendant of it.
    pub fn is_same_or_descendant(&self, ancestor: Uuid, candidate: Uuid) -> bool {
        let mut cursor = Some(candidate);
        while let Some(u) = cursor {
            if u == ancestor {
                return true;
            }
            cursor = self.parent_of(u).flatten();
        }
        false
    }

    /// Deep-copies `source` and its subtree with fresh uuids and fresh
    /// sequential [`LayerId`]s, inserting the copy immediately after
    /// `source` among its siblings. `next_id` is called once per layer in
    /// the subtree, mirroring the map's monotonically increasing
    /// `next_layer_id` counter. Only the top-level copy's context gets
    /// " (Copy)" appended to its name; descendants keep their names,
    /// per §4.4.
    pub fn duplicate(
        &mut self,
        source: Uuid,
        contexts: &mut ContextStore,
        mut next_id: impl FnMut() -> LayerId,
    ) -> Option<Uuid> {
        let parent = self.parent_of(source)?;
        let index = self.local_index(source)?;
        let new_root = self.deep_clone(source, contexts, &mut next_id, true)?;
        self.insert_at(parent, index + 1, new_root);
        self.reindex_parents(new_root, parent);
        Some(new_root)
    }

    /// Recursively clones `source`'s subtree into fresh entries in
    /// `self.layers` (without yet linking them into any parent's child
    /// list) and the matching contexts into `contexts`. Returns the new
    /// root uuid.
    fn deep_clone(
        &mut self,
        source: Uuid,
        contexts: &mut ContextStore,
        next_id: &mut impl FnMut() -> LayerId,
        is_top_level: bool,
    ) -> Option<Uuid> {
        let source_layer = self.layers.get(&source)?.clone();
        let new_uuid = Uuid::new();
        let new_id = next_id();

        let mut new_layer = clone_layer_with_identity(&source_layer, new_uuid, new_id);

        if let LayerKind::Group(group) = &source_layer.kind {
            let mut new_group = GroupLayer::new();
            for &child in group.children() {
                let new_child = self.deep_clone(child, contexts, next_id, false)?;
                new_group.push(new_child);
                self.parent.insert(new_child, Some(new_uuid));
            }
            new_layer.kind = LayerKind::Group(new_group);
        }

        let mut new_context = clone_context(contexts.get(source));
        if is_top_level {
            new_context.name.push_str(" (Copy)");
        }
        contexts.insert(new_uuid, new_context);

        self.layers.insert(new_uuid, new_layer);
        Some(new_uuid)
    }

    /// Returns the uuid (if any) that should become the new active layer
    /// when `removed` (and its subtree) is taken out of the tree: per
    /// §4.4, the active layer resets to `None` if it was removed or is a
    /// descendant of a removed group.
    pub fn active_after_removal(&self, removed: Uuid, active: Option<Uuid>) -> Option<Uuid> {
        let active = active?;
        if active == removed || self.was_descendant_before_removal(removed, active) {
            None
        } else {
            Some(active)
        }
    }

    fn was_descendant_before_removal(&self, removed: Uuid, candidate: Uuid) -> bool {
        // Called before `remove` detaches the subtree, so parent links are
        // still intact.
        self.is_same_or_descendant(removed, candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::LayerId;
    use crate::layer::{GroupLayer, Layer, LayerKind, ObjectLayer};

    fn leaf(tree: &mut LayerTree, parent: Option<Uuid>, id: i32) -> Uuid {
        let uuid = Uuid::new();
        let layer = Layer::new(uuid, LayerId(id), LayerKind::Object(ObjectLayer::new()));
        tree.add(parent, layer)
    }

    fn group(tree: &mut LayerTree, parent: Option<Uuid>, id: i32) -> Uuid {
        let uuid = Uuid::new();
        let layer = Layer::new(uuid, LayerId(id), LayerKind::Group(GroupLayer::new()));
        tree.add(parent, layer)
    }

    #[test]
    fn global_index_is_preorder_position() {
        let mut tree = LayerTree::new();
        let a = leaf(&mut tree, None, 1);
        let g = group(&mut tree, None, 2);
        let b = leaf(&mut tree, Some(g), 3);
        let c = leaf(&mut tree, None, 4);

        assert_eq!(tree.global_index(a), Some(0));
        assert_eq!(tree.global_index(g), Some(1));
        assert_eq!(tree.global_index(b), Some(2));
        assert_eq!(tree.global_index(c), Some(3));
    }

    #[test]
    fn move_up_and_down_respect_bounds() {
        let mut tree = LayerTree::new();
        let a = leaf(&mut tree, None, 1);
        let b = leaf(&mut tree, None, 2);
        let c = leaf(&mut tree, None, 3);

        assert!(!tree.can_move_up(a));
        assert!(tree.can_move_down(a));
        assert!(!tree.can_move_down(c));

        tree.move_down(a);
        assert_eq!(tree.root_children(), &[b, a, c]);
        tree.move_up(a);
        assert_eq!(tree.root_children(), &[a, b, c]);
    }

    #[test]
    fn remove_then_reattach_restores_exact_position() {
        let mut tree = LayerTree::new();
        let a = leaf(&mut tree, None, 1);
        let b = leaf(&mut tree, None, 2);
        let c = leaf(&mut tree, None, 3);

        let detached = tree.remove(b).unwrap();
        assert_eq!(tree.root_children(), &[a, c]);
        assert!(!tree.contains(b));

        tree.reattach(detached);
        assert_eq!(tree.root_children(), &[a, b, c]);
        assert!(tree.contains(b));
    }

    #[test]
    fn remove_group_takes_whole_subtree_out() {
        let mut tree = LayerTree::new();
        let g = group(&mut tree, None, 1);
        let child = leaf(&mut tree, Some(g), 2);

        let detached = tree.remove(g).unwrap();
        assert!(!tree.contains(g));
        assert!(!tree.contains(child));
        assert_eq!(detached.uuids().count(), 2);

        tree.reattach(detached);
        assert!(tree.contains(g));
        assert!(tree.contains(child));
        assert_eq!(tree.parent_of(child), Some(Some(g)));
    }

    #[test]
    fn duplicate_appends_copy_suffix_only_at_top_level() {
        let mut tree = LayerTree::new();
        let mut contexts = ContextStore::new();
        let g = group(&mut tree, None, 1);
        contexts.insert(g, Context::new("Group"));
        let child = leaf(&mut tree, Some(g), 2);
        contexts.insert(child, Context::new("Child"));

        let mut next = 3;
        let copy = tree.duplicate(g, &mut contexts, || {
            let id = LayerId(next);
            next += 1;
            id
        }).unwrap();

        assert_eq!(contexts.get(copy).name, "Group (Copy)");
        let copy_group = tree.get(copy).unwrap().kind.as_group().unwrap();
        assert_eq!(copy_group.children().len(), 1);
        let copy_child = copy_group.children()[0];
        assert_eq!(contexts.get(copy_child).name, "Child");
        assert_eq!(tree.local_index(copy), Some(1));
    }
}

//! The undoable command system: the [`Command`] trait every mutation
//! implements, the exhaustive [`CommandKind`] tag used for merge filtering,
//! and the [`CommandStack`] that owns history.

pub mod component;
pub mod layer;
pub mod object;
pub mod property;
pub mod tile;
pub mod tileset;

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;

use crate::document::Document;
use crate::id::Uuid;

/// The exhaustive tag identifying which operation a [`Command`] performs.
///
/// Per §4.2, two commands may only merge if they report the same kind *and*
/// their target identity matches — [`Command::merge_with`] is responsible
/// for that second half, `kind()` is the cheap first filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    AddLayer,
    RemoveLayer,
    RenameLayer,
    DuplicateLayer,
    MoveLayerUp,
    MoveLayerDown,
    SetLayerOpacity,
    SetLayerVisibility,
    AddRow,
    AddColumn,
    RemoveRow,
    RemoveColumn,
    ResizeMap,
    FixInvalidTiles,
    StampSequence,
    EraserSequence,
    BucketFill,
    AddTileset,
    RemoveTileset,
    RenameTileset,
    AddProperty,
    RemoveProperty,
    RenameProperty,
    UpdateProperty,
    ChangePropertyType,
    CreateComponentDefinition,
    RenameComponentDefinition,
    RemoveComponentDefinition,
    DuplicateComponentDefinition,
    CreateComponentAttribute,
    RemoveComponentAttribute,
    RenameComponentAttribute,
    RetypeComponentAttribute,
    AttachComponent,
    DetachComponent,
    UpdateAttachedComponent,
    ResetAttachedComponent,
    AddRectangleObject,
    AddEllipseObject,
    AddPointObject,
    MoveObject,
    RenameObject,
    TagObject,
    ShowHideObject,
}

/// A reversible mutation of a document.
///
/// Implementors hold whatever snapshot they need to undo themselves as
/// owned, sum-typed data (per §9: "avoid shared references into the live
/// registry"). `as_any` exists purely so [`Command::merge_with`]
/// implementations can downcast `other` to check identity fields; every
/// implementor's body is just `self`.
pub trait Command: fmt::Debug + 'static {
    fn kind(&self) -> CommandKind;

    /// Applies (or reapplies) this command's effect against `doc`.
    fn redo(&mut self, doc: &mut Document);

    /// Reverts this command's effect against `doc`.
    fn undo(&mut self, doc: &mut Document);

    /// Attempts to absorb `other`, a command that has just been `redo()`ne
    /// and would otherwise be pushed right after `self`. Returns `true` if
    /// absorbed (in which case `other` is discarded by the caller).
    /// Commands that never merge (most structural ones) keep the default.
    fn merge_with(&mut self, other: &dyn Command) -> bool {
        let _ = other;
        false
    }

    fn as_any(&self) -> &dyn Any;
}

/// Manages a bounded history of [`Command`]s, mirroring
/// `tactile::core::CommandStack`: a deque, an optional current index (the
/// last applied command), an optional clean index (where the document was
/// last saved), and a capacity past which the oldest command is evicted.
///
/// ```text
///             clean_index
///        front     ↓      back
///        [ 0 | 1 | 2 | 3 | 4 ]
///                  ↑
///            current_index
/// ```
pub struct CommandStack {
    commands: VecDeque<Box<dyn Command>>,
    current_index: Option<usize>,
    clean_index: Option<usize>,
    capacity: usize,
}

impl fmt::Debug for CommandStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandStack")
            .field("size", &self.commands.len())
            .field("current_index", &self.current_index)
            .field("clean_index", &self.clean_index)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl CommandStack {
    pub fn new(capacity: usize) -> Self {
        Self { commands: VecDeque::new(), current_index: None, clean_index: None, capacity }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn clean_index(&self) -> Option<usize> {
        self.clean_index
    }

    pub fn can_undo(&self) -> bool {
        self.current_index.is_some()
    }

    pub fn can_redo(&self) -> bool {
        match self.current_index {
            None => !self.commands.is_empty(),
            Some(i) => i + 1 < self.commands.len(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.commands.is_empty() || self.clean_index == self.current_index
    }

    pub fn mark_clean(&mut self) {
        self.clean_index = self.current_index;
    }

    pub fn reset_clean(&mut self) {
        self.clean_index = None;
    }

    /// Appends `command` to the stack without executing it, for commands
    /// whose effect was already applied (interactive tool output captured
    /// after the fact).
    pub fn store(&mut self, command: Box<dyn Command>) {
        self.append(command);
    }

    /// Builds, executes, and places `command` on the stack — or merges it
    /// into the current top.
    ///
    /// Per §4.6: evict the oldest command if at capacity, discard any
    /// redo-able suffix, then call `redo()` on the new command exactly once
    /// before deciding whether it merges into the (possibly now-empty)
    /// stack top.
    pub fn push(&mut self, mut command: Box<dyn Command>, doc: &mut Document) {
        if self.commands.len() == self.capacity {
            self.remove_oldest();
        }
        self.remove_commands_after_current_index();

        command.redo(doc);

        let merged = match self.commands.back_mut() {
            Some(top) => top.merge_with(command.as_ref()),
            None => false,
        };

        if merged {
            self.clean_index = None;
        } else {
            self.commands.push_back(command);
            self.current_index = Some(match self.current_index {
                Some(i) => i + 1,
                None => 0,
            });
        }
    }

    pub fn undo(&mut self, doc: &mut Document) {
        crate::assert_logic!(self.can_undo(), "undo called with nothing to undo");
        let Some(index) = self.current_index else { return };
        self.commands[index].undo(doc);
        self.current_index = if index == 0 { None } else { Some(index - 1) };
    }

    pub fn redo(&mut self, doc: &mut Document) {
        crate::assert_logic!(self.can_redo(), "redo called with nothing to redo");
        let next = match self.current_index {
            Some(i) => i + 1,
            None => 0,
        };
        self.commands[next].redo(doc);
        self.current_index = Some(next);
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.commands.len() > self.capacity {
            self.remove_oldest();
        }
    }

    fn append(&mut self, command: Box<dyn Command>) {
        if self.commands.len() == self.capacity {
            self.remove_oldest();
        }
        self.remove_commands_after_current_index();
        self.commands.push_back(command);
        self.current_index = Some(match self.current_index {
            Some(i) => i + 1,
            None => 0,
        });
    }

    fn remove_oldest(&mut self) {
        crate::assert_logic!(!self.commands.is_empty(), "remove_oldest called on an empty stack");
        self.commands.pop_front();

        self.current_index = match self.current_index {
            Some(0) => None,
            Some(i) => Some(i - 1),
            None => None,
        };

        self.clean_index = match self.clean_index {
            Some(0) => None,
            Some(i) => Some(i - 1),
            None => None,
        };
    }

    fn remove_commands_after_current_index(&mut self) {
        let start = match self.current_index {
            Some(i) => i + 1,
            None => 0,
        };

        if let Some(clean) = self.clean_index {
            if clean >= start {
                self.clean_index = None;
            }
        }

        while self.commands.len() > start {
            self.commands.pop_back();
        }
    }
}

/// Convenience for commands whose merge identity is "same kind, same
/// target uuid" — the overwhelmingly common case (§4.2's mergeable list).
pub(crate) fn same_kind_and_uuid(a: &dyn Command, kind: CommandKind, uuid: Uuid, other_uuid: Uuid) -> bool {
    a.kind() == kind && uuid == other_uuid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentContent;

    #[derive(Debug)]
    struct Counter {
        delta: i32,
        applied: bool,
        target: Uuid,
    }

    impl Command for Counter {
        fn kind(&self) -> CommandKind {
            CommandKind::UpdateProperty
        }

        fn redo(&mut self, doc: &mut Document) {
            let _ = doc;
            self.applied = true;
        }

        fn undo(&mut self, doc: &mut Document) {
            let _ = doc;
            self.applied = false;
        }

        fn merge_with(&mut self, other: &dyn Command) -> bool {
            let Some(other) = other.as_any().downcast_ref::<Counter>() else { return false };
            if other.target != self.target {
                return false;
            }
            self.delta += other.delta;
            true
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn counter(delta: i32, target: Uuid) -> Box<dyn Command> {
        Box::new(Counter { delta, applied: false, target })
    }

    fn test_doc() -> Document {
        Document::new(DocumentContent::Map(crate::map::Map::new((32, 32), 4, 4, crate::map::TileFormat::default())), 100)
    }

    #[test]
    fn push_executes_redo_exactly_once_before_merge_decision() {
        let mut doc = test_doc();
        let mut stack = CommandStack::new(10);
        let target = Uuid::new();
        stack.push(counter(1, target), &mut doc);
        stack.push(counter(2, target), &mut doc);
        assert_eq!(stack.len(), 1);
        let top = stack.commands.back().unwrap().as_any().downcast_ref::<Counter>().unwrap();
        assert_eq!(top.delta, 3);
        assert!(top.applied);
    }

    #[test]
    fn distinct_targets_never_merge() {
        let mut doc = test_doc();
        let mut stack = CommandStack::new(10);
        stack.push(counter(1, Uuid::new()), &mut doc);
        stack.push(counter(2, Uuid::new()), &mut doc);
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn undo_redo_moves_current_index() {
        let mut doc = test_doc();
        let mut stack = CommandStack::new(10);
        let target = Uuid::new();
        stack.push(counter(1, target), &mut doc);
        assert_eq!(stack.current_index(), Some(0));
        stack.undo(&mut doc);
        assert_eq!(stack.current_index(), None);
        assert!(!stack.can_undo());
        stack.redo(&mut doc);
        assert_eq!(stack.current_index(), Some(0));
    }

    #[test]
    fn clean_index_tracks_mark_clean() {
        let mut doc = test_doc();
        let mut stack = CommandStack::new(10);
        let target = Uuid::new();
        stack.mark_clean();
        stack.push(counter(1, target), &mut doc);
        assert!(!stack.is_clean());
        stack.undo(&mut doc);
        stack.redo(&mut doc);
        assert!(!stack.is_clean()); // clean_index was captured at the empty state (None), current is now Some(0)

        let mut stack2 = CommandStack::new(10);
        stack2.push(counter(1, target), &mut doc);
        stack2.mark_clean();
        stack2.undo(&mut doc);
        stack2.redo(&mut doc);
        assert!(stack2.is_clean());
    }

    #[test]
    fn capacity_eviction_decrements_clean_and_current_index() {
        let mut doc = test_doc();
        let mut stack = CommandStack::new(2);
        let a = Uuid::new();
        stack.push(counter(1, a), &mut doc);
        stack.mark_clean(); // clean_index = Some(0)
        stack.push(counter(1, Uuid::new()), &mut doc);
        // distinct targets: two entries, clean_index still Some(0), current Some(1)
        assert_eq!(stack.clean_index(), Some(0));
        stack.push(counter(1, Uuid::new()), &mut doc); // at capacity: evicts index 0
        assert_eq!(stack.clean_index(), None); // 0 evicted -> clean index reset
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn pushing_after_undo_discards_redo_suffix_and_invalidates_clean_if_inside_it() {
        let mut doc = test_doc();
        let mut stack = CommandStack::new(10);
        let a = Uuid::new();
        stack.push(counter(1, Uuid::new()), &mut doc);
        stack.push(counter(1, Uuid::new()), &mut doc);
        stack.mark_clean(); // clean at index 1
        stack.undo(&mut doc); // current = Some(0)
        stack.push(counter(1, a), &mut doc); // discards old index 1, which held clean_index
        assert_eq!(stack.clean_index(), None);
        assert_eq!(stack.len(), 2);
    }
}

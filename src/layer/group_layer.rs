//! Group layers: an ordered sequence of child layer identities.

use serde::{Deserialize, Serialize};

use crate::id::Uuid;

/// A layer that nests other layers. The root of a map's layer tree is a
/// virtual instance of this (it has no [`crate::layer::Layer`] wrapper of
/// its own — see [`crate::layer::tree::LayerTree`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupLayer {
    children: Vec<Uuid>,
}

impl GroupLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn children(&self) -> &[Uuid] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<Uuid> {
        &mut self.children
    }

    pub fn push(&mut self, child: Uuid) {
        self.children.push(child);
    }

    pub fn insert(&mut self, index: usize, child: Uuid) {
        self.children.insert(index, child);
    }

    pub fn remove(&mut self, child: Uuid) -> Option<usize> {
        let idx = self.children.iter().position(|&c| c == child)?;
        self.children.remove(idx);
        Some(idx)
    }

    pub fn position_of(&self, child: Uuid) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        self.children.swap(a, b);
    }
}

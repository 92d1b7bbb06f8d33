//! Object layers: an ordered sequence of object identities.

use serde::{Deserialize, Serialize};

use crate::id::Uuid;

/// A layer holding an ordered sequence of objects.
///
/// Order is insertion order unless explicitly reordered; it is what
/// determines paint/hit-test order in the shell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectLayer {
    objects: Vec<Uuid>,
}

impl ObjectLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objects(&self) -> &[Uuid] {
        &self.objects
    }

    pub fn push(&mut self, object: Uuid) {
        self.objects.push(object);
    }

    /// Removes an object by uuid, preserving the relative order of the
    /// remaining objects.
    pub fn remove(&mut self, object: Uuid) -> bool {
        if let Some(idx) = self.objects.iter().position(|&o| o == object) {
            self.objects.remove(idx);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, object: Uuid) -> bool {
        self.objects.contains(&object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_preserves_order_of_remaining_objects() {
        let mut layer = ObjectLayer::new();
        let a = Uuid::new();
        let b = Uuid::new();
        let c = Uuid::new();
        layer.push(a);
        layer.push(b);
        layer.push(c);
        layer.remove(b);
        assert_eq!(layer.objects(), &[a, c]);
    }
}

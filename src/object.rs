//! Map objects: rectangles, ellipses, and points living in an object layer.

use serde::{Deserialize, Serialize};

use crate::id::{ObjectId, Uuid};

/// The shape of an [`Object`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectKind {
    Rect,
    Ellipse,
    Point,
}

/// A single placed object. Carries a [`crate::context::Context`] (accessed
/// through the owning document's [`crate::context::ContextStore`] via
/// `uuid`) for its name, properties, and components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub uuid: Uuid,
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub position: (f32, f32),
    /// `(0, 0)` for [`ObjectKind::Point`].
    pub size: (f32, f32),
    pub tag: String,
    pub visible: bool,
}

impl Object {
    /// Creates a new object. The caller is responsible for registering a
    /// [`crate::context::Context`] for `uuid` in the owning document.
    pub fn new(uuid: Uuid, id: ObjectId, kind: ObjectKind, position: (f32, f32)) -> Self {
        Self { uuid, id, kind, position, size: (0.0, 0.0), tag: String::new(), visible: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_objects_have_zero_size() {
        let obj = Object::new(Uuid::new(), ObjectId(1), ObjectKind::Point, (1.0, 2.0));
        assert_eq!(obj.size, (0.0, 0.0));
    }
}

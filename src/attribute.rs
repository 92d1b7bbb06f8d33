//! The dynamically-typed attribute value used by properties and component
//! attributes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::id::ObjectId;

/// An RGBA8 color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Color {
    /// Fully opaque black, the default color value.
    pub const BLACK: Color = Color { red: 0, green: 0, blue: 0, alpha: 255 };
    /// Fully transparent black, used as the "reset" default.
    pub const TRANSPARENT: Color = Color { red: 0, green: 0, blue: 0, alpha: 0 };

    /// Builds an opaque color from its RGB channels.
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue, alpha: 255 }
    }

    /// Builds a color from all four channels.
    pub const fn rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self { red, green, blue, alpha }
    }
}

/// The tag identifying an [`Attribute`]'s variant, independent of any value.
///
/// Used by component definitions (defaults carry a type) and by the
/// "change-type" property/attribute commands, which need to convert an
/// existing value to a new type without an instance in hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeType {
    String,
    Int,
    Float,
    Bool,
    Color,
    FilePath,
    ObjectRef,
}

/// A dynamically-typed value attached to a [`crate::context::Context`] as a
/// property, or carried as a component attribute's default/override.
///
/// Equality is structural: two attributes are equal only if they share both
/// variant and value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum Attribute {
    String(String),
    Int(i32),
    Float(f32),
    Bool(bool),
    Color(Color),
    FilePath(PathBuf),
    ObjectRef(Option<ObjectId>),
}

impl Attribute {
    /// The type tag of this value.
    pub fn kind(&self) -> AttributeType {
        match self {
            Attribute::String(_) => AttributeType::String,
            Attribute::Int(_) => AttributeType::Int,
            Attribute::Float(_) => AttributeType::Float,
            Attribute::Bool(_) => AttributeType::Bool,
            Attribute::Color(_) => AttributeType::Color,
            Attribute::FilePath(_) => AttributeType::FilePath,
            Attribute::ObjectRef(_) => AttributeType::ObjectRef,
        }
    }

    /// The zero value for a given type tag: empty string, `0`, `0.0`,
    /// `false`, transparent black, an empty path, or no object reference.
    pub fn default_for(kind: AttributeType) -> Self {
        match kind {
            AttributeType::String => Attribute::String(String::new()),
            AttributeType::Int => Attribute::Int(0),
            AttributeType::Float => Attribute::Float(0.0),
            AttributeType::Bool => Attribute::Bool(false),
            AttributeType::Color => Attribute::Color(Color::TRANSPARENT),
            AttributeType::FilePath => Attribute::FilePath(PathBuf::new()),
            AttributeType::ObjectRef => Attribute::ObjectRef(None),
        }
    }

    /// Resets this value in place to its type's default.
    pub fn reset_to_default(&mut self) {
        *self = Self::default_for(self.kind());
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Attribute::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Attribute::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Attribute::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Attribute::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Attribute::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_file_path(&self) -> Option<&Path> {
        match self {
            Attribute::FilePath(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_object_ref(&self) -> Option<ObjectId> {
        match self {
            Attribute::ObjectRef(v) => *v,
            _ => None,
        }
    }

    /// Like [`Self::as_string`], but panics (in debug builds, via
    /// [`crate::assert_logic`]) if the variant doesn't match. Intended for
    /// test code that knows the shape of the value it's inspecting.
    pub fn expect_string(&self) -> &str {
        match self.as_string() {
            Some(s) => s,
            None => {
                crate::assert_logic!(false, "attribute is not a string");
                ""
            }
        }
    }

    pub fn expect_int(&self) -> i32 {
        match self.as_int() {
            Some(v) => v,
            None => {
                crate::assert_logic!(false, "attribute is not an int");
                0
            }
        }
    }

    pub fn expect_float(&self) -> f32 {
        match self.as_float() {
            Some(v) => v,
            None => {
                crate::assert_logic!(false, "attribute is not a float");
                0.0
            }
        }
    }

    pub fn expect_bool(&self) -> bool {
        match self.as_bool() {
            Some(v) => v,
            None => {
                crate::assert_logic!(false, "attribute is not a bool");
                false
            }
        }
    }

    pub fn expect_color(&self) -> Color {
        match self.as_color() {
            Some(v) => v,
            None => {
                crate::assert_logic!(false, "attribute is not a color");
                Color::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_to_default_zeroes_each_variant() {
        let mut v = Attribute::String("hello".into());
        v.reset_to_default();
        assert_eq!(v, Attribute::String(String::new()));

        let mut v = Attribute::Int(42);
        v.reset_to_default();
        assert_eq!(v, Attribute::Int(0));

        let mut v = Attribute::Color(Color::rgb(1, 2, 3));
        v.reset_to_default();
        assert_eq!(v, Attribute::Color(Color::TRANSPARENT));
    }

    #[test]
    fn structural_equality_requires_same_variant() {
        assert_ne!(Attribute::Int(0), Attribute::Float(0.0));
        assert_eq!(Attribute::Bool(true), Attribute::Bool(true));
    }
}

//! Multi-dialect map serialization: a shared intermediate representation
//! ([`ir`]) that every on-disk dialect parses into and lowers from (§4.7).
//!
//! [`native_yaml`] is the canonical, fully round-tripping dialect. The
//! others trade away parts of the model in exchange for interop with other
//! tools: [`tiled_json`] and [`tiled_xml`] read and write Tiled's own
//! formats (components degrade to properties); [`godot_tscn`] is a
//! write-only export to a Godot scene.

pub mod godot_tscn;
pub mod ir;
pub mod native_yaml;
pub mod path_policy;
pub mod tile_encoding;
pub mod tiled_json;
pub mod tiled_xml;

pub use ir::MapIR;

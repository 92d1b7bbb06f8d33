#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]

pub mod attribute;
pub mod command;
pub mod component;
pub mod context;
pub mod document;
pub mod error;
pub mod event;
pub mod external;
pub mod history;
pub mod id;
pub mod layer;
pub mod map;
pub mod object;
pub mod serialize;
pub mod session;
pub mod tile_matrix;
pub mod tileset;

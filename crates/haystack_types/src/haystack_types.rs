//! Haystack Types - Tag value model shared by the station and the adapter
//!
//! This crate contains the pure data structures of the Haystack protocol:
//! typed tag values, ordered tag dictionaries and grids. Wire formats are
//! not implemented here; values only know their Haystack JSON string
//! encoding so they can pass through serde.

mod dict;
mod grid;
mod value;

pub use dict::*;
pub use grid::*;
pub use value::*;

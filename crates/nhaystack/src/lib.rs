//! NHaystack - Project Haystack adapter for a hierarchical station
//!
//! This crate translates between a live building-automation object tree and
//! the flat, tag-based Haystack entity model:
//! - Identity map between component handles / history ids and Haystack refs
//! - Tag projection of components and histories
//! - Point ↔ history correlation, local and imported from peer stations
//! - Lazy navigation tree and full-space enumeration
//! - Priority-array writes on writable points
//! - Protocol ops (`about`, `read`, `nav`, `hisRead`, `pointWrite`, ...)
//!   executed on a dedicated station worker thread

pub mod config;
pub mod context;
pub mod correlate;
pub mod error;
pub mod filter;
pub mod ids;
pub mod iter;
pub mod nav;
pub mod server;
pub mod tags;
pub mod write;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, HaystackConfig};
pub use context::Context;
pub use error::{HaystackError, Result};
pub use filter::Filter;
pub use ids::{EntityId, IdentityMap, Resolved};
pub use iter::{SpaceCursor, SpaceIterator};
pub use nav::NavNode;
pub use server::{HaystackServer, Op, StationHandle, StationWorker};

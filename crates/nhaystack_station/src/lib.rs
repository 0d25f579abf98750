//! NHaystack Station - the host object graph the Haystack adapter reads and writes
//!
//! The adapter never owns building-automation objects. It sees them through
//! the [`Station`] and [`StationMut`] traits, addressed by opaque [`Handle`]s
//! that are revalidated on every access. [`MemoryStation`] is an arena-backed
//! implementation used for fixtures and tests.
//!
//! ## Object model
//!
//! ```text
//! slot:/                         (root, baja:Station)
//!  ├── Foo                       (folder, annotated `equip`)
//!  │    ├── SineWave1            (control point)
//!  │    │    └── history         (history extension → /station/SineWave1)
//!  │    └── comp
//!  └── Drivers
//!       └── NiagaraNetwork
//!            └── remote1         (peer station device)
//!                 └── points     (proxy points mirrored from the peer)
//! ```
//!
//! History configurations live beside the component tree and point back at
//! their source through a `station:|slot:/...` ord.

pub mod component;
pub mod history;
pub mod loader;
pub mod point;
pub mod station;

pub use component::{Annotation, Component, ComponentBody, ComponentSpec, Handle};
pub use history::{HisRecord, Historian, HistoryConfig, HistoryId, Interpolation, MemoryHistorian};
pub use loader::{LoadError, StationFixture};
pub use point::{
    ControlPoint, EnumValue, Facets, PointKind, PointValue, PriorityArray, PriorityLevel,
    PrioritySlot, ProxyExt, Status, WriteError,
};
pub use station::{MemoryStation, Station, StationMut};

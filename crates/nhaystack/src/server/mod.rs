//! Protocol server: op dispatch and the station worker thread.

pub mod commands;
pub mod ops;
pub mod worker;

pub use commands::{Page, StationCommand};
pub use ops::{HaystackServer, Op};
pub use worker::{StationHandle, StationWorker};

//! Error types for Haystack operations.

use nhaystack_station::WriteError;

/// Errors surfaced to protocol callers.
#[derive(Debug, thiserror::Error)]
pub enum HaystackError {
    /// Reference does not name any live entity
    #[error("Unknown record: {0}")]
    UnknownRecord(String),

    /// Navigation id matches no known pattern or component
    #[error("Cannot lookup nav for {0}")]
    Lookup(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Point is not writable: {0}")]
    NotWritable(String),

    #[error("Cannot write {value} to a {kind} point")]
    InvalidValue { kind: String, value: String },

    #[error("Write failed: {0}")]
    Write(#[from] WriteError),

    #[error("No history for {0}")]
    NoHistory(String),

    #[error("Unknown op: {0}")]
    UnknownOp(String),

    #[error("Missing argument '{arg}' for op {op}")]
    MissingArg { op: String, arg: String },

    #[error("Station worker has terminated")]
    Terminated,

    #[error("Failed to spawn station worker: {0}")]
    SpawnFailed(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HaystackError>;

//! Commands sent to the station worker.

use haystack_types::{Dict, Grid};
use tokio::sync::oneshot;

use crate::error::Result;
use crate::filter::Filter;
use crate::iter::SpaceCursor;
use crate::server::ops::Op;

/// One page of a full-space read.
#[derive(Debug, Clone)]
pub struct Page {
    pub rows: Vec<Dict>,
    /// Where the next page starts; `None` once the walk is complete
    pub next: Option<SpaceCursor>,
}

#[derive(Debug)]
pub enum StationCommand {
    /// Run one op to completion. [`StationHandle`](super::StationHandle)
    /// sends filter reads as `ReadPage` commands instead.
    Execute {
        op: Op,
        response: oneshot::Sender<Result<Grid>>,
    },
    ReadPage {
        filter: Filter,
        cursor: SpaceCursor,
        response: oneshot::Sender<Page>,
    },
    Shutdown,
}

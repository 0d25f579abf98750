//! Station worker thread.
//!
//! The station is mutated by exactly one thread. It lives on a dedicated
//! worker together with the protocol server, and callers talk to it
//! through a cloneable [`StationHandle`]. Full-space reads are answered one
//! page per command, so writes and other requests interleave with a long
//! enumeration instead of waiting for it.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use futures::stream::{self, Stream, StreamExt};
use haystack_types::{Dict, Grid};
use nhaystack_station::{Historian, StationMut};
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::config::HaystackConfig;
use crate::error::{HaystackError, Result};
use crate::filter::Filter;
use crate::iter::SpaceCursor;
use crate::server::commands::{Page, StationCommand};
use crate::server::ops::{HaystackServer, Op};

/// Handle for sending commands to the station worker.
#[derive(Debug, Clone)]
pub struct StationHandle {
    cmd_tx: mpsc::Sender<StationCommand>,
}

impl StationHandle {
    /// Execute one op on the station thread.
    ///
    /// Filter reads are paged, so other commands run between their pages.
    pub async fn call(&self, op: Op) -> Result<Grid> {
        match op {
            Op::Read { filter, limit } => self.read(&filter, limit).await,
            op => self.execute(op).await,
        }
    }

    async fn execute(&self, op: Op) -> Result<Grid> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(StationCommand::Execute { op, response: tx })
            .map_err(|_| HaystackError::Terminated)?;

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(HaystackError::Terminated),
        }
    }

    /// Visit one more page of a full-space read.
    pub async fn read_page(&self, filter: Filter, cursor: SpaceCursor) -> Result<Page> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(StationCommand::ReadPage {
                filter,
                cursor,
                response: tx,
            })
            .map_err(|_| HaystackError::Terminated)?;

        match rx.await {
            Ok(page) => Ok(page),
            Err(_) => Err(HaystackError::Terminated),
        }
    }

    /// Visible entities matching `filter`, fetched page by page until
    /// `limit` rows have matched or the space is exhausted.
    pub async fn read(&self, filter: &str, limit: Option<usize>) -> Result<Grid> {
        let filter = Filter::parse(filter)?;
        let limit = limit.unwrap_or(usize::MAX);
        let mut rows = Vec::new();
        let mut cursor = Some(SpaceCursor::default());
        while rows.len() < limit {
            let Some(current) = cursor.take() else {
                break;
            };
            let page = self.read_page(filter.clone(), current).await?;
            rows.extend(page.rows);
            cursor = page.next;
        }
        rows.truncate(limit);
        Ok(Grid::from_dicts(rows))
    }

    /// Every visible entity matching `filter`.
    pub async fn read_all(&self, filter: &str) -> Result<Grid> {
        self.read(filter, None).await
    }

    /// Full-space read as a stream. A page is only requested once the
    /// previous one has been consumed; dropping the stream stops the walk.
    pub fn read_all_stream(&self, filter: Filter) -> impl Stream<Item = Result<Dict>> + Send + 'static {
        let handle = self.clone();
        stream::unfold(Some(SpaceCursor::default()), move |cursor| {
            let handle = handle.clone();
            let filter = filter.clone();
            async move {
                let cursor = cursor?;
                match handle.read_page(filter, cursor).await {
                    Ok(page) => Some((Ok(page.rows), page.next)),
                    Err(e) => Some((Err(e), None)),
                }
            }
        })
        .flat_map(|page: Result<Vec<Dict>>| {
            let items: Vec<Result<Dict>> = match page {
                Ok(rows) => rows.into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            };
            stream::iter(items)
        })
    }

    /// Shutdown the station worker.
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(StationCommand::Shutdown);
    }
}

/// Owns the station worker thread.
pub struct StationWorker {
    handle: StationHandle,
    worker_handle: Option<JoinHandle<()>>,
}

impl StationWorker {
    /// Move `station` and `historian` onto a new worker thread.
    pub fn spawn<S, H>(station: S, historian: H, config: HaystackConfig) -> Result<Self>
    where
        S: StationMut + Send + 'static,
        H: Historian + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<StationCommand>();

        let worker_handle = thread::Builder::new()
            .name("station-worker".to_string())
            .spawn(move || {
                let mut worker = Worker::new(station, historian, config);
                worker.run(cmd_rx);
            })?;

        Ok(Self {
            handle: StationHandle { cmd_tx },
            worker_handle: Some(worker_handle),
        })
    }

    pub fn handle(&self) -> StationHandle {
        self.handle.clone()
    }

    /// Shutdown the worker and wait for it to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.handle.shutdown();
        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StationWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker<S, H> {
    station: S,
    historian: H,
    server: HaystackServer,
}

impl<S: StationMut, H: Historian> Worker<S, H> {
    fn new(station: S, historian: H, config: HaystackConfig) -> Self {
        let server = HaystackServer::new(station.station_name(), config);
        info!("Station worker initialized for {}", station.station_name());

        Self {
            station,
            historian,
            server,
        }
    }

    fn run(&mut self, cmd_rx: mpsc::Receiver<StationCommand>) {
        info!("Station worker started");

        loop {
            match cmd_rx.recv() {
                Ok(cmd) => {
                    if matches!(cmd, StationCommand::Shutdown) {
                        info!("Station worker shutting down");
                        break;
                    }
                    self.handle_command(cmd);
                }
                Err(_) => {
                    info!("Station command channel closed");
                    break;
                }
            }
        }

        info!("Station worker stopped");
    }

    fn handle_command(&mut self, cmd: StationCommand) {
        match cmd {
            StationCommand::Execute { op, response } => {
                let name = op.name();
                let result = self.server.execute(&mut self.station, &self.historian, op);
                if let Err(e) = &result {
                    debug!("{} failed: {}", name, e);
                }
                let _ = response.send(result);
            }

            StationCommand::ReadPage {
                filter,
                cursor,
                response,
            } => {
                let (rows, cursor) = self.server.read_page(&self.station, &filter, cursor);
                let next = (!cursor.is_done()).then_some(cursor);
                let _ = response.send(Page { rows, next });
            }

            StationCommand::Shutdown => {}
        }
    }
}

//! Point ↔ history correlation.
//!
//! A local history is paired with the point owning the history extension
//! named by its source. An imported history is paired with the proxy
//! point mirroring the same remote point, if the peer station's points are
//! mirrored here at all.

use std::collections::HashMap;

use nhaystack_station::{
    Component, ComponentBody, Handle, HistoryConfig, HistoryId, ProxyExt, Station,
};
use tracing::debug;

use crate::context::Context;

const SOURCE_PREFIX: &str = "station:|";

/// A point on a peer station, addressed by its slot path there.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemotePoint {
    pub station_name: String,
    pub slot_path: String,
}

impl RemotePoint {
    /// The remote point an imported history records: the parent of the
    /// history extension named by the source.
    pub fn from_history_config(cfg: &HistoryConfig) -> Option<Self> {
        let source = source_slot_path(cfg.source.as_deref()?)?;
        let (point_path, _ext) = source.rsplit_once('/')?;
        if point_path.len() <= "slot:".len() {
            return None;
        }
        Some(Self {
            station_name: cfg.id.device.clone(),
            slot_path: point_path.to_string(),
        })
    }

    /// The remote point a Niagara proxy point mirrors.
    pub fn from_proxy_point<S: Station + ?Sized>(station: &S, comp: &Component) -> Option<Self> {
        let slot_path = niagara_point_id(comp)?;
        let mut current = station.parent(comp.handle);
        while let Some(ancestor) = current {
            if let ComponentBody::NiagaraStation { station_name } = &ancestor.body {
                return Some(Self {
                    station_name: station_name.clone(),
                    slot_path: slot_path.to_string(),
                });
            }
            current = station.parent(ancestor.handle);
        }
        None
    }
}

fn source_slot_path(source: &str) -> Option<&str> {
    source
        .strip_prefix(SOURCE_PREFIX)
        .filter(|path| path.starts_with("slot:/"))
}

fn niagara_point_id(comp: &Component) -> Option<&str> {
    match &comp.as_point()?.proxy {
        Some(ProxyExt::Niagara { point_id }) => Some(point_id.as_str()),
        _ => None,
    }
}

pub fn is_local<S: Station + ?Sized>(station: &S, cfg: &HistoryConfig) -> bool {
    cfg.id.device == station.station_name()
}

/// The live point a history records, if any.
pub fn paired_point<'a, S: Station + ?Sized>(
    ctx: Context<'a, S>,
    cfg: &HistoryConfig,
) -> Option<&'a Component> {
    if is_local(ctx.station, cfg) {
        local_paired_point(ctx.station, cfg)
    } else {
        let remote = RemotePoint::from_history_config(cfg)?;
        lookup_remote_point(ctx.station, &remote)
    }
}

fn local_paired_point<'a, S: Station + ?Sized>(
    station: &'a S,
    cfg: &HistoryConfig,
) -> Option<&'a Component> {
    let path = source_slot_path(cfg.source.as_deref()?)?;
    let Some(source) = station
        .resolve_slot_path(path)
        .and_then(|h| station.component(h))
    else {
        debug!("Source of {} does not resolve: {}", cfg.id, path);
        return None;
    };

    // Some histories are fed by a service rather than a point extension
    match source.body {
        ComponentBody::HistoryExt { .. } => station.parent(source.handle).filter(|p| p.is_point()),
        _ => None,
    }
}

/// Scan the peer station's mirrored points for `remote`.
///
/// Fetches and walks the whole point list on every call; bulk callers use
/// [`RemotePointIndex`].
pub fn lookup_remote_point<'a, S: Station + ?Sized>(
    station: &'a S,
    remote: &RemotePoint,
) -> Option<&'a Component> {
    station
        .remote_points(&remote.station_name)?
        .into_iter()
        .filter_map(|h| station.component(h))
        .find(|c| niagara_point_id(c) == Some(remote.slot_path.as_str()))
}

/// The history recording a point, if any.
///
/// A history extension child wins; otherwise a Niagara proxy point is
/// matched against the imported histories of its peer station.
pub fn history_for_point<'a, S: Station + ?Sized>(
    ctx: Context<'a, S>,
    comp: &Component,
) -> Option<&'a HistoryConfig> {
    let station = ctx.station;
    if let Some(local) = local_history(station, comp) {
        return Some(local);
    }

    let remote = RemotePoint::from_proxy_point(station, comp)?;
    station.histories().into_iter().find(|cfg| {
        cfg.id.device == remote.station_name
            && RemotePoint::from_history_config(cfg).as_ref() == Some(&remote)
    })
}

fn local_history<'a, S: Station + ?Sized>(station: &'a S, comp: &Component) -> Option<&'a HistoryConfig> {
    station
        .children(comp.handle)
        .into_iter()
        .find_map(|child| match &child.body {
            ComponentBody::HistoryExt { history } => station.history(history),
            _ => None,
        })
}

// ─────────────────────────────────────────────────────────────────────────────
// Batched lookup
// ─────────────────────────────────────────────────────────────────────────────

/// Remote point lists fetched once per peer station and reused for every
/// imported history of that station. The other direction, from proxy
/// point to imported history, is indexed once on first use.
///
/// Cached handles and history ids are revalidated on use; anything removed
/// since it was indexed is simply not paired.
#[derive(Debug, Clone, Default)]
pub struct RemotePointIndex {
    stations: HashMap<String, HashMap<String, Handle>>,
    imported: Option<HashMap<RemotePoint, HistoryId>>,
    fetches: usize,
}

impl RemotePointIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paired_point<'a, S: Station + ?Sized>(
        &mut self,
        ctx: Context<'a, S>,
        cfg: &HistoryConfig,
    ) -> Option<&'a Component> {
        if is_local(ctx.station, cfg) {
            return local_paired_point(ctx.station, cfg);
        }

        let remote = RemotePoint::from_history_config(cfg)?;
        if !self.stations.contains_key(&remote.station_name) {
            self.fetches += 1;
            let points = fetch_points(ctx.station, &remote.station_name);
            debug!(
                "Indexed {} points of remote station {}",
                points.len(),
                remote.station_name
            );
            self.stations.insert(remote.station_name.clone(), points);
        }

        let handle = *self.stations.get(&remote.station_name)?.get(&remote.slot_path)?;
        ctx.station
            .component(handle)
            .filter(|c| niagara_point_id(c) == Some(remote.slot_path.as_str()))
    }

    /// Like [`history_for_point`], without rescanning every history for
    /// each proxy point.
    pub fn history_for_point<'a, S: Station + ?Sized>(
        &mut self,
        ctx: Context<'a, S>,
        comp: &Component,
    ) -> Option<&'a HistoryConfig> {
        let station = ctx.station;
        if let Some(local) = local_history(station, comp) {
            return Some(local);
        }

        let remote = RemotePoint::from_proxy_point(station, comp)?;
        let imported = self.imported.get_or_insert_with(|| index_imported(station));
        let cfg = station.history(imported.get(&remote)?)?;
        (RemotePoint::from_history_config(cfg).as_ref() == Some(&remote)).then_some(cfg)
    }

    /// Number of remote point lists fetched so far.
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    pub fn has_imported_index(&self) -> bool {
        self.imported.is_some()
    }
}

fn index_imported<S: Station + ?Sized>(station: &S) -> HashMap<RemotePoint, HistoryId> {
    let mut imported = HashMap::new();
    for cfg in station.histories() {
        if is_local(station, cfg) {
            continue;
        }
        if let Some(remote) = RemotePoint::from_history_config(cfg) {
            imported.entry(remote).or_insert_with(|| cfg.id.clone());
        }
    }
    debug!("Indexed {} imported histories", imported.len());
    imported
}

fn fetch_points<S: Station + ?Sized>(station: &S, station_name: &str) -> HashMap<String, Handle> {
    station
        .remote_points(station_name)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|h| station.component(h))
        .filter_map(|c| niagara_point_id(c).map(|id| (id.to_string(), c.handle)))
        .collect()
}

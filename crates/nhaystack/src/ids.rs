//! Identity map between station objects and Haystack refs
//!
//! Refs have the form `<station>:c.<id>` for components and
//! `<station>:h.<id>` for histories. The id is the URL-safe base64 of the
//! component handle (decimal) or of the history id (`/<device>/<name>`),
//! with `=` padding written as `~`.

use std::cell::RefCell;
use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use haystack_types::Ref;
use nhaystack_station::{Component, Handle, HistoryConfig, HistoryId, Station};
use tracing::debug;

use crate::error::{HaystackError, Result};

pub const COMPONENT_SPACE: &str = "c";
pub const HISTORY_SPACE: &str = "h";

/// A decoded ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityId {
    Component(Handle),
    History(HistoryId),
}

/// A ref resolved against a live station.
#[derive(Debug, Clone, Copy)]
pub enum Resolved<'s> {
    Component(&'s Component),
    History(&'s HistoryConfig),
}

/// Per-station identity map.
///
/// Besides encoding and decoding refs it memoizes the implicit equipment
/// of points that carry no `equipRef` tag. The memo is only a shortcut:
/// entries are revalidated on use and recomputed when stale.
#[derive(Debug)]
pub struct IdentityMap {
    station_name: String,
    implicit_equips: RefCell<HashMap<Handle, Option<Handle>>>,
}

impl IdentityMap {
    pub fn new(station_name: impl Into<String>) -> Self {
        Self {
            station_name: station_name.into(),
            implicit_equips: RefCell::new(HashMap::new()),
        }
    }

    pub fn station_name(&self) -> &str {
        &self.station_name
    }

    /// Nav id of a whole space, e.g. `nhaystack_simple:c`.
    pub fn space_id(&self, space: &str) -> String {
        format!("{}:{}", self.station_name, space)
    }

    pub fn component_ref(&self, handle: Handle) -> Ref {
        Ref::new(self.encode(COMPONENT_SPACE, &handle.to_string()))
    }

    pub fn history_ref(&self, id: &HistoryId) -> Ref {
        Ref::new(self.encode(HISTORY_SPACE, &id.to_string()))
    }

    fn encode(&self, space: &str, path: &str) -> String {
        let id = URL_SAFE.encode(path.as_bytes()).replace('=', "~");
        format!("{}:{}.{}", self.station_name, space, id)
    }

    /// Decode a ref string without touching the station.
    pub fn parse(&self, val: &str) -> Option<EntityId> {
        let rest = val
            .strip_prefix(self.station_name.as_str())?
            .strip_prefix(':')?;
        let (space, id) = rest.split_once('.')?;
        let bytes = URL_SAFE.decode(id.replace('~', "=")).ok()?;
        let path = String::from_utf8(bytes).ok()?;
        match space {
            COMPONENT_SPACE => path.parse().ok().map(|h| EntityId::Component(Handle(h))),
            HISTORY_SPACE => path.parse().ok().map(EntityId::History),
            _ => None,
        }
    }

    /// Resolve a ref to a live component or history.
    pub fn resolve<'s, S: Station + ?Sized>(
        &self,
        station: &'s S,
        r: &Ref,
    ) -> Result<Resolved<'s>> {
        let unknown = || HaystackError::UnknownRecord(r.val.clone());
        match self.parse(&r.val).ok_or_else(unknown)? {
            EntityId::Component(handle) => station
                .component(handle)
                .map(Resolved::Component)
                .ok_or_else(unknown),
            EntityId::History(id) => station
                .history(&id)
                .map(Resolved::History)
                .ok_or_else(unknown),
        }
    }

    /// Nearest ancestor of `point` tagged `equip`, memoized.
    pub fn implicit_equip<S: Station + ?Sized>(&self, station: &S, point: Handle) -> Option<Handle> {
        let cached = self.implicit_equips.borrow().get(&point).copied();
        if let Some(cached) = cached {
            let still_valid = match cached {
                Some(equip) => station.component(equip).is_some_and(is_equip),
                None => true,
            };
            if still_valid {
                return cached;
            }
            debug!("Implicit equip of {} is stale, recomputing", point);
        }

        let found = find_equip_ancestor(station, point);
        self.implicit_equips.borrow_mut().insert(point, found);
        found
    }

    /// Drop every memoized equipment association.
    pub fn clear_cache(&self) {
        self.implicit_equips.borrow_mut().clear();
    }

    pub fn cached_equips(&self) -> usize {
        self.implicit_equips.borrow().len()
    }
}

fn is_equip(component: &Component) -> bool {
    component.tags().is_some_and(|t| t.has("equip"))
}

fn find_equip_ancestor<S: Station + ?Sized>(station: &S, point: Handle) -> Option<Handle> {
    let mut current = station.parent(point);
    while let Some(component) = current {
        if is_equip(component) {
            return Some(component.handle);
        }
        current = station.parent(component.handle);
    }
    None
}

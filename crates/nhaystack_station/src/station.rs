//! Station traits and the in-memory arena implementation.

use std::collections::HashMap;

use tracing::debug;

use crate::component::{Annotation, Component, ComponentBody, ComponentSpec, Handle};
use crate::history::{HistoryConfig, HistoryId};

/// Read access to a host station.
///
/// Every lookup takes a [`Handle`] and returns `None` when the host no
/// longer has that component.
pub trait Station {
    fn station_name(&self) -> &str;

    /// Region id of the station, e.g. "America/New_York"
    fn time_zone(&self) -> &str;

    fn root(&self) -> Handle;

    fn component(&self, handle: Handle) -> Option<&Component>;

    fn resolve_slot_path(&self, slot_path: &str) -> Option<Handle>;

    /// All history configurations, in the host's order.
    fn histories(&self) -> Vec<&HistoryConfig>;

    fn history(&self, id: &HistoryId) -> Option<&HistoryConfig>;

    /// Device component representing `station_name` on the Niagara network.
    fn network_station(&self, station_name: &str) -> Option<Handle>;

    /// Live children of a component; stale child handles are skipped.
    fn children(&self, handle: Handle) -> Vec<&Component> {
        self.component(handle)
            .map(|c| {
                c.children
                    .iter()
                    .filter_map(|child| self.component(*child))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn parent(&self, handle: Handle) -> Option<&Component> {
        self.component(handle)
            .and_then(|c| c.parent)
            .and_then(|p| self.component(p))
    }

    /// Control points under the `points` extension of a peer station
    /// device, sub-folders included.
    fn remote_points(&self, station_name: &str) -> Option<Vec<Handle>> {
        let device = self.network_station(station_name)?;
        let points = self
            .children(device)
            .into_iter()
            .find(|c| c.name == "points")?;

        let mut found = Vec::new();
        let mut stack = vec![points.handle];
        while let Some(handle) = stack.pop() {
            for child in self.children(handle).into_iter().rev() {
                if child.is_point() {
                    found.push(child.handle);
                }
                stack.push(child.handle);
            }
        }
        Some(found)
    }
}

/// Write access to a host station.
pub trait StationMut: Station {
    fn component_mut(&mut self, handle: Handle) -> Option<&mut Component>;
}

// =============================================================================
// MemoryStation
// =============================================================================

/// Arena-backed station.
#[derive(Debug, Clone)]
pub struct MemoryStation {
    name: String,
    time_zone: String,
    root: Handle,
    next_handle: u64,
    components: HashMap<Handle, Component>,
    by_slot_path: HashMap<String, Handle>,
    histories: Vec<HistoryConfig>,
    network: HashMap<String, Handle>,
}

impl MemoryStation {
    /// Create a station holding only its root component (handle 1).
    pub fn new(name: impl Into<String>, time_zone: impl Into<String>) -> Self {
        let name = name.into();
        let root = Handle(1);
        let mut components = HashMap::new();
        components.insert(
            root,
            Component {
                handle: root,
                name: String::new(),
                display_name: Some(name.clone()),
                type_spec: "baja:Station".to_string(),
                slot_path: "slot:/".to_string(),
                parent: None,
                children: Vec::new(),
                annotation: None,
                body: ComponentBody::Plain,
            },
        );
        let mut by_slot_path = HashMap::new();
        by_slot_path.insert("slot:/".to_string(), root);

        Self {
            name,
            time_zone: time_zone.into(),
            root,
            next_handle: 2,
            components,
            by_slot_path,
            histories: Vec::new(),
            network: HashMap::new(),
        }
    }

    /// Add a component under `parent`. Returns `None` if the parent is
    /// gone, or the requested handle or slot path is taken.
    pub fn add(&mut self, parent: Handle, spec: ComponentSpec) -> Option<Handle> {
        let parent_path = self.components.get(&parent)?.slot_path.clone();
        let slot_path = if parent_path.ends_with('/') {
            format!("{}{}", parent_path, spec.name)
        } else {
            format!("{}/{}", parent_path, spec.name)
        };
        if self.by_slot_path.contains_key(&slot_path) {
            return None;
        }

        let handle = match spec.handle {
            Some(h) if self.components.contains_key(&h) => return None,
            Some(h) => h,
            None => {
                while self.components.contains_key(&Handle(self.next_handle)) {
                    self.next_handle += 1;
                }
                Handle(self.next_handle)
            }
        };
        self.next_handle = self.next_handle.max(handle.0 + 1);

        if let ComponentBody::NiagaraStation { station_name } = &spec.body {
            self.network.insert(station_name.clone(), handle);
        }

        debug!("Adding component {} as {}", slot_path, handle);
        self.by_slot_path.insert(slot_path.clone(), handle);
        self.components.insert(
            handle,
            Component {
                handle,
                name: spec.name,
                display_name: spec.display_name,
                type_spec: spec.type_spec,
                slot_path,
                parent: Some(parent),
                children: Vec::new(),
                annotation: spec.annotation,
                body: spec.body,
            },
        );
        if let Some(p) = self.components.get_mut(&parent) {
            p.children.push(handle);
        }
        Some(handle)
    }

    /// Remove a component and its whole subtree.
    pub fn remove(&mut self, handle: Handle) -> bool {
        let Some(component) = self.components.remove(&handle) else {
            return false;
        };
        self.by_slot_path.remove(&component.slot_path);
        self.network.retain(|_, h| *h != handle);
        if let Some(parent) = component.parent.and_then(|p| self.components.get_mut(&p)) {
            parent.children.retain(|c| *c != handle);
        }
        for child in component.children {
            self.remove(child);
        }
        true
    }

    pub fn set_annotation(&mut self, handle: Handle, annotation: Option<Annotation>) -> bool {
        match self.components.get_mut(&handle) {
            Some(c) => {
                c.annotation = annotation;
                true
            }
            None => false,
        }
    }

    /// Add or replace a history configuration.
    pub fn add_history(&mut self, config: HistoryConfig) {
        match self.histories.iter_mut().find(|h| h.id == config.id) {
            Some(existing) => *existing = config,
            None => self.histories.push(config),
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl Station for MemoryStation {
    fn station_name(&self) -> &str {
        &self.name
    }

    fn time_zone(&self) -> &str {
        &self.time_zone
    }

    fn root(&self) -> Handle {
        self.root
    }

    fn component(&self, handle: Handle) -> Option<&Component> {
        self.components.get(&handle)
    }

    fn resolve_slot_path(&self, slot_path: &str) -> Option<Handle> {
        self.by_slot_path.get(slot_path).copied()
    }

    fn histories(&self) -> Vec<&HistoryConfig> {
        self.histories.iter().collect()
    }

    fn history(&self, id: &HistoryId) -> Option<&HistoryConfig> {
        self.histories.iter().find(|h| &h.id == id)
    }

    fn network_station(&self, station_name: &str) -> Option<Handle> {
        self.network.get(station_name).copied()
    }
}

impl StationMut for MemoryStation {
    fn component_mut(&mut self, handle: Handle) -> Option<&mut Component> {
        self.components.get_mut(&handle)
    }
}

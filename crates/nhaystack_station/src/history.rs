//! History configurations and the historian interface.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::point::{Facets, PointKind, PointValue};

/// History identifier `/<device>/<name>`; the device is the station that
/// recorded the history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HistoryId {
    pub device: String,
    pub name: String,
}

impl HistoryId {
    pub fn new(device: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for HistoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.device, self.name)
    }
}

impl FromStr for HistoryId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix('/')
            .ok_or_else(|| format!("history id must start with '/': {}", s))?;
        match rest.split_once('/') {
            Some((device, name)) if !device.is_empty() && !name.is_empty() => {
                Ok(HistoryId::new(device, name))
            }
            _ => Err(format!("history id must be /<device>/<name>: {}", s)),
        }
    }
}

impl<'de> Deserialize<'de> for HistoryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// How a history's samples are meant to be interpolated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Interval collection, no interpolation hint
    #[default]
    Interval,
    /// Change-of-value collection
    Cov,
}

/// Metadata of one history.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryConfig {
    pub id: HistoryId,
    /// Region id, e.g. "America/New_York"
    pub time_zone: String,
    #[serde(default)]
    pub interpolation: Interpolation,
    /// Ord of the object feeding the history, e.g.
    /// "station:|slot:/Foo/SineWave1/history"
    #[serde(default)]
    pub source: Option<String>,
    /// Kind of the recorded values, when they come from a point
    #[serde(default)]
    pub record_kind: Option<PointKind>,
    #[serde(default)]
    pub facets: Facets,
}

impl HistoryConfig {
    pub fn new(id: HistoryId, time_zone: impl Into<String>) -> Self {
        Self {
            id,
            time_zone: time_zone.into(),
            interpolation: Interpolation::Interval,
            source: None,
            record_kind: None,
            facets: Facets::default(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_record(mut self, kind: PointKind, facets: Facets) -> Self {
        self.record_kind = Some(kind);
        self.facets = facets;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Historian
// ─────────────────────────────────────────────────────────────────────────────

/// One recorded sample.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HisRecord {
    pub timestamp: DateTime<Utc>,
    pub value: PointValue,
}

/// Read access to the historian's stored samples.
pub trait Historian {
    /// Samples of `id` with `start <= timestamp < end`, oldest first.
    fn read(&self, id: &HistoryId, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<HisRecord>;
}

/// Historian holding samples in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistorian {
    records: HashMap<HistoryId, Vec<HisRecord>>,
}

impl MemoryHistorian {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, id: HistoryId, record: HisRecord) {
        let records = self.records.entry(id).or_default();
        let pos = records.partition_point(|r| r.timestamp <= record.timestamp);
        records.insert(pos, record);
    }
}

impl Historian for MemoryHistorian {
    fn read(&self, id: &HistoryId, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<HisRecord> {
        self.records
            .get(id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.timestamp >= start && r.timestamp < end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

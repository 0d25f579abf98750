//! Station fixture loader
//!
//! Builds a [`MemoryStation`] and [`MemoryHistorian`] from a TOML file.
//!
//! ```toml
//! [station]
//! name = "nhaystack_simple"
//! time_zone = "America/New_York"
//!
//! [[components]]
//! path = "slot:/Foo/SineWave1"
//! type = "kitControl:SineWave"
//! handle = 99
//! tags = { foo = "m:" }
//! point = { out = 72.5, facets = { units = "°F" }, writable = true }
//!
//! [[histories]]
//! id = "/nhaystack_simple/SineWave1"
//! time_zone = "America/New_York"
//! interpolation = "cov"
//! source = "station:|slot:/Foo/SineWave1/history"
//! ```

use std::path::Path;

use chrono::{DateTime, Utc};
use haystack_types::Dict;
use serde::Deserialize;
use tracing::info;

use crate::component::{ComponentBody, ComponentSpec, Handle};
use crate::history::{HisRecord, HistoryConfig, HistoryId, MemoryHistorian};
use crate::point::{ControlPoint, Facets, PointValue, ProxyExt, Status};
use crate::station::{MemoryStation, Station};

/// Error type for fixture loading
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("Invalid slot path: {0}")]
    InvalidSlotPath(String),

    #[error("Parent of {0} is not defined before it")]
    MissingParent(String),

    #[error("Duplicate component: {0}")]
    Duplicate(String),

    #[error("Point {0} has an empty status")]
    InvalidStatus(String),
}

#[derive(Debug, Deserialize)]
struct FixtureFile {
    station: StationInfo,
    #[serde(default)]
    components: Vec<ComponentDef>,
    #[serde(default)]
    histories: Vec<HistoryConfig>,
    #[serde(default)]
    records: Vec<RecordDef>,
}

#[derive(Debug, Deserialize)]
struct StationInfo {
    name: String,
    #[serde(default = "default_time_zone")]
    time_zone: String,
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

#[derive(Debug, Deserialize)]
struct ComponentDef {
    path: String,
    #[serde(rename = "type", default = "default_type")]
    type_spec: String,
    handle: Option<u64>,
    display_name: Option<String>,
    tags: Option<Dict>,
    #[serde(default)]
    tags_complete: bool,
    point: Option<PointDef>,
    history_ext: Option<HistoryId>,
    niagara_station: Option<String>,
}

fn default_type() -> String {
    "baja:Component".to_string()
}

#[derive(Debug, Deserialize)]
struct PointDef {
    out: Option<PointValue>,
    #[serde(default)]
    status: Status,
    #[serde(default)]
    facets: Facets,
    #[serde(default)]
    writable: bool,
    /// Slot path on the peer station, for Niagara proxy points
    proxy_point_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordDef {
    history: HistoryId,
    timestamp: DateTime<Utc>,
    value: PointValue,
}

/// A loaded fixture: the station plus its historian.
#[derive(Debug, Clone)]
pub struct StationFixture {
    pub station: MemoryStation,
    pub historian: MemoryHistorian,
}

impl StationFixture {
    /// Load a fixture from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        info!("Loading station fixture from: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, LoadError> {
        let file: FixtureFile = toml::from_str(content)?;
        let mut station = MemoryStation::new(file.station.name, file.station.time_zone);

        for def in file.components {
            let (parent_path, name) = split_slot_path(&def.path)?;
            let parent = station
                .resolve_slot_path(&parent_path)
                .ok_or_else(|| LoadError::MissingParent(def.path.clone()))?;
            let path = def.path.clone();
            let spec = def.into_spec(name)?;
            station.add(parent, spec).ok_or(LoadError::Duplicate(path))?;
        }

        let history_count = file.histories.len();
        for history in file.histories {
            station.add_history(history);
        }

        let mut historian = MemoryHistorian::new();
        for record in file.records {
            historian.append(
                record.history,
                HisRecord {
                    timestamp: record.timestamp,
                    value: record.value,
                },
            );
        }

        info!(
            "Loaded station {} ({} components, {} histories)",
            station.station_name(),
            station.len(),
            history_count
        );
        Ok(Self { station, historian })
    }
}

impl ComponentDef {
    fn into_spec(self, name: String) -> Result<ComponentSpec, LoadError> {
        let mut spec = ComponentSpec::new(name, self.type_spec);
        spec.handle = self.handle.map(Handle);
        spec.display_name = self.display_name;
        if let Some(tags) = self.tags {
            spec = if self.tags_complete {
                spec.complete_tags(tags)
            } else {
                spec.tags(tags)
            };
        }

        if let Some(def) = self.point {
            // Every projected point needs at least one status flag.
            if def.status.is_empty() {
                return Err(LoadError::InvalidStatus(self.path));
            }
            let mut point = ControlPoint {
                out: def.out,
                status: def.status,
                facets: def.facets,
                writable: None,
                proxy: def.proxy_point_id.map(|point_id| ProxyExt::Niagara { point_id }),
            };
            if def.writable {
                point = point.writable();
            }
            spec.body = ComponentBody::Point(point);
        } else if let Some(history) = self.history_ext {
            spec.body = ComponentBody::HistoryExt { history };
        } else if let Some(station_name) = self.niagara_station {
            spec.body = ComponentBody::NiagaraStation { station_name };
        }
        Ok(spec)
    }
}

/// Split "slot:/a/b/c" into ("slot:/a/b", "c").
fn split_slot_path(path: &str) -> Result<(String, String), LoadError> {
    let rest = path
        .strip_prefix("slot:/")
        .filter(|rest| !rest.is_empty() && !rest.ends_with('/'))
        .ok_or_else(|| LoadError::InvalidSlotPath(path.to_string()))?;
    match rest.rsplit_once('/') {
        Some((parent, name)) => Ok((format!("slot:/{}", parent), name.to_string())),
        None => Ok(("slot:/".to_string(), rest.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{Historian, Interpolation};
    use crate::point::PointKind;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FIXTURE: &str = r#"
[station]
name = "nhaystack_simple"
time_zone = "America/New_York"

[[components]]
path = "slot:/Foo"
type = "baja:Folder"
tags = { equip = "m:" }

[[components]]
path = "slot:/Foo/SineWave1"
type = "kitControl:SineWave"
handle = 99
point = { out = 42.0, status = "OK | STALE", facets = { units = "°F" }, writable = true }

[[components]]
path = "slot:/Foo/SineWave1/history"
type = "history:NumericCovHistoryExt"
history_ext = "/nhaystack_simple/SineWave1"

[[histories]]
id = "/nhaystack_simple/SineWave1"
time_zone = "America/New_York"
interpolation = "cov"
source = "station:|slot:/Foo/SineWave1/history"
record_kind = "numeric"

[[records]]
history = "/nhaystack_simple/SineWave1"
timestamp = "2024-01-01T00:00:00Z"
value = 1.5
"#;

    #[test]
    fn test_load_fixture() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();

        let fixture = StationFixture::load(file.path()).unwrap();
        let st = &fixture.station;
        assert_eq!(st.station_name(), "nhaystack_simple");

        let sw = st.resolve_slot_path("slot:/Foo/SineWave1").unwrap();
        assert_eq!(sw, Handle(99));
        let point = st.component(sw).unwrap().as_point().unwrap();
        assert_eq!(point.kind(), PointKind::Numeric);
        assert!(point.is_writable());
        assert!(point.status.contains(Status::STALE));
        assert_eq!(point.facets.units.as_deref(), Some("°F"));

        let foo = st.resolve_slot_path("slot:/Foo").unwrap();
        assert!(st.component(foo).unwrap().tags().unwrap().has("equip"));

        let id = HistoryId::new("nhaystack_simple", "SineWave1");
        assert_eq!(st.history(&id).unwrap().interpolation, Interpolation::Cov);

        let start = Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(fixture.historian.read(&id, start, end).len(), 1);
    }

    #[test]
    fn test_missing_parent() {
        let err = StationFixture::from_toml_str(
            r#"
[station]
name = "s"

[[components]]
path = "slot:/Nope/Child"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::MissingParent(p) if p == "slot:/Nope/Child"));
    }

    #[test]
    fn test_empty_status_is_rejected() {
        let err = StationFixture::from_toml_str(
            r#"
[station]
name = "s"

[[components]]
path = "slot:/Broken"
point = { out = 1.0, status = "" }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::InvalidStatus(p) if p == "slot:/Broken"));
    }

    #[test]
    fn test_split_slot_path() {
        assert_eq!(
            split_slot_path("slot:/Foo").unwrap(),
            ("slot:/".to_string(), "Foo".to_string())
        );
        assert_eq!(
            split_slot_path("slot:/Foo/Bar/Baz").unwrap(),
            ("slot:/Foo/Bar".to_string(), "Baz".to_string())
        );
        assert!(split_slot_path("slot:/").is_err());
        assert!(split_slot_path("Foo/Bar").is_err());
    }
}

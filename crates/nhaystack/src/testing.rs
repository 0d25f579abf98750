//! Shared test station
//!
//! ```text
//! slot:/
//! ├── Foo
//! │   ├── SineWave1 (99)  numeric °F, foo/bar tags, cov history
//! │   ├── SineWave2 (104) numeric psi
//! │   └── comp (188)      plain component tagged `point`
//! ├── Site (200)          site
//! ├── AHU1 (201)          equip, siteRef → Site
//! │   ├── SAT             numeric writable °F
//! │   ├── Fan             boolean writable, interval history
//! │   ├── Mode            enum writable
//! │   └── Note            string, stale
//! ├── Services
//! │   └── AuditHistoryService
//! └── Drivers/NiagaraNetwork/remote1/points/OAT   proxy of slot:/Outside/OAT
//! ```

use chrono::{DateTime, TimeZone, Utc};
use haystack_types::Dict;
use nhaystack_station::{
    ComponentBody, ComponentSpec, ControlPoint, EnumValue, Facets, Handle, HisRecord,
    HistoryConfig, HistoryId, Interpolation, MemoryHistorian, MemoryStation, PointKind,
    PointValue, ProxyExt, Station, Status,
};

use crate::config::HaystackConfig;
use crate::context::Context;
use crate::ids::IdentityMap;

pub const STATION: &str = "nhaystack_simple";
pub const TZ: &str = "America/New_York";

pub struct SimpleStation {
    pub station: MemoryStation,
    pub historian: MemoryHistorian,
    pub foo: Handle,
    pub sine1: Handle,
    pub sine2: Handle,
    pub comp: Handle,
    pub site: Handle,
    pub ahu: Handle,
    pub sat: Handle,
    pub fan: Handle,
    pub mode: Handle,
    pub note: Handle,
    pub audit_service: Handle,
    pub oat_proxy: Handle,
}

fn markers(names: &[&str]) -> Dict {
    let mut dict = Dict::new();
    for name in names {
        dict.add_marker(*name);
    }
    dict
}

pub fn ts(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
}

impl SimpleStation {
    pub fn new() -> Self {
        let ids = IdentityMap::new(STATION);
        let mut st = MemoryStation::new(STATION, TZ);
        let root = st.root();

        let foo = st.add(root, ComponentSpec::new("Foo", "baja:Folder").handle(3)).unwrap();
        let sine1 = st
            .add(
                foo,
                ComponentSpec::point(
                    "SineWave1",
                    "kitControl:SineWave",
                    ControlPoint::new(PointValue::Numeric(42.0)).with_facets(Facets {
                        units: Some("°F".to_string()),
                        ..Facets::default()
                    }),
                )
                .handle(99)
                .tags(markers(&["foo", "bar"])),
            )
            .unwrap();
        st.add(
            sine1,
            ComponentSpec::new("history", "history:NumericCovHistoryExt").body(
                ComponentBody::HistoryExt {
                    history: HistoryId::new(STATION, "SineWave1"),
                },
            ),
        )
        .unwrap();
        let sine2 = st
            .add(
                foo,
                ComponentSpec::point(
                    "SineWave2",
                    "kitControl:SineWave",
                    ControlPoint::new(PointValue::Numeric(17.0)).with_facets(Facets {
                        units: Some("psi".to_string()),
                        ..Facets::default()
                    }),
                )
                .handle(104),
            )
            .unwrap();
        let comp = st
            .add(
                foo,
                ComponentSpec::new("comp", "baja:Component")
                    .handle(188)
                    .tags(markers(&["point"])),
            )
            .unwrap();

        let mut site_tags = markers(&["site"]);
        site_tags.add("dis", "HQ");
        let site = st
            .add(root, ComponentSpec::new("Site", "baja:Folder").handle(200).tags(site_tags))
            .unwrap();

        let mut ahu_tags = markers(&["equip", "ahu"]);
        ahu_tags.add("siteRef", ids.component_ref(site));
        let ahu = st
            .add(root, ComponentSpec::new("AHU1", "baja:Folder").handle(201).tags(ahu_tags))
            .unwrap();
        let sat = st
            .add(
                ahu,
                ComponentSpec::point(
                    "SAT",
                    "control:NumericWritable",
                    ControlPoint::new(PointValue::Numeric(55.0))
                        .with_facets(Facets {
                            units: Some("°F".to_string()),
                            ..Facets::default()
                        })
                        .writable(),
                ),
            )
            .unwrap();
        let fan_facets = Facets {
            true_text: Some("On".to_string()),
            false_text: Some("Off".to_string()),
            ..Facets::default()
        };
        let fan = st
            .add(
                ahu,
                ComponentSpec::point(
                    "Fan",
                    "control:BooleanWritable",
                    ControlPoint::new(PointValue::Boolean(false))
                        .with_facets(fan_facets.clone())
                        .writable(),
                ),
            )
            .unwrap();
        st.add(
            fan,
            ComponentSpec::new("history", "history:BooleanIntervalHistoryExt").body(
                ComponentBody::HistoryExt {
                    history: HistoryId::new(STATION, "Fan"),
                },
            ),
        )
        .unwrap();
        let mode = st
            .add(
                ahu,
                ComponentSpec::point(
                    "Mode",
                    "control:EnumWritable",
                    ControlPoint::new(PointValue::Enum(EnumValue {
                        ordinal: 1,
                        tag: "occupied".to_string(),
                    }))
                    .with_facets(Facets {
                        range: vec![
                            "unoccupied".to_string(),
                            "occupied".to_string(),
                            "standby".to_string(),
                        ],
                        ..Facets::default()
                    })
                    .writable(),
                ),
            )
            .unwrap();
        let note = st
            .add(
                ahu,
                ComponentSpec::point(
                    "Note",
                    "control:StringPoint",
                    ControlPoint::new(PointValue::Str("filter due".to_string()))
                        .with_status(Status::STALE),
                ),
            )
            .unwrap();

        let services = st.add(root, ComponentSpec::new("Services", "baja:ServiceContainer")).unwrap();
        let audit_service = st
            .add(services, ComponentSpec::new("AuditHistoryService", "history:AuditHistoryService"))
            .unwrap();

        let drivers = st.add(root, ComponentSpec::new("Drivers", "driver:DriverContainer")).unwrap();
        let network = st
            .add(drivers, ComponentSpec::new("NiagaraNetwork", "niagaraDriver:NiagaraNetwork"))
            .unwrap();
        let remote1 = st
            .add(
                network,
                ComponentSpec::new("remote1", "niagaraDriver:NiagaraStation").body(
                    ComponentBody::NiagaraStation {
                        station_name: "remote1".to_string(),
                    },
                ),
            )
            .unwrap();
        let points = st
            .add(remote1, ComponentSpec::new("points", "niagaraDriver:NiagaraPointDeviceExt"))
            .unwrap();
        let oat_proxy = st
            .add(
                points,
                ComponentSpec::point(
                    "OAT",
                    "control:NumericPoint",
                    ControlPoint::new(PointValue::Numeric(61.0)).with_proxy(ProxyExt::Niagara {
                        point_id: "slot:/Outside/OAT".to_string(),
                    }),
                ),
            )
            .unwrap();

        st.add_history(
            HistoryConfig::new(HistoryId::new(STATION, "AuditHistory"), TZ)
                .with_source("station:|slot:/Services/AuditHistoryService"),
        );
        st.add_history(HistoryConfig::new(HistoryId::new(STATION, "LogHistory"), TZ));
        st.add_history(
            HistoryConfig::new(HistoryId::new(STATION, "SineWave1"), TZ)
                .with_interpolation(Interpolation::Cov)
                .with_source("station:|slot:/Foo/SineWave1/history")
                .with_record(
                    PointKind::Numeric,
                    Facets {
                        units: Some("°F".to_string()),
                        ..Facets::default()
                    },
                ),
        );
        st.add_history(
            HistoryConfig::new(HistoryId::new(STATION, "Fan"), TZ)
                .with_source("station:|slot:/AHU1/Fan/history")
                .with_record(PointKind::Boolean, fan_facets),
        );
        st.add_history(
            HistoryConfig::new(HistoryId::new("remote1", "OAT"), "America/Chicago")
                .with_source("station:|slot:/Outside/OAT/history")
                .with_record(PointKind::Numeric, Facets::default()),
        );
        st.add_history(
            HistoryConfig::new(HistoryId::new("remote1", "RAT"), "America/Chicago")
                .with_source("station:|slot:/Outside/RAT/history"),
        );

        let mut historian = MemoryHistorian::new();
        for (day, hour, val) in [(1, 0, 40.0), (1, 12, 45.5), (2, 0, 41.0)] {
            historian.append(
                HistoryId::new(STATION, "SineWave1"),
                HisRecord {
                    timestamp: ts(day, hour),
                    value: PointValue::Numeric(val),
                },
            );
        }
        historian.append(
            HistoryId::new(STATION, "Fan"),
            HisRecord {
                timestamp: ts(1, 6),
                value: PointValue::Boolean(true),
            },
        );
        historian.append(
            HistoryId::new(STATION, "LogHistory"),
            HisRecord {
                timestamp: ts(1, 3),
                value: PointValue::Str("station started".to_string()),
            },
        );

        Self {
            station: st,
            historian,
            foo,
            sine1,
            sine2,
            comp,
            site,
            ahu,
            sat,
            fan,
            mode,
            note,
            audit_service,
            oat_proxy,
        }
    }

    pub fn history(&self, device: &str, name: &str) -> &HistoryConfig {
        self.station.history(&HistoryId::new(device, name)).unwrap()
    }
}

/// Owned pieces a [`Context`] borrows from.
pub struct Env {
    pub config: HaystackConfig,
    pub ids: IdentityMap,
}

impl Env {
    pub fn new(config: HaystackConfig) -> Self {
        Self {
            config,
            ids: IdentityMap::new(STATION),
        }
    }

    pub fn ctx<'a>(&'a self, station: &'a MemoryStation) -> Context<'a, MemoryStation> {
        Context::new(station, &self.config, &self.ids)
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new(HaystackConfig::default())
    }
}

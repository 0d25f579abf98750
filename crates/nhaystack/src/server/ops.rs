//! Haystack protocol operations.
//!
//! [`HaystackServer`] holds what outlives a single request (configuration,
//! identity map, boot time) and answers each op against a station borrowed
//! for the duration of the call. Responses are [`Grid`]s; encoding them on
//! the wire is left to the transport.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use haystack_types::{Dict, Grid, Ref, Value};
use nhaystack_station::{Historian, HistoryConfig, Station, StationMut};
use tracing::{debug, info};

use crate::config::HaystackConfig;
use crate::context::Context;
use crate::correlate;
use crate::error::{HaystackError, Result};
use crate::filter::Filter;
use crate::ids::{IdentityMap, Resolved};
use crate::iter::{SpaceCursor, SpaceIterator};
use crate::nav::{self, NavNode};
use crate::tags;
use crate::write;

/// One decoded protocol request.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    About,
    Ops,
    Formats,
    Read {
        filter: String,
        limit: Option<usize>,
    },
    ReadById {
        ids: Vec<Ref>,
    },
    Nav {
        nav_id: Option<String>,
    },
    HisRead {
        id: Ref,
        range: String,
    },
    PointWrite {
        id: Ref,
        /// `None` reads the priority array instead of writing
        level: Option<i64>,
        val: Option<Value>,
        who: Option<String>,
    },
}

/// Ops listed by the `ops` op.
const OPS: [(&str, &str); 7] = [
    ("about", "Summary information for server"),
    ("ops", "Operations supported by this server"),
    ("formats", "Grid data formats supported by this server"),
    ("read", "Read entity records in database"),
    ("nav", "Navigate record tree"),
    ("hisRead", "Read time series from historian"),
    ("pointWrite", "Read/write writable point priority array"),
];

const FORMATS: [&str; 3] = ["text/plain", "text/zinc", "application/json"];

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::About => "about",
            Op::Ops => "ops",
            Op::Formats => "formats",
            Op::Read { .. } => "read",
            Op::ReadById { .. } => "readById",
            Op::Nav { .. } => "nav",
            Op::HisRead { .. } => "hisRead",
            Op::PointWrite { .. } => "pointWrite",
        }
    }

    /// Decode an op from its name and request grid rows.
    ///
    /// `read` with `id` columns is a read by id; `readAll` is accepted as a
    /// filter read.
    pub fn from_request(name: &str, rows: &[Dict]) -> Result<Self> {
        let first = rows.first();
        let missing = |arg: &str| HaystackError::MissingArg {
            op: name.to_string(),
            arg: arg.to_string(),
        };
        let str_arg = |arg: &str| first.and_then(|r| r.get_str(arg)).map(str::to_string);
        let ref_arg = |arg: &str| first.and_then(|r| r.get_ref(arg)).cloned();

        match name {
            "about" => Ok(Op::About),
            "ops" => Ok(Op::Ops),
            "formats" => Ok(Op::Formats),
            "read" | "readAll" | "readById" => {
                let ids: Vec<Ref> = rows.iter().filter_map(|r| r.get_ref("id")).cloned().collect();
                if name != "readAll" && !ids.is_empty() {
                    return Ok(Op::ReadById { ids });
                }
                if name == "readById" {
                    return Err(missing("id"));
                }
                let filter = str_arg("filter").ok_or_else(|| missing("filter"))?;
                let limit = first
                    .and_then(|r| r.get_number("limit"))
                    .filter(|n| n.val >= 0.0)
                    .map(|n| n.val as usize);
                Ok(Op::Read { filter, limit })
            }
            "nav" => Ok(Op::Nav {
                nav_id: str_arg("navId"),
            }),
            "hisRead" => Ok(Op::HisRead {
                id: ref_arg("id").ok_or_else(|| missing("id"))?,
                range: str_arg("range").ok_or_else(|| missing("range"))?,
            }),
            "pointWrite" => Ok(Op::PointWrite {
                id: ref_arg("id").ok_or_else(|| missing("id"))?,
                level: first
                    .and_then(|r| r.get_number("level"))
                    .map(|n| n.val as i64),
                val: first.and_then(|r| r.get("val")).cloned(),
                who: str_arg("who"),
            }),
            other => Err(HaystackError::UnknownOp(other.to_string())),
        }
    }
}

/// Protocol front of one station.
#[derive(Debug)]
pub struct HaystackServer {
    config: HaystackConfig,
    ids: IdentityMap,
    boot_time: DateTime<Utc>,
}

impl HaystackServer {
    pub fn new(station_name: impl Into<String>, config: HaystackConfig) -> Self {
        Self {
            config,
            ids: IdentityMap::new(station_name),
            boot_time: Utc::now(),
        }
    }

    pub fn config(&self) -> &HaystackConfig {
        &self.config
    }

    pub fn ids(&self) -> &IdentityMap {
        &self.ids
    }

    pub fn context<'a, S: Station + ?Sized>(&'a self, station: &'a S) -> Context<'a, S> {
        Context::new(station, &self.config, &self.ids)
    }

    /// Run any op. Only `pointWrite` mutates the station.
    pub fn execute<S, H>(&self, station: &mut S, historian: &H, op: Op) -> Result<Grid>
    where
        S: StationMut + ?Sized,
        H: Historian + ?Sized,
    {
        debug!("Executing {}", op.name());
        match op {
            Op::About => Ok(self.about(&*station)),
            Op::Ops => Ok(self.ops()),
            Op::Formats => Ok(self.formats()),
            Op::Read { filter, limit } => {
                let filter = Filter::parse(&filter)?;
                Ok(self.read(&*station, &filter, limit))
            }
            Op::ReadById { ids } => self.read_by_ids(&*station, &ids),
            Op::Nav { nav_id } => self.nav(&*station, nav_id.as_deref()),
            Op::HisRead { id, range } => self.his_read(&*station, historian, &id, &range),
            Op::PointWrite {
                id,
                level,
                val,
                who,
            } => self.point_write(station, &id, level, val.as_ref(), who.as_deref()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Server info
    // ─────────────────────────────────────────────────────────────────────────

    pub fn about<S: Station + ?Sized>(&self, station: &S) -> Grid {
        let tz = tags::haystack_tz(station.time_zone());
        let mut row = Dict::new();
        row.add("haystackVersion", self.config.haystack_version.as_str())
            .add("tz", tz)
            .add("serverName", station.station_name())
            .add("serverTime", date_time(Utc::now(), tz))
            .add("serverBootTime", date_time(self.boot_time, tz))
            .add("productName", self.config.product_name.as_str())
            .add("productVersion", env!("CARGO_PKG_VERSION"));
        Grid::from_dicts(vec![row])
    }

    pub fn ops(&self) -> Grid {
        let rows = OPS
            .iter()
            .map(|(name, summary)| {
                let mut row = Dict::new();
                row.add("name", *name).add("summary", *summary);
                row
            })
            .collect();
        Grid::from_dicts(rows)
    }

    pub fn formats(&self) -> Grid {
        let rows = FORMATS
            .iter()
            .map(|mime| {
                let mut row = Dict::new();
                row.add("mime", *mime).add_marker("read").add_marker("write");
                row
            })
            .collect();
        Grid::from_dicts(rows)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Every visible entity matching `filter`, up to `limit`.
    pub fn read<S: Station + ?Sized>(
        &self,
        station: &S,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Grid {
        let rows = SpaceIterator::new(self.context(station))
            .filter(|(_, dict)| filter.matches(dict))
            .map(|(_, dict)| dict)
            .take(limit.unwrap_or(usize::MAX))
            .collect();
        Grid::from_dicts(rows)
    }

    /// Visit up to `page_size` more entities of a full-space read and keep
    /// those matching `filter`. The returned cursor resumes the walk.
    pub fn read_page<S: Station + ?Sized>(
        &self,
        station: &S,
        filter: &Filter,
        cursor: SpaceCursor,
    ) -> (Vec<Dict>, SpaceCursor) {
        let mut iter = SpaceIterator::resume(self.context(station), cursor);
        let rows = iter
            .next_page(self.config.page_size.max(1))
            .into_iter()
            .filter(|(_, dict)| filter.matches(dict))
            .map(|(_, dict)| dict)
            .collect();
        (rows, iter.into_cursor())
    }

    /// Tags of each referenced entity; any unknown or hidden ref fails the
    /// whole request.
    pub fn read_by_ids<S: Station + ?Sized>(&self, station: &S, ids: &[Ref]) -> Result<Grid> {
        let ctx = self.context(station);
        let rows = ids
            .iter()
            .map(|id| self.read_by_id(ctx, id))
            .collect::<Result<Vec<_>>>()?;
        Ok(Grid::from_dicts(rows))
    }

    fn read_by_id<S: Station + ?Sized>(&self, ctx: Context<'_, S>, id: &Ref) -> Result<Dict> {
        match self.ids.resolve(ctx.station, id)? {
            Resolved::Component(comp) if tags::is_visible(comp) => Ok(tags::project(ctx, comp)),
            Resolved::History(cfg) => {
                let paired = correlate::paired_point(ctx, cfg);
                if tags::is_visible_history(self.config.show_linked_histories, paired) {
                    Ok(tags::project_history(ctx, cfg, paired))
                } else {
                    Err(HaystackError::UnknownRecord(id.val.clone()))
                }
            }
            Resolved::Component(_) => Err(HaystackError::UnknownRecord(id.val.clone())),
        }
    }

    pub fn nav<S: Station + ?Sized>(&self, station: &S, nav_id: Option<&str>) -> Result<Grid> {
        let ctx = self.context(station);
        let nodes = match nav_id {
            None => nav::roots(ctx),
            Some(nav_id) => nav::children(ctx, nav_id)?,
        };
        Ok(Grid::from_dicts(nodes.iter().map(NavNode::to_dict).collect()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // History
    // ─────────────────────────────────────────────────────────────────────────

    pub fn his_read<S, H>(&self, station: &S, historian: &H, id: &Ref, range: &str) -> Result<Grid>
    where
        S: Station + ?Sized,
        H: Historian + ?Sized,
    {
        self.his_read_at(station, historian, id, range, Utc::now().date_naive())
    }

    /// `hisRead` with an explicit current date for the relative ranges.
    ///
    /// `id` names a history, or a point whose paired history is read.
    pub fn his_read_at<S, H>(
        &self,
        station: &S,
        historian: &H,
        id: &Ref,
        range: &str,
        today: NaiveDate,
    ) -> Result<Grid>
    where
        S: Station + ?Sized,
        H: Historian + ?Sized,
    {
        let cfg = self.history_of(self.context(station), id)?;
        let (start, end) = parse_range(range, today)?;
        let tz = tags::haystack_tz(&cfg.time_zone);

        let records = historian.read(&cfg.id, start, end);
        debug!("Read {} samples of {} for {}", records.len(), cfg.id, range);
        let units = cfg.facets.units.as_deref();
        let rows = records
            .iter()
            .map(|record| {
                let mut row = Dict::new();
                row.add("ts", date_time(record.timestamp, tz))
                    .add("val", tags::to_value(&record.value, units));
                row
            })
            .collect();

        let mut meta = Dict::new();
        meta.add("id", id.clone())
            .add("hisStart", date_time(start, tz))
            .add("hisEnd", date_time(end, tz));
        let mut grid = Grid::from_dicts(rows).with_meta(meta);
        grid.cols = vec!["ts".to_string(), "val".to_string()];
        Ok(grid)
    }

    fn history_of<'a, S: Station + ?Sized>(
        &self,
        ctx: Context<'a, S>,
        id: &Ref,
    ) -> Result<&'a HistoryConfig> {
        match self.ids.resolve(ctx.station, id)? {
            Resolved::History(cfg) => Ok(cfg),
            Resolved::Component(comp) => correlate::history_for_point(ctx, comp)
                .ok_or_else(|| HaystackError::NoHistory(id.val.clone())),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Write one priority level, or return the priority array when `level`
    /// is `None`.
    pub fn point_write<S: StationMut + ?Sized>(
        &self,
        station: &mut S,
        id: &Ref,
        level: Option<i64>,
        val: Option<&Value>,
        who: Option<&str>,
    ) -> Result<Grid> {
        let handle = match self.ids.resolve(&*station, id)? {
            Resolved::Component(comp) => comp.handle,
            Resolved::History(_) => return Err(HaystackError::NotWritable(id.val.clone())),
        };
        let comp = station
            .component_mut(handle)
            .ok_or_else(|| HaystackError::UnknownRecord(id.val.clone()))?;

        let Some(level) = level else {
            return write::priority_array_grid(comp);
        };
        let level = write::write_priority_level(comp, level, val)?;
        match val {
            Some(val) => info!(
                "{} wrote {} to {} of {}",
                who.unwrap_or("unknown"),
                val,
                level,
                comp.slot_path
            ),
            None => info!(
                "{} cleared {} of {}",
                who.unwrap_or("unknown"),
                level,
                comp.slot_path
            ),
        }
        Ok(Grid::empty())
    }
}

fn date_time(ts: DateTime<Utc>, tz: &str) -> Value {
    Value::DateTime {
        ts,
        tz: tz.to_string(),
    }
}

/// `today`, `yesterday`, `YYYY-MM-DD` or `YYYY-MM-DD,YYYY-MM-DD`, as UTC
/// instants `[start, end)` where `end` is midnight after the last day.
fn parse_range(range: &str, today: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let invalid = || HaystackError::InvalidRange(range.to_string());
    let parse_date =
        |s: &str| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| invalid());

    let (first, last) = match range.trim() {
        "today" => (today, today),
        "yesterday" => {
            let day = today.pred_opt().ok_or_else(invalid)?;
            (day, day)
        }
        other => match other.split_once(',') {
            Some((start, end)) => (parse_date(start)?, parse_date(end)?),
            None => {
                let day = parse_date(other)?;
                (day, day)
            }
        },
    };
    if last < first {
        return Err(invalid());
    }
    let end = last.succ_opt().ok_or_else(invalid)?;
    Ok((midnight(first), midnight(end)))
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

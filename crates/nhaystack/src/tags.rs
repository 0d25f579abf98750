//! Tag projection of components and histories.
//!
//! A component annotated with a complete tag set is published exactly as
//! annotated. Everything else gets auto-generated tags layered over its
//! partial annotation; annotation tags win wherever a derived tag would
//! overlap them, except for `id`, `axType` and `axSlotPath`, which always
//! reflect the live component.

use haystack_types::{Dict, Value};
use nhaystack_station::{
    Annotation, Component, ControlPoint, EnumValue, Facets, HistoryConfig, Interpolation,
    PointKind, PointValue, Station, Status,
};
use tracing::debug;

use crate::context::Context;
use crate::correlate;
use crate::ids::Resolved;

pub const HISTORY_TYPE: &str = "history:HistoryConfig";

/// Whether a component is published as a Haystack entity.
pub fn is_visible(comp: &Component) -> bool {
    comp.annotation.is_some() || comp.is_point()
}

/// Whether a history is listed in the history space.
pub fn is_visible_history(show_linked: bool, paired: Option<&Component>) -> bool {
    paired.is_none() || show_linked
}

/// Haystack time zone name for a host region id: its last segment.
pub fn haystack_tz(region: &str) -> &str {
    region.rsplit('/').next().unwrap_or(region)
}

// ─────────────────────────────────────────────────────────────────────────────
// Components
// ─────────────────────────────────────────────────────────────────────────────

/// Build the tag dictionary of a component. Never fails.
pub fn project<S: Station + ?Sized>(ctx: Context<'_, S>, comp: &Component) -> Dict {
    project_with(ctx, comp, |point| correlate::history_for_point(ctx, point))
}

/// [`project`] with the point's history found by `history_of`, which is
/// only called for points.
pub fn project_with<'a, S, F>(ctx: Context<'a, S>, comp: &Component, history_of: F) -> Dict
where
    S: Station + ?Sized,
    F: FnOnce(&Component) -> Option<&'a HistoryConfig>,
{
    let annotation = match &comp.annotation {
        Some(Annotation::Complete(tags)) => return tags.clone(),
        Some(Annotation::Partial(tags)) => tags.clone(),
        None => Dict::new(),
    };

    let mut dict = annotation.clone();
    dict.add("id", ctx.ids.component_ref(comp.handle));
    if let Some(dis) = comp.display() {
        dict.add_missing("dis", dis);
    }
    dict.add("axType", comp.type_spec.as_str());
    dict.add("axSlotPath", comp.slot_path.as_str());

    if let Some(point) = comp.as_point() {
        add_point_tags(ctx, comp, point, history_of(comp), &annotation, &mut dict);
    }
    dict
}

fn add_point_tags<S: Station + ?Sized>(
    ctx: Context<'_, S>,
    comp: &Component,
    point: &ControlPoint,
    history: Option<&HistoryConfig>,
    annotation: &Dict,
    dict: &mut Dict,
) {
    dict.add_marker("point");

    if let Some(history) = history {
        dict.add_marker("his");
        if ctx.config.show_linked_histories {
            dict.add("axHistoryRef", ctx.ids.history_ref(&history.id));
        }
        dict.add_missing("tz", haystack_tz(&history.time_zone));
        if history.interpolation == Interpolation::Cov {
            dict.add_missing("hisInterpolate", "cov");
        }
    }

    let view = KindView::of(point);
    add_kind_tags(view.kind(), &point.facets, dict);

    dict.add_marker("cur");
    if point.is_writable() {
        dict.add_marker("writable");
    }
    if let Some(cur) = view.cur_val(annotation, &point.facets) {
        dict.add("curVal", cur);
        dict.add("curStatus", status_string(point.status));
    }

    add_equip_linkage(ctx, comp, annotation, dict);
}

fn add_equip_linkage<S: Station + ?Sized>(
    ctx: Context<'_, S>,
    comp: &Component,
    annotation: &Dict,
    dict: &mut Dict,
) {
    // An annotated equipRef is never replaced, whatever its kind.
    let equip = match annotation.get("equipRef") {
        Some(Value::Ref(equip_ref)) => match ctx.ids.resolve(ctx.station, equip_ref) {
            Ok(Resolved::Component(equip)) => Some(equip),
            _ => {
                debug!("equipRef {} of {} does not resolve", equip_ref, comp.slot_path);
                None
            }
        },
        Some(_) => None,
        None => {
            let equip = ctx
                .ids
                .implicit_equip(ctx.station, comp.handle)
                .and_then(|h| ctx.station.component(h));
            if let Some(equip) = equip {
                dict.add("equipRef", ctx.ids.component_ref(equip.handle));
            }
            equip
        }
    };

    if let Some(site_ref) = equip.and_then(Component::tags).and_then(|t| t.get("siteRef")) {
        dict.add_missing("siteRef", site_ref.clone());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Point kinds
// ─────────────────────────────────────────────────────────────────────────────

/// A point's current output, resolved once by kind.
enum KindView<'p> {
    Numeric(f64),
    Boolean(bool),
    Enum(&'p EnumValue),
    Str(&'p str),
    Unsupported,
}

impl<'p> KindView<'p> {
    fn of(point: &'p ControlPoint) -> Self {
        match &point.out {
            Some(PointValue::Numeric(v)) => KindView::Numeric(*v),
            Some(PointValue::Boolean(b)) => KindView::Boolean(*b),
            Some(PointValue::Enum(e)) => KindView::Enum(e),
            Some(PointValue::Str(s)) => KindView::Str(s),
            None => KindView::Unsupported,
        }
    }

    fn kind(&self) -> PointKind {
        match self {
            KindView::Numeric(_) => PointKind::Numeric,
            KindView::Boolean(_) => PointKind::Boolean,
            KindView::Enum(_) => PointKind::Enum,
            KindView::Str(_) => PointKind::Str,
            KindView::Unsupported => PointKind::Unsupported,
        }
    }

    /// `curVal`; a numeric unit comes from the `unit` tag, else the facets.
    fn cur_val(&self, annotation: &Dict, facets: &Facets) -> Option<Value> {
        match self {
            KindView::Numeric(v) => {
                let unit = match annotation.get("unit") {
                    Some(Value::Str(unit)) => Some(unit.clone()),
                    Some(other) => Some(other.to_string()),
                    None => facets.units.clone(),
                };
                Some(match unit {
                    Some(unit) => Value::num_unit(*v, unit),
                    None => Value::num(*v),
                })
            }
            KindView::Boolean(b) => Some(Value::Bool(*b)),
            KindView::Enum(e) => Some(Value::str(e.tag.as_str())),
            KindView::Str(s) => Some(Value::str(*s)),
            KindView::Unsupported => None,
        }
    }
}

/// `kind` plus its descriptive tags, each only when not yet present.
fn add_kind_tags(kind: PointKind, facets: &Facets, dict: &mut Dict) {
    match kind {
        PointKind::Numeric => {
            dict.add_missing("kind", "Number");
            if let Some(units) = &facets.units {
                dict.add_missing("unit", units.as_str());
            }
        }
        PointKind::Boolean => {
            dict.add_missing("kind", "Bool");
            let range = format!(
                "{},{}",
                facets.false_text.as_deref().unwrap_or("false"),
                facets.true_text.as_deref().unwrap_or("true")
            );
            dict.add_missing("enum", range);
        }
        PointKind::Enum => {
            dict.add_missing("kind", "Str");
            if !facets.range.is_empty() {
                dict.add_missing("enum", facets.range.join(","));
            }
        }
        PointKind::Str => {
            dict.add_missing("kind", "Str");
        }
        PointKind::Unsupported => {}
    }
}

/// Convert a host value into a tag value.
pub fn to_value(value: &PointValue, units: Option<&str>) -> Value {
    match value {
        PointValue::Numeric(v) => match units {
            Some(unit) => Value::num_unit(*v, unit),
            None => Value::num(*v),
        },
        PointValue::Boolean(b) => Value::Bool(*b),
        PointValue::Str(s) => Value::str(s.as_str()),
        PointValue::Enum(e) => Value::str(e.tag.as_str()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Status
// ─────────────────────────────────────────────────────────────────────────────

const STATUS_ORDER: [(Status, &str); 9] = [
    (Status::OK, "ok"),
    (Status::DISABLED, "disabled"),
    (Status::FAULT, "fault"),
    (Status::DOWN, "down"),
    (Status::ALARM, "alarm"),
    (Status::STALE, "stale"),
    (Status::OVERRIDDEN, "overridden"),
    (Status::NULL, "null"),
    (Status::UNACKED_ALARM, "unackedAlarm"),
];

/// `curStatus` of a point status; the first matching flag wins.
///
/// # Panics
///
/// If no known flag is set. The host only reports statuses from the
/// closed set above.
pub fn status_string(status: Status) -> &'static str {
    match STATUS_ORDER.iter().find(|(flag, _)| status.contains(*flag)) {
        Some((_, name)) => *name,
        None => panic!("Point status {:?} has no Haystack name", status),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Histories
// ─────────────────────────────────────────────────────────────────────────────

/// Build the tag dictionary of a history.
pub fn project_history<S: Station + ?Sized>(
    ctx: Context<'_, S>,
    cfg: &HistoryConfig,
    paired: Option<&Component>,
) -> Dict {
    let mut dict = Dict::new();
    dict.add("id", ctx.ids.history_ref(&cfg.id))
        .add("dis", cfg.id.name.as_str())
        .add("axType", HISTORY_TYPE)
        .add("axHistoryId", cfg.id.to_string())
        .add_marker("his")
        .add("tz", haystack_tz(&cfg.time_zone));

    if let Some(kind) = cfg.record_kind {
        add_kind_tags(kind, &cfg.facets, &mut dict);
    }
    if cfg.interpolation == Interpolation::Cov {
        dict.add("hisInterpolate", "cov");
    }
    if let Some(point) = paired {
        dict.add("axPointRef", ctx.ids.component_ref(point.handle));
    }
    dict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HaystackConfig;
    use crate::testing::{Env, STATION, SimpleStation};
    use haystack_types::Ref;
    use nhaystack_station::{ComponentSpec, Handle, MemoryStation, StationMut};
    use pretty_assertions::assert_eq;

    fn comp(fx: &SimpleStation, handle: Handle) -> &Component {
        fx.station.component(handle).unwrap()
    }

    #[test]
    fn test_numeric_point_with_cov_history() {
        let fx = SimpleStation::new();
        let env = Env::default();
        let dict = project(env.ctx(&fx.station), comp(&fx, fx.sine1));

        assert_eq!(dict.id().unwrap().val, "nhaystack_simple:c.OTk~");
        assert_eq!(dict.get_str("axType"), Some("kitControl:SineWave"));
        assert_eq!(dict.get_str("axSlotPath"), Some("slot:/Foo/SineWave1"));
        assert_eq!(dict.dis(), Some("SineWave1"));
        assert!(dict.has("foo") && dict.has("bar"));
        assert!(dict.has("point") && dict.has("his") && dict.has("cur"));
        assert_eq!(dict.get_str("kind"), Some("Number"));
        assert_eq!(dict.get_str("unit"), Some("°F"));
        assert_eq!(dict.get_str("tz"), Some("New_York"));
        assert_eq!(dict.get_str("hisInterpolate"), Some("cov"));
        assert_eq!(dict.get("curVal"), Some(&Value::num_unit(42.0, "°F")));
        assert_eq!(dict.get_str("curStatus"), Some("ok"));
        assert!(dict.missing("axHistoryRef"));
        assert!(dict.missing("writable"));
    }

    #[test]
    fn test_linked_history_ref_is_configurable() {
        let fx = SimpleStation::new();
        let env = Env::new(HaystackConfig::default().with_linked_histories(true));
        let dict = project(env.ctx(&fx.station), comp(&fx, fx.sine1));
        assert_eq!(
            dict.get_ref("axHistoryRef").unwrap().val,
            "nhaystack_simple:h.L25oYXlzdGFja19zaW1wbGUvU2luZVdhdmUx"
        );
    }

    #[test]
    fn test_point_without_history() {
        let fx = SimpleStation::new();
        let env = Env::new(HaystackConfig::default().with_linked_histories(true));
        let dict = project(env.ctx(&fx.station), comp(&fx, fx.sine2));

        assert_eq!(dict.get_str("unit"), Some("psi"));
        for tag in ["his", "axHistoryRef", "hisInterpolate", "tz", "foo"] {
            assert!(dict.missing(tag), "unexpected {}", tag);
        }
    }

    #[test]
    fn test_annotated_plain_component() {
        let fx = SimpleStation::new();
        let env = Env::default();
        let dict = project(env.ctx(&fx.station), comp(&fx, fx.comp));

        assert_eq!(dict.get_str("axType"), Some("baja:Component"));
        assert!(dict.has("point"));
        for tag in ["kind", "his", "curVal", "curStatus", "unit", "cur"] {
            assert!(dict.missing(tag), "unexpected {}", tag);
        }
    }

    #[test]
    fn test_complete_annotation_is_verbatim() {
        let mut fx = SimpleStation::new();
        let mut tags = Dict::new();
        tags.add("id", Ref::new("custom")).add("dis", "Hand made").add_marker("sensor");
        fx.station
            .set_annotation(fx.sine1, Some(Annotation::Complete(tags.clone())));

        let env = Env::default();
        assert_eq!(project(env.ctx(&fx.station), comp(&fx, fx.sine1)), tags);
    }

    #[test]
    fn test_annotation_wins_over_derived_tags() {
        let mut fx = SimpleStation::new();
        let mut tags = Dict::new();
        tags.add("id", Ref::new("stale"))
            .add("hisInterpolate", "linear")
            .add("tz", "Chicago")
            .add("unit", "°C")
            .add("dis", "Sine")
            .add("axType", "bogus");
        fx.station.set_annotation(fx.sine1, Some(Annotation::Partial(tags)));

        let env = Env::default();
        let dict = project(env.ctx(&fx.station), comp(&fx, fx.sine1));
        assert_eq!(dict.id().unwrap().val, "nhaystack_simple:c.OTk~");
        assert_eq!(dict.get_str("hisInterpolate"), Some("linear"));
        assert_eq!(dict.get_str("tz"), Some("Chicago"));
        assert_eq!(dict.get_str("unit"), Some("°C"));
        assert_eq!(dict.dis(), Some("Sine"));
        assert_eq!(dict.get_str("axType"), Some("kitControl:SineWave"));
        assert_eq!(dict.get("curVal"), Some(&Value::num_unit(42.0, "°C")));
    }

    #[test]
    fn test_kind_tags_per_point_kind() {
        let fx = SimpleStation::new();
        let env = Env::default();
        let ctx = env.ctx(&fx.station);

        let fan = project(ctx, comp(&fx, fx.fan));
        assert_eq!(fan.get_str("kind"), Some("Bool"));
        assert_eq!(fan.get_str("enum"), Some("Off,On"));
        assert_eq!(fan.get("curVal"), Some(&Value::Bool(false)));
        assert!(fan.has("writable") && fan.has("his"));
        assert!(fan.missing("hisInterpolate"));

        let mode = project(ctx, comp(&fx, fx.mode));
        assert_eq!(mode.get_str("kind"), Some("Str"));
        assert_eq!(mode.get_str("enum"), Some("unoccupied,occupied,standby"));
        assert_eq!(mode.get_str("curVal"), Some("occupied"));

        let note = project(ctx, comp(&fx, fx.note));
        assert_eq!(note.get_str("kind"), Some("Str"));
        assert_eq!(note.get_str("curVal"), Some("filter due"));
        assert_eq!(note.get_str("curStatus"), Some("stale"));
        assert!(note.missing("writable"));
    }

    #[test]
    fn test_unsupported_point_has_no_cur_val() {
        let mut fx = SimpleStation::new();
        fx.station
            .component_mut(fx.sine2)
            .and_then(Component::as_point_mut)
            .unwrap()
            .out = None;

        let env = Env::default();
        let dict = project(env.ctx(&fx.station), comp(&fx, fx.sine2));
        assert!(dict.has("point") && dict.has("cur"));
        for tag in ["kind", "curVal", "curStatus", "unit"] {
            assert!(dict.missing(tag), "unexpected {}", tag);
        }
    }

    #[test]
    fn test_status_priority() {
        assert_eq!(status_string(Status::OK), "ok");
        assert_eq!(status_string(Status::OK | Status::STALE | Status::FAULT), "ok");
        assert_eq!(status_string(Status::STALE), "stale");
        assert_eq!(status_string(Status::FAULT | Status::ALARM), "fault");
        assert_eq!(status_string(Status::NULL | Status::UNACKED_ALARM), "null");
        assert_eq!(status_string(Status::UNACKED_ALARM), "unackedAlarm");
    }

    #[test]
    #[should_panic(expected = "has no Haystack name")]
    fn test_empty_status_is_fatal() {
        status_string(Status::empty());
    }

    #[test]
    fn test_implicit_equip_linkage() {
        let fx = SimpleStation::new();
        let env = Env::default();
        let dict = project(env.ctx(&fx.station), comp(&fx, fx.sat));

        assert_eq!(dict.get_ref("equipRef"), Some(&env.ids.component_ref(fx.ahu)));
        assert_eq!(dict.get_ref("siteRef"), Some(&env.ids.component_ref(fx.site)));
    }

    #[test]
    fn test_explicit_equip_ref_propagates_site() {
        let mut fx = SimpleStation::new();
        let env = Env::default();
        let mut tags = Dict::new();
        tags.add("equipRef", env.ids.component_ref(fx.ahu));
        fx.station.set_annotation(fx.sine2, Some(Annotation::Partial(tags)));

        let dict = project(env.ctx(&fx.station), comp(&fx, fx.sine2));
        assert_eq!(dict.get_ref("equipRef"), Some(&env.ids.component_ref(fx.ahu)));
        assert_eq!(dict.get_ref("siteRef"), Some(&env.ids.component_ref(fx.site)));

        // a dangling equipRef is kept as annotated and adds nothing
        let mut tags = Dict::new();
        tags.add("equipRef", Ref::new("nhaystack_simple:c.OTk5OQ~~"));
        fx.station.set_annotation(fx.sine2, Some(Annotation::Partial(tags)));
        let dict = project(env.ctx(&fx.station), comp(&fx, fx.sine2));
        assert!(dict.missing("siteRef"));
    }

    #[test]
    fn test_non_ref_equip_ref_is_kept() {
        let mut fx = SimpleStation::new();
        let mut tags = Dict::new();
        tags.add("equipRef", "hand-authored");
        fx.station.set_annotation(fx.sat, Some(Annotation::Partial(tags)));

        let env = Env::default();
        let dict = project(env.ctx(&fx.station), comp(&fx, fx.sat));
        assert_eq!(dict.get_str("equipRef"), Some("hand-authored"));
        assert!(dict.missing("siteRef"));
    }

    #[test]
    fn test_history_projection() {
        let fx = SimpleStation::new();
        let env = Env::default();
        let ctx = env.ctx(&fx.station);

        let audit = project_history(ctx, fx.history(STATION, "AuditHistory"), None);
        assert_eq!(audit.get_str("axType"), Some(HISTORY_TYPE));
        assert_eq!(audit.get_str("axHistoryId"), Some("/nhaystack_simple/AuditHistory"));
        assert_eq!(audit.get_str("tz"), Some("New_York"));
        assert!(audit.has("his"));
        for tag in ["kind", "curVal", "hisInterpolate", "unit", "axPointRef"] {
            assert!(audit.missing(tag), "unexpected {}", tag);
        }

        let sine = project_history(ctx, fx.history(STATION, "SineWave1"), Some(comp(&fx, fx.sine1)));
        assert_eq!(sine.get_str("kind"), Some("Number"));
        assert_eq!(sine.get_str("unit"), Some("°F"));
        assert_eq!(sine.get_str("hisInterpolate"), Some("cov"));
        assert_eq!(sine.get_ref("axPointRef").unwrap().val, "nhaystack_simple:c.OTk~");
    }

    #[test]
    fn test_display_falls_back_to_slot_name() {
        let mut st = MemoryStation::new("s", "UTC");
        let named = st
            .add(st.root(), ComponentSpec::new("Plain", "baja:Folder").display_name("Pretty"))
            .unwrap();
        let unnamed = st.add(st.root(), ComponentSpec::new("Other", "baja:Folder")).unwrap();
        assert_eq!(st.component(named).unwrap().display(), Some("Pretty"));
        assert_eq!(st.component(unnamed).unwrap().display(), Some("Other"));
        assert_eq!(st.component(st.root()).unwrap().display(), Some("s"));
        assert_eq!(haystack_tz("America/New_York"), "New_York");
        assert_eq!(haystack_tz("UTC"), "UTC");
    }
}

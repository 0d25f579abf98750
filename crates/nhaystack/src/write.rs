//! Priority-array writes.
//!
//! Only the raw per-slot write happens here. Which slot wins is decided by
//! the host.

use haystack_types::{Dict, Grid, Value};
use nhaystack_station::{Component, EnumValue, Facets, PointKind, PointValue, PriorityLevel};
use tracing::debug;

use crate::error::{HaystackError, Result};
use crate::tags;

/// Write `value` into one slot of a writable point, or clear the slot when
/// `value` is `None`. Level numbers outside 1-16 address the fallback.
pub fn write_priority_level(
    comp: &mut Component,
    level_number: i64,
    value: Option<&Value>,
) -> Result<PriorityLevel> {
    let level = PriorityLevel::from_number(level_number);
    let slot_path = comp.slot_path.clone();
    let point = comp
        .as_point_mut()
        .ok_or_else(|| HaystackError::NotWritable(slot_path.clone()))?;
    let facets = &point.facets;
    let array = point
        .writable
        .as_mut()
        .ok_or_else(|| HaystackError::NotWritable(slot_path.clone()))?;

    match value {
        None => {
            array.clear(level);
            debug!("Cleared {} of {}", level, slot_path);
        }
        Some(value) => {
            let value = to_point_value(array.kind(), facets, value)?;
            debug!("Writing {:?} to {} of {}", value, level, slot_path);
            array.set(level, value)?;
        }
    }
    Ok(level)
}

fn to_point_value(kind: PointKind, facets: &Facets, value: &Value) -> Result<PointValue> {
    let invalid = || HaystackError::InvalidValue {
        kind: kind.to_string(),
        value: value.to_string(),
    };
    match (kind, value) {
        (PointKind::Numeric, Value::Number(n)) => Ok(PointValue::Numeric(n.val)),
        (PointKind::Boolean, Value::Bool(b)) => Ok(PointValue::Boolean(*b)),
        (PointKind::Str, Value::Str(s)) => Ok(PointValue::Str(s.clone())),
        (PointKind::Enum, Value::Str(tag)) => facets
            .range
            .iter()
            .position(|t| t == tag)
            .map(|ordinal| {
                PointValue::Enum(EnumValue {
                    ordinal: ordinal as i32,
                    tag: tag.clone(),
                })
            })
            .ok_or_else(invalid),
        (PointKind::Enum, Value::Number(n)) if n.val.fract() == 0.0 && n.val >= 0.0 => facets
            .range
            .get(n.val as usize)
            .map(|tag| {
                PointValue::Enum(EnumValue {
                    ordinal: n.val as i32,
                    tag: tag.clone(),
                })
            })
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

/// The 17 slots of a writable point as a grid of `level`, `levelDis` and
/// `val` (absent for empty slots).
pub fn priority_array_grid(comp: &Component) -> Result<Grid> {
    let point = comp
        .as_point()
        .ok_or_else(|| HaystackError::NotWritable(comp.slot_path.clone()))?;
    let array = point
        .writable
        .as_ref()
        .ok_or_else(|| HaystackError::NotWritable(comp.slot_path.clone()))?;

    let rows = PriorityLevel::all()
        .map(|level| {
            let mut row = Dict::new();
            row.add("level", f64::from(level.number()))
                .add("levelDis", level.to_string());
            if let Some(value) = &array.slot(level).value {
                row.add("val", tags::to_value(value, point.facets.units.as_deref()));
            }
            row
        })
        .collect();
    Ok(Grid::from_dicts(rows))
}

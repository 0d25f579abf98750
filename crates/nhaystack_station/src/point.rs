//! Control points, status flags and the 16-level priority array.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

// =============================================================================
// Status
// =============================================================================

bitflags! {
    /// Point status flags as reported by the host.
    ///
    /// A status may carry several flags at once; consumers decide which one
    /// wins.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Status: u16 {
        const OK = 1 << 0;
        const DISABLED = 1 << 1;
        const FAULT = 1 << 2;
        const DOWN = 1 << 3;
        const ALARM = 1 << 4;
        const STALE = 1 << 5;
        const OVERRIDDEN = 1 << 6;
        /// No value present
        const NULL = 1 << 7;
        const UNACKED_ALARM = 1 << 8;
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::OK
    }
}

// =============================================================================
// Values and kinds
// =============================================================================

/// Enumerated value: ordinal plus its symbolic tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub ordinal: i32,
    pub tag: String,
}

/// A point's output or a priority slot's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointValue {
    Boolean(bool),
    Numeric(f64),
    Str(String),
    Enum(EnumValue),
}

impl PointValue {
    pub fn kind(&self) -> PointKind {
        match self {
            PointValue::Boolean(_) => PointKind::Boolean,
            PointValue::Numeric(_) => PointKind::Numeric,
            PointValue::Str(_) => PointKind::Str,
            PointValue::Enum(_) => PointKind::Enum,
        }
    }
}

/// Closed set of point kinds the adapter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    Numeric,
    Boolean,
    Enum,
    Str,
    Unsupported,
}

impl fmt::Display for PointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PointKind::Numeric => "numeric",
            PointKind::Boolean => "boolean",
            PointKind::Enum => "enum",
            PointKind::Str => "string",
            PointKind::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// Descriptive metadata attached to a point or history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Facets {
    /// Unit symbol, e.g. "°F"
    pub units: Option<String>,
    pub true_text: Option<String>,
    pub false_text: Option<String>,
    /// Enum range tags in ordinal order
    #[serde(default)]
    pub range: Vec<String>,
    pub precision: Option<u8>,
}

/// Proxy extension of a driver point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProxyExt {
    /// Point mirrored from a peer station; `point_id` is the slot path on
    /// the peer.
    Niagara { point_id: String },
    /// Any other driver (BACnet, Modbus, ...)
    Driver { type_spec: String },
}

// =============================================================================
// Priority array
// =============================================================================

/// A priority array level: 1-16, or the fallback slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PriorityLevel(u8);

impl PriorityLevel {
    pub const FALLBACK: PriorityLevel = PriorityLevel(17);

    /// Map a level number to its slot. Anything outside 1-16 is the fallback.
    pub fn from_number(number: i64) -> Self {
        match number {
            1..=16 => PriorityLevel(number as u8),
            _ => Self::FALLBACK,
        }
    }

    /// 1-16 for named levels, 17 for the fallback.
    pub fn number(self) -> u8 {
        self.0
    }

    pub fn is_fallback(self) -> bool {
        self == Self::FALLBACK
    }

    /// Levels 1 through 16 followed by the fallback.
    pub fn all() -> impl Iterator<Item = PriorityLevel> {
        (1..=17).map(PriorityLevel)
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_fallback() {
            f.write_str("fallback")
        } else {
            write!(f, "level {}", self.0)
        }
    }
}

/// One slot of a priority array.
#[derive(Debug, Clone, PartialEq)]
pub struct PrioritySlot {
    pub status: Status,
    pub value: Option<PointValue>,
}

impl PrioritySlot {
    pub fn empty() -> Self {
        Self {
            status: Status::NULL,
            value: None,
        }
    }

    pub fn is_null(&self) -> bool {
        self.status.contains(Status::NULL)
    }
}

/// Errors raised by the host when a slot write does not fit the point.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WriteError {
    #[error("Cannot store a {found} value in a {expected} priority array")]
    KindMismatch { expected: PointKind, found: PointKind },
}

/// 16 prioritized input slots plus a fallback, all typed by the point kind.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityArray {
    kind: PointKind,
    levels: [PrioritySlot; 16],
    fallback: PrioritySlot,
}

impl PriorityArray {
    pub fn new(kind: PointKind) -> Self {
        Self {
            kind,
            levels: std::array::from_fn(|_| PrioritySlot::empty()),
            fallback: PrioritySlot::empty(),
        }
    }

    pub fn kind(&self) -> PointKind {
        self.kind
    }

    pub fn slot(&self, level: PriorityLevel) -> &PrioritySlot {
        if level.is_fallback() {
            &self.fallback
        } else {
            &self.levels[level.number() as usize - 1]
        }
    }

    fn slot_mut(&mut self, level: PriorityLevel) -> &mut PrioritySlot {
        if level.is_fallback() {
            &mut self.fallback
        } else {
            &mut self.levels[level.number() as usize - 1]
        }
    }

    /// Store a value with ok status.
    pub fn set(&mut self, level: PriorityLevel, value: PointValue) -> Result<(), WriteError> {
        if value.kind() != self.kind {
            return Err(WriteError::KindMismatch {
                expected: self.kind,
                found: value.kind(),
            });
        }
        let slot = self.slot_mut(level);
        slot.status = Status::OK;
        slot.value = Some(value);
        Ok(())
    }

    /// Reset a slot to "no value present".
    pub fn clear(&mut self, level: PriorityLevel) {
        *self.slot_mut(level) = PrioritySlot::empty();
    }
}

// =============================================================================
// Control point
// =============================================================================

/// A live control point.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlPoint {
    /// Current output; `None` for value types the adapter cannot represent
    pub out: Option<PointValue>,
    pub status: Status,
    pub facets: Facets,
    /// Present only on writable points
    pub writable: Option<PriorityArray>,
    pub proxy: Option<ProxyExt>,
}

impl ControlPoint {
    pub fn new(out: PointValue) -> Self {
        Self {
            out: Some(out),
            status: Status::OK,
            facets: Facets::default(),
            writable: None,
            proxy: None,
        }
    }

    /// Kind is decided by what the point can produce.
    pub fn kind(&self) -> PointKind {
        self.out
            .as_ref()
            .map(PointValue::kind)
            .unwrap_or(PointKind::Unsupported)
    }

    pub fn is_writable(&self) -> bool {
        self.writable.is_some()
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_facets(mut self, facets: Facets) -> Self {
        self.facets = facets;
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyExt) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Give the point a priority array matching its kind.
    pub fn writable(mut self) -> Self {
        self.writable = Some(PriorityArray::new(self.kind()));
        self
    }
}

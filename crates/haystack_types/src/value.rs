//! Typed tag values
//!
//! A tag value is one of the Haystack scalar kinds. Values serialize to the
//! Haystack JSON string encoding (`"m:"`, `"n:72.5 °F"`, `"r:id"`, ...) and
//! deserialize from it, with plain JSON/TOML booleans, numbers and strings
//! accepted as shorthands.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors raised while decoding a value from its string encoding.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Invalid date-time: {0}")]
    InvalidDateTime(String),

    #[error("Empty ref")]
    EmptyRef,
}

// ─────────────────────────────────────────────────────────────────────────────
// Scalars
// ─────────────────────────────────────────────────────────────────────────────

/// Number with an optional unit symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Number {
    pub val: f64,
    pub unit: Option<String>,
}

impl Number {
    pub fn new(val: f64) -> Self {
        Self { val, unit: None }
    }

    pub fn with_unit(val: f64, unit: impl Into<String>) -> Self {
        Self {
            val,
            unit: Some(unit.into()),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "{}{}", self.val, unit),
            None => write!(f, "{}", self.val),
        }
    }
}

/// Reference to another entity, with an optional display string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ref {
    pub val: String,
    pub dis: Option<String>,
}

impl Ref {
    pub fn new(val: impl Into<String>) -> Self {
        Self {
            val: val.into(),
            dis: None,
        }
    }

    pub fn with_dis(val: impl Into<String>, dis: impl Into<String>) -> Self {
        Self {
            val: val.into(),
            dis: Some(dis.into()),
        }
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.val)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Value
// ─────────────────────────────────────────────────────────────────────────────

/// A single typed tag value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Presence-only tag
    Marker,
    Bool(bool),
    Number(Number),
    Str(String),
    Ref(Ref),
    /// Timestamp plus the Haystack time zone name it was observed in
    DateTime { ts: DateTime<Utc>, tz: String },
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn num(val: f64) -> Self {
        Value::Number(Number::new(val))
    }

    pub fn num_unit(val: f64, unit: impl Into<String>) -> Self {
        Value::Number(Number::with_unit(val, unit))
    }

    pub fn is_marker(&self) -> bool {
        matches!(self, Value::Marker)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Ref> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// Kind name as used in error messages and the `kind` tag.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Marker => "Marker",
            Value::Bool(_) => "Bool",
            Value::Number(_) => "Number",
            Value::Str(_) => "Str",
            Value::Ref(_) => "Ref",
            Value::DateTime { .. } => "DateTime",
        }
    }

    /// Encode into the Haystack JSON string form. Booleans have no string
    /// form and are rendered as `true`/`false`.
    pub fn to_json_string(&self) -> String {
        match self {
            Value::Marker => "m:".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => match &n.unit {
                Some(unit) => format!("n:{} {}", n.val, unit),
                None => format!("n:{}", n.val),
            },
            Value::Str(s) => {
                if s.len() >= 2 && s.as_bytes()[1] == b':' {
                    format!("s:{}", s)
                } else {
                    s.clone()
                }
            }
            Value::Ref(r) => match &r.dis {
                Some(dis) => format!("r:{} {}", r.val, dis),
                None => format!("r:{}", r.val),
            },
            Value::DateTime { ts, tz } => format!("t:{} {}", ts.to_rfc3339(), tz),
        }
    }

    /// Decode a Haystack JSON string. Strings without a recognised type
    /// prefix are plain strings.
    pub fn from_json_str(s: &str) -> Result<Self, ValueError> {
        let Some((prefix, rest)) = s.split_at_checked(2) else {
            return Ok(Value::Str(s.to_string()));
        };
        match prefix {
            "m:" => Ok(Value::Marker),
            "s:" => Ok(Value::Str(rest.to_string())),
            "n:" => parse_number(rest).map(Value::Number),
            "r:" => {
                let (val, dis) = match rest.split_once(' ') {
                    Some((val, dis)) => (val, Some(dis.to_string())),
                    None => (rest, None),
                };
                if val.is_empty() {
                    return Err(ValueError::EmptyRef);
                }
                Ok(Value::Ref(Ref {
                    val: val.to_string(),
                    dis,
                }))
            }
            "t:" => {
                let (ts, tz) = rest.split_once(' ').unwrap_or((rest, "UTC"));
                let ts = DateTime::parse_from_rfc3339(ts)
                    .map_err(|_| ValueError::InvalidDateTime(rest.to_string()))?;
                Ok(Value::DateTime {
                    ts: ts.with_timezone(&Utc),
                    tz: tz.to_string(),
                })
            }
            _ => Ok(Value::Str(s.to_string())),
        }
    }
}

fn parse_number(s: &str) -> Result<Number, ValueError> {
    let s = s.trim();
    let (num, unit) = match s.split_once(' ') {
        Some((num, unit)) => (num, Some(unit.trim().to_string())),
        None => (s, None),
    };
    let val = match num {
        "INF" => f64::INFINITY,
        "-INF" => f64::NEG_INFINITY,
        "NaN" => f64::NAN,
        _ => num
            .parse::<f64>()
            .map_err(|_| ValueError::InvalidNumber(s.to_string()))?,
    };
    Ok(Number { val, unit })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Marker => write!(f, "M"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Ref(r) => write!(f, "{}", r),
            Value::DateTime { ts, tz } => write!(f, "{} {}", ts.to_rfc3339(), tz),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::num(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Ref> for Value {
    fn from(r: Ref) -> Self {
        Value::Ref(r)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Serde
// ─────────────────────────────────────────────────────────────────────────────

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Bool(b) => serializer.serialize_bool(*b),
            other => serializer.serialize_str(&other.to_json_string()),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a bool, number or Haystack JSON encoded string")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::num(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::num(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::num(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Value::from_json_str(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

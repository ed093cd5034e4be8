//! Logical position requests.
//!
//! A position is what a caller asks for ("put this record first", "at index
//! 3"). It is consumed once by the mapper to compute a rank and is never
//! persisted itself.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// A requested logical position within a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Position {
    /// Before every other member.
    First,
    /// After every other member.
    Last,
    /// The median rank, regardless of neighbors.
    Middle,
    /// Zero-based index in rank order.
    Index(usize),
    /// Untyped input, interpreted as an index when the mapper consumes it.
    Text(String),
}

impl Position {
    /// Interpret a JSON value as a position request. `null` means no request.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(Self::from(s.as_str())),
            Value::Number(n) => Some(match n.as_u64() {
                Some(index) => Self::Index(index as usize),
                // negative or fractional indices collapse to the front
                None => Self::Index(n.as_f64().filter(|f| *f > 0.0).unwrap_or(0.0) as usize),
            }),
            other => Some(Self::Text(other.to_string())),
        }
    }

    /// The JSON form of this position.
    pub fn to_value(&self) -> Value {
        match self {
            Self::First => Value::from("first"),
            Self::Last => Value::from("last"),
            Self::Middle => Value::from("middle"),
            Self::Index(index) => Value::from(*index as u64),
            Self::Text(raw) => Value::from(raw.as_str()),
        }
    }
}

impl From<&str> for Position {
    fn from(raw: &str) -> Self {
        match raw {
            "first" => Self::First,
            "last" => Self::Last,
            "middle" => Self::Middle,
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<usize> for Position {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Last => write!(f, "last"),
            Self::Middle => write!(f, "middle"),
            Self::Index(index) => write!(f, "{index}"),
            Self::Text(raw) => write!(f, "{raw:?}"),
        }
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom("position must not be null"))
    }
}

/// Parse the leading integer of `raw`, the way form input is usually coerced.
///
/// Surrounding whitespace is ignored. Anything without leading digits, and
/// any negative number, yields `0`.
pub fn parse_index(raw: &str) -> usize {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    if negative {
        return 0;
    }

    digits[..end].parse().unwrap_or(match end {
        0 => 0,
        // more digits than fit in usize
        _ => usize::MAX,
    })
}

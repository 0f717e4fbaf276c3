use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute value carried by records and child rows.
///
/// Serialized as a plain JSON scalar, so `{"status": "Open", "qty": 3}`
/// round-trips without type tags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// `Null` and blank text are empty. Numbers and booleans never are,
    /// so `0` and `false` survive pass-through copies.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed string form of a reference value. Returns `None` for empty values.
    pub fn key(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        match self {
            Self::Text(s) => Some(s.trim().to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Hashable identity used to deduplicate child rows.
    ///
    /// Agrees with `==`: text never matches a number, and integral floats
    /// match the equal integer. Text is compared as stored, without trimming.
    pub fn dedup_key(&self) -> Option<DedupKey> {
        if self.is_empty() {
            return None;
        }
        Some(match self {
            Self::Null => return None,
            Self::Boolean(b) => DedupKey::Boolean(*b),
            Self::Integer(i) => DedupKey::Number(*i),
            Self::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                DedupKey::Number(*f as i64)
            }
            Self::Float(f) => DedupKey::Float(f.to_bits()),
            Self::Text(s) => DedupKey::Text(s.clone()),
        })
    }
}

/// See [`Value::dedup_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Boolean(bool),
    Number(i64),
    Float(u64),
    Text(String),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => {
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                (a - b).abs() < f64::EPSILON
            }
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(i), Self::Float(f)) | (Self::Float(f), Self::Integer(i)) => {
                (*i as f64 - f).abs() < f64::EPSILON
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(fl) => {
                if fl.is_nan() {
                    write!(f, "NaN")
                } else if fl.is_infinite() {
                    if *fl > 0.0 {
                        write!(f, "Infinity")
                    } else {
                        write!(f, "-Infinity")
                    }
                } else {
                    write!(f, "{}", fl)
                }
            }
            Self::Text(s) => write!(f, "{}", s),
            Self::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

use std::cmp::Ordering;
use std::fmt;

use udx_error::{Result, UdxError};

/// A single (possibly null) value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Int64(i64),
    Float64(f64),
    Utf8(String),
}

impl ScalarValue {
    pub fn try_as_i64(&self) -> Result<i64> {
        match self {
            Self::Int64(v) => Ok(*v),
            other => Err(UdxError::new(format!("Not an integer: {other}"))),
        }
    }

    pub fn try_as_str(&self) -> Result<&str> {
        match self {
            Self::Utf8(v) => Ok(v.as_str()),
            other => Err(UdxError::new(format!("Not a string: {other}"))),
        }
    }

    /// Booleans have no storage type of their own, settings accept the
    /// integers 0/1 and the usual spellings.
    pub fn try_as_bool(&self) -> Result<bool> {
        match self {
            Self::Int64(0) => Ok(false),
            Self::Int64(1) => Ok(true),
            Self::Utf8(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "t" | "on" | "1" => Ok(true),
                "false" | "f" | "off" | "0" => Ok(false),
                _ => Err(UdxError::new(format!("Not a boolean: {s}"))),
            },
            other => Err(UdxError::new(format!("Not a boolean: {other}"))),
        }
    }

    /// Total ordering used for partition and order keys.
    ///
    /// Nulls sort first. Values of different types compare by type.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
            (Self::Int64(a), Self::Int64(b)) => a.cmp(b),
            (Self::Float64(a), Self::Float64(b)) => a.total_cmp(b),
            (Self::Int64(a), Self::Float64(b)) => (*a as f64).total_cmp(b),
            (Self::Float64(a), Self::Int64(b)) => a.total_cmp(&(*b as f64)),
            (Self::Utf8(a), Self::Utf8(b)) => a.cmp(b),
            (Self::Utf8(_), _) => Ordering::Greater,
            (_, Self::Utf8(_)) => Ordering::Less,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int64(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float64(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Int64(value as i64)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Utf8(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Utf8(value)
    }
}

impl<T> From<Option<T>> for ScalarValue
where
    T: Into<ScalarValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => ScalarValue::Null,
        }
    }
}

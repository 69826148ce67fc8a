use std::fmt;

/// Logical types of the values that flow between the host and the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int64,
    Float64,
    Utf8,
}

impl DataType {
    pub const fn is_integer(&self) -> bool {
        matches!(self, DataType::Int64)
    }

    /// Integers and floats.
    pub const fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int64 | DataType::Float64)
    }

    pub const fn is_utf8(&self) -> bool {
        matches!(self, DataType::Utf8)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int64 => write!(f, "Int64"),
            Self::Float64 => write!(f, "Float64"),
            Self::Utf8 => write!(f, "Utf8"),
        }
    }
}

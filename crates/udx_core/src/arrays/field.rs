use std::fmt;

use super::datatype::DataType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub datatype: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, datatype: DataType, nullable: bool) -> Self {
        Field {
            name: name.into(),
            datatype,
            nullable,
        }
    }
}

/// How a column participates in a transform or analytic invocation.
///
/// Mirrors `f(args) OVER (PARTITION BY .. ORDER BY ..)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    Argument,
    PartitionBy,
    OrderBy,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Argument => write!(f, "ARG"),
            Self::PartitionBy => write!(f, "PBY"),
            Self::OrderBy => write!(f, "OBY"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseColumn {
    pub field: Field,
    pub role: ColumnRole,
}

/// Column layout of the rows entering or leaving a phase, including the
/// partition/order annotations.
///
/// Column indices returned by the role accessors index directly into
/// records carrying this schema.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhaseSchema {
    pub columns: Vec<PhaseColumn>,
}

impl PhaseSchema {
    pub fn new(columns: impl IntoIterator<Item = PhaseColumn>) -> Self {
        PhaseSchema {
            columns: columns.into_iter().collect(),
        }
    }

    /// Schema where every column is an argument.
    pub fn arguments(fields: impl IntoIterator<Item = Field>) -> Self {
        Self::new(fields.into_iter().map(|field| PhaseColumn {
            field,
            role: ColumnRole::Argument,
        }))
    }

    pub fn with_column(mut self, field: Field, role: ColumnRole) -> Self {
        self.columns.push(PhaseColumn { field, role });
        self
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn datatype(&self, idx: usize) -> Option<DataType> {
        self.columns.get(idx).map(|c| c.field.datatype)
    }

    fn columns_with_role(&self, role: ColumnRole) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.role == role)
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn argument_columns(&self) -> Vec<usize> {
        self.columns_with_role(ColumnRole::Argument)
    }

    pub fn partition_columns(&self) -> Vec<usize> {
        self.columns_with_role(ColumnRole::PartitionBy)
    }

    pub fn order_columns(&self) -> Vec<usize> {
        self.columns_with_role(ColumnRole::OrderBy)
    }

    /// Check that the columns with `role` have exactly the given types, in
    /// order.
    pub fn role_types_match(&self, role: ColumnRole, expected: &[fn(&DataType) -> bool]) -> bool {
        let cols = self.columns_with_role(role);
        if cols.len() != expected.len() {
            return false;
        }
        cols.iter()
            .zip(expected)
            .all(|(&idx, check)| check(&self.columns[idx].field.datatype))
    }
}

impl fmt::Display for PhaseSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (idx, col) in self.columns.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {} {}", col.role, col.field.name, col.field.datatype)?;
        }
        write!(f, ")")
    }
}

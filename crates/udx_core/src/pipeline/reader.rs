use std::cmp::Ordering;

use udx_error::{Result, UdxError};

use crate::arrays::field::PhaseSchema;
use crate::arrays::record::Record;

/// Sequential access to the rows of one partition.
///
/// A reader handed to a processor is always positioned on the first row of
/// a non-empty partition.
pub trait PartitionReader {
    fn schema(&self) -> &PhaseSchema;

    /// The current row.
    fn row(&self) -> &Record;

    /// Advance to the next row. Returns false at the end of the partition,
    /// leaving the reader on the last row.
    fn next(&mut self) -> bool;

    /// Whether the current row starts a new run of order key values.
    ///
    /// True for the first row of the partition.
    fn is_new_order_key(&self) -> bool;
}

/// In-memory partition.
#[derive(Debug, Clone)]
pub struct PartitionRows {
    schema: PhaseSchema,
    order_cols: Vec<usize>,
    rows: Vec<Record>,
    idx: usize,
}

impl PartitionRows {
    pub fn try_new(schema: PhaseSchema, rows: Vec<Record>) -> Result<Self> {
        if rows.is_empty() {
            return Err(UdxError::contract("Partition must contain at least one row"));
        }
        if let Some(row) = rows.iter().find(|r| r.arity() != schema.num_columns()) {
            return Err(UdxError::contract("Row does not match partition schema")
                .with_field("arity", row.arity())
                .with_field("schema", &schema));
        }

        Ok(PartitionRows {
            order_cols: schema.order_columns(),
            schema,
            rows,
            idx: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl PartitionReader for PartitionRows {
    fn schema(&self) -> &PhaseSchema {
        &self.schema
    }

    fn row(&self) -> &Record {
        &self.rows[self.idx]
    }

    fn next(&mut self) -> bool {
        if self.idx + 1 < self.rows.len() {
            self.idx += 1;
            true
        } else {
            false
        }
    }

    fn is_new_order_key(&self) -> bool {
        if self.idx == 0 {
            return true;
        }
        let prev = &self.rows[self.idx - 1];
        let curr = &self.rows[self.idx];
        compare_columns(prev, curr, &self.order_cols) != Ordering::Equal
    }
}

/// Compare two records column by column.
pub(crate) fn compare_columns(a: &Record, b: &Record, cols: &[usize]) -> Ordering {
    for &col in cols {
        let ord = match (a.values().get(col), b.values().get(col)) {
            (Some(a), Some(b)) => a.total_cmp(b),
            (a, b) => a.is_some().cmp(&b.is_some()),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::datatype::DataType;
    use crate::arrays::field::{ColumnRole, Field};
    use crate::record;

    fn schema() -> PhaseSchema {
        PhaseSchema::default()
            .with_column(Field::new("v", DataType::Int64, true), ColumnRole::Argument)
            .with_column(Field::new("k", DataType::Int64, false), ColumnRole::OrderBy)
    }

    #[test]
    fn walk_rows_and_order_runs() {
        let mut reader = PartitionRows::try_new(
            schema(),
            vec![record![1_i64, 10_i64], record![2_i64, 10_i64], record![3_i64, 20_i64]],
        )
        .unwrap();

        let mut seen = Vec::new();
        loop {
            seen.push((reader.row().get_i64(0).unwrap(), reader.is_new_order_key()));
            if !reader.next() {
                break;
            }
        }
        assert_eq!(
            vec![(Some(1), true), (Some(2), false), (Some(3), true)],
            seen
        );
        // Stays on the last row.
        assert!(!reader.next());
        assert_eq!(Some(3), reader.row().get_i64(0).unwrap());
    }

    #[test]
    fn empty_partition_rejected() {
        PartitionRows::try_new(schema(), Vec::new()).unwrap_err();
    }

    #[test]
    fn arity_mismatch_rejected() {
        PartitionRows::try_new(schema(), vec![record![1_i64]]).unwrap_err();
    }
}

use std::cmp::Ordering;

use tracing::{debug, trace};
use udx_error::{Result, UdxError};

use super::phase::{PlannedPhase, PlannedTransform};
use super::reader::{PartitionRows, compare_columns};
use crate::arrays::field::PhaseSchema;
use crate::arrays::record::{Record, RowSink};

/// Runs a planned transform over in-memory rows.
///
/// Stands in for the database's coordinator: it delivers every partition of
/// a phase contiguously, sorted by order key, to its own processor instance.
#[derive(Debug, Default)]
pub struct PartitionedExecutor;

impl PartitionedExecutor {
    pub fn new() -> Self {
        PartitionedExecutor
    }

    /// Execute all phases, writing the final phase's rows to `sink`.
    ///
    /// If the sink stops accepting rows, no further partitions are processed.
    pub fn execute(
        &self,
        transform: &PlannedTransform,
        rows: Vec<Record>,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        let phases = transform.phases();
        let mut rows = rows;

        for (idx, planned) in phases.iter().enumerate() {
            let is_last = idx + 1 == phases.len();
            if is_last {
                let mut out = ClosableSink::new(sink);
                run_phase(planned, rows, &mut out)?;
                break;
            }

            let mut buffered = Vec::new();
            run_phase(planned, rows, &mut ClosableSink::new(&mut buffered))?;
            debug!(
                transform = transform.name(),
                phase = planned.phase.name(),
                rows = buffered.len(),
                "phase complete"
            );
            rows = buffered;
        }

        Ok(())
    }
}

fn run_phase(planned: &PlannedPhase, rows: Vec<Record>, out: &mut ClosableSink<'_>) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let partitions = if planned.phase.is_prepass() {
        vec![rows]
    } else {
        partition_rows(&planned.input, rows)
    };

    for partition in partitions {
        trace!(phase = planned.phase.name(), rows = partition.len(), "processing partition");
        let mut reader = PartitionRows::try_new(planned.input.clone(), partition)?;
        let mut processor = planned.phase.create_processor();
        processor.process_partition(&mut reader, out)?;
        if out.is_closed() {
            debug!(phase = planned.phase.name(), "output closed, skipping remaining partitions");
            break;
        }
    }

    Ok(())
}

/// Group rows into partitions by the schema's partition columns, each sorted
/// by the order columns.
///
/// Sorting is stable, rows with equal keys keep their input order.
/// Partitions come out in ascending partition key order.
pub fn partition_rows(schema: &PhaseSchema, mut rows: Vec<Record>) -> Vec<Vec<Record>> {
    let part_cols = schema.partition_columns();
    let order_cols = schema.order_columns();

    rows.sort_by(|a, b| {
        compare_columns(a, b, &part_cols).then_with(|| compare_columns(a, b, &order_cols))
    });

    let mut partitions: Vec<Vec<Record>> = Vec::new();
    for row in rows {
        match partitions.last_mut() {
            Some(curr) if compare_columns(&curr[0], &row, &part_cols) == Ordering::Equal => {
                curr.push(row)
            }
            _ => partitions.push(vec![row]),
        }
    }

    partitions
}

/// Wraps a sink, remembering once it refused a row.
///
/// Rows written after that are an error.
pub struct ClosableSink<'a> {
    inner: &'a mut dyn RowSink,
    closed: bool,
}

impl<'a> ClosableSink<'a> {
    pub fn new(inner: &'a mut dyn RowSink) -> Self {
        ClosableSink {
            inner,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl RowSink for ClosableSink<'_> {
    fn write(&mut self, row: Record) -> Result<bool> {
        if self.closed {
            return Err(UdxError::contract("Write to closed output"));
        }
        let more = self.inner.write(row)?;
        self.closed = !more;
        Ok(more)
    }
}

/// Sink accepting at most `limit` rows.
#[derive(Debug)]
pub struct LimitSink {
    rows: Vec<Record>,
    limit: usize,
}

impl LimitSink {
    pub fn new(limit: usize) -> Self {
        LimitSink {
            rows: Vec::new(),
            limit,
        }
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }
}

impl RowSink for LimitSink {
    fn write(&mut self, row: Record) -> Result<bool> {
        if self.rows.len() >= self.limit {
            return Err(UdxError::contract("Write past row limit").with_field("limit", self.limit));
        }
        self.rows.push(row);
        Ok(self.rows.len() < self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::datatype::DataType;
    use crate::arrays::field::{ColumnRole, Field};
    use crate::record;

    #[test]
    fn groups_and_sorts() {
        let schema = PhaseSchema::default()
            .with_column(Field::new("v", DataType::Int64, false), ColumnRole::Argument)
            .with_column(Field::new("p", DataType::Utf8, false), ColumnRole::PartitionBy)
            .with_column(Field::new("o", DataType::Int64, false), ColumnRole::OrderBy);

        let rows = vec![
            record![1_i64, "b", 3_i64],
            record![2_i64, "a", 2_i64],
            record![3_i64, "b", 1_i64],
            record![4_i64, "a", 2_i64],
            record![5_i64, "a", 1_i64],
        ];

        let partitions = partition_rows(&schema, rows);
        let got: Vec<Vec<i64>> = partitions
            .iter()
            .map(|p| p.iter().map(|r| r.get_i64(0).unwrap().unwrap()).collect())
            .collect();
        assert_eq!(vec![vec![5, 2, 4], vec![3, 1]], got);
    }

    #[test]
    fn closable_sink_rejects_after_close() {
        let mut limit = LimitSink::new(1);
        let mut sink = ClosableSink::new(&mut limit);
        assert!(!sink.write(record![1_i64]).unwrap());
        assert!(sink.is_closed());
        sink.write(record![2_i64]).unwrap_err();
    }
}

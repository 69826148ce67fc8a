//! Single pass analytic (window) functions over ordered partitions.
//!
//! Each function produces exactly one output value per input row.

pub mod lag;
pub mod lead;
pub mod nth_value;
pub mod rank;

use std::fmt::Debug;

use tracing::debug;
use udx_error::{Result, UdxError};

use crate::arrays::datatype::DataType;
use crate::arrays::field::PhaseSchema;
use crate::arrays::record::{Record, RowSink};
use crate::arrays::scalar::ScalarValue;
use crate::config::params::NamedParams;
use crate::pipeline::executor::partition_rows;
use crate::pipeline::reader::{PartitionReader, PartitionRows};
use lag::Lag;
use lead::Lead;
use nth_value::NthValue;
use rank::Rank;

pub trait AnalyticFunction: Debug {
    /// Produce one output value per row of the partition.
    ///
    /// The reader is positioned on the first row.
    fn process_partition(
        &mut self,
        reader: &mut dyn PartitionReader,
        writer: &mut PartitionWriter,
    ) -> Result<()>;
}

/// Output of an analytic function for one partition.
///
/// Accepts exactly as many values as the partition has rows.
#[derive(Debug)]
pub struct PartitionWriter {
    values: Vec<ScalarValue>,
    expected: usize,
}

impl PartitionWriter {
    pub fn new(expected: usize) -> Self {
        PartitionWriter {
            values: Vec::with_capacity(expected),
            expected,
        }
    }

    /// Write the value for the next row.
    ///
    /// Returns false once every row has a value.
    pub fn write_value(&mut self, value: ScalarValue) -> Result<bool> {
        if self.is_complete() {
            return Err(UdxError::contract("Analytic function wrote more rows than its input")
                .with_field("rows", self.expected));
        }
        self.values.push(value);
        Ok(!self.is_complete())
    }

    pub fn is_complete(&self) -> bool {
        self.values.len() >= self.expected
    }

    pub fn into_values(self) -> Result<Vec<ScalarValue>> {
        if !self.is_complete() {
            return Err(UdxError::contract("Analytic function wrote fewer rows than its input")
                .with_field("expected", self.expected)
                .with_field("written", self.values.len()));
        }
        Ok(self.values)
    }
}

impl RowSink for PartitionWriter {
    fn write(&mut self, row: Record) -> Result<bool> {
        if row.arity() != 1 {
            return Err(UdxError::contract("Analytic output rows have a single column")
                .with_field("arity", row.arity()));
        }
        let value = row.into_values().into_iter().next().unwrap_or(ScalarValue::Null);
        self.write_value(value)
    }
}

/// Analytic functions selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticKind {
    Rank,
    Lag,
    Lead,
    NthValue,
}

impl AnalyticKind {
    pub fn from_name(name: &str) -> Result<Self> {
        Ok(match name {
            "rank" => AnalyticKind::Rank,
            "lag" => AnalyticKind::Lag,
            "lead" => AnalyticKind::Lead,
            "nth_value" => AnalyticKind::NthValue,
            other => return Err(UdxError::config(format!("Unknown analytic function '{other}'"))),
        })
    }

    pub const fn name(&self) -> &'static str {
        match self {
            AnalyticKind::Rank => "rank",
            AnalyticKind::Lag => "lag",
            AnalyticKind::Lead => "lead",
            AnalyticKind::NthValue => "nth_value",
        }
    }

    /// Validate arguments and parameters, returning the output type.
    pub fn check_arguments(&self, schema: &PhaseSchema, params: &NamedParams) -> Result<DataType> {
        let args = schema.argument_columns();
        let arg_type = |idx: usize| args.get(idx).and_then(|&col| schema.datatype(col));

        match self {
            AnalyticKind::Rank => Ok(DataType::Int64),
            AnalyticKind::Lag | AnalyticKind::Lead => {
                if args.len() != 2
                    || !arg_type(0).is_some_and(|t| t.is_integer())
                    || !arg_type(1).is_some_and(|t| t.is_integer())
                {
                    return Err(UdxError::schema(format!(
                        "{} expects two arguments (INTEGER, INTEGER)",
                        self.name()
                    ))
                    .with_field("input", schema));
                }
                Ok(DataType::Int64)
            }
            AnalyticKind::NthValue => {
                let expr_type = match arg_type(0) {
                    Some(t) if t.is_numeric() => t,
                    _ => {
                        return Err(UdxError::schema("nth_value expects a numeric expression")
                            .with_field("input", schema));
                    }
                };
                match params.get_i64("n")? {
                    Some(n) => {
                        if args.len() != 1 {
                            return Err(UdxError::schema(
                                "nth_value with parameter n expects one argument (NUMERIC)",
                            )
                            .with_field("input", schema));
                        }
                        nth_value::check_n(n)?;
                    }
                    None => {
                        if args.len() != 2 || !arg_type(1).is_some_and(|t| t.is_integer()) {
                            return Err(UdxError::schema(
                                "nth_value expects two arguments (NUMERIC, INTEGER)",
                            )
                            .with_field("input", schema));
                        }
                    }
                }
                Ok(expr_type)
            }
        }
    }

    pub fn create(&self, params: &NamedParams) -> Result<Box<dyn AnalyticFunction>> {
        Ok(match self {
            AnalyticKind::Rank => Box::new(Rank::default()),
            AnalyticKind::Lag => Box::new(Lag),
            AnalyticKind::Lead => Box::new(Lead),
            AnalyticKind::NthValue => Box::new(NthValue::new(params.get_i64("n")?)),
        })
    }
}

/// Runs an analytic function over in-memory rows.
#[derive(Debug, Clone)]
pub struct AnalyticExecutor {
    kind: AnalyticKind,
    params: NamedParams,
}

impl AnalyticExecutor {
    pub fn new(kind: AnalyticKind, params: NamedParams) -> Self {
        AnalyticExecutor { kind, params }
    }

    /// Evaluate the function over `rows`.
    ///
    /// Rows are grouped by the schema's partition columns and sorted by its
    /// order columns. Every output row is the input row with the function's
    /// value appended.
    pub fn execute(&self, schema: &PhaseSchema, rows: Vec<Record>) -> Result<Vec<Record>> {
        let output_type = self.kind.check_arguments(schema, &self.params)?;
        debug!(function = self.kind.name(), %output_type, "executing analytic function");

        let mut output = Vec::with_capacity(rows.len());
        if rows.is_empty() {
            return Ok(output);
        }

        for partition in partition_rows(schema, rows) {
            let mut reader = PartitionRows::try_new(schema.clone(), partition.clone())?;
            let mut writer = PartitionWriter::new(partition.len());
            let mut function = self.kind.create(&self.params)?;
            function.process_partition(&mut reader, &mut writer)?;

            for (row, value) in partition.into_iter().zip(writer.into_values()?) {
                let mut values = row.into_values();
                values.push(value);
                output.push(Record::new(values));
            }
        }

        Ok(output)
    }
}

/// First argument column, the expression most functions operate on.
pub(crate) fn expr_column(reader: &dyn PartitionReader) -> Result<usize> {
    reader
        .schema()
        .argument_columns()
        .first()
        .copied()
        .ok_or_else(|| UdxError::schema("Analytic function expects an argument"))
}

/// Integer value of the second argument on the current row.
pub(crate) fn int_argument(reader: &dyn PartitionReader, what: &str) -> Result<i64> {
    let col = reader
        .schema()
        .argument_columns()
        .get(1)
        .copied()
        .ok_or_else(|| UdxError::schema(format!("Missing {what} argument")))?;
    reader
        .row()
        .get_i64(col)?
        .ok_or_else(|| UdxError::schema(format!("The {what} argument must not be NULL")))
}

use std::fmt;

use udx_error::{Result, UdxError};

use super::scalar::ScalarValue;

/// A single row of values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    values: Vec<ScalarValue>,
}

impl Record {
    pub fn new(values: impl IntoIterator<Item = ScalarValue>) -> Self {
        Record {
            values: values.into_iter().collect(),
        }
    }

    pub fn arity(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[ScalarValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<ScalarValue> {
        self.values
    }

    pub fn get(&self, idx: usize) -> Result<&ScalarValue> {
        self.values.get(idx).ok_or_else(|| {
            UdxError::new("Column index out of range")
                .with_field("idx", idx)
                .with_field("arity", self.values.len())
        })
    }

    /// Get an integer column, None if null.
    pub fn get_i64(&self, idx: usize) -> Result<Option<i64>> {
        match self.get(idx)? {
            ScalarValue::Null => Ok(None),
            v => v.try_as_i64().map(Some),
        }
    }

    /// Get a string column, None if null.
    pub fn get_str(&self, idx: usize) -> Result<Option<&str>> {
        match self.get(idx)? {
            ScalarValue::Null => Ok(None),
            v => v.try_as_str().map(Some),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, v) in self.values.iter().enumerate() {
            if idx > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// Build a record from a list of values convertible into scalars.
#[macro_export]
macro_rules! record {
    ($($v:expr),* $(,)?) => {
        $crate::arrays::record::Record::new([$($crate::arrays::scalar::ScalarValue::from($v)),*])
    };
}

/// Destination for rows produced by parsers, transform phases, and analytic
/// functions.
pub trait RowSink {
    /// Commit a row.
    ///
    /// Returns `false` if the sink can't accept another row. For bounded
    /// buffers this means "drain me first", for partition writers it means
    /// the partition's output is complete. Writing after `false` was
    /// returned is an error until the sink is drained.
    fn write(&mut self, row: Record) -> Result<bool>;
}

impl RowSink for Vec<Record> {
    fn write(&mut self, row: Record) -> Result<bool> {
        self.push(row);
        Ok(true)
    }
}

/// Bounded row buffer providing output backpressure to parsers.
#[derive(Debug)]
pub struct RowBuffer {
    rows: Vec<Record>,
    capacity: usize,
}

impl RowBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(UdxError::capacity(
                "Row buffer must be able to hold at least one row",
            ));
        }
        Ok(RowBuffer {
            rows: Vec::with_capacity(capacity),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.rows.len() >= self.capacity
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Drain the buffered rows, making room for more.
    pub fn take(&mut self) -> Vec<Record> {
        std::mem::replace(&mut self.rows, Vec::with_capacity(self.capacity))
    }
}

impl RowSink for RowBuffer {
    fn write(&mut self, row: Record) -> Result<bool> {
        if self.is_full() {
            return Err(UdxError::capacity("Write to full row buffer")
                .with_field("capacity", self.capacity));
        }
        self.rows.push(row);
        Ok(!self.is_full())
    }
}

use udx_error::{Result, UdxError};

use super::{AnalyticFunction, PartitionWriter, expr_column, int_argument};
use crate::arrays::scalar::ScalarValue;
use crate::pipeline::reader::PartitionReader;

/// `NTH_VALUE(expr, n)`: the value of `expr` on the n-th row (1-based) of
/// the partition, repeated for every row. NULL if the partition is shorter.
///
/// `n` is either a fixed parameter or read from the second argument of the
/// first row.
#[derive(Debug, Default)]
pub struct NthValue {
    n: Option<i64>,
}

impl NthValue {
    pub fn new(n: Option<i64>) -> Self {
        NthValue { n }
    }
}

pub(crate) fn check_n(n: i64) -> Result<usize> {
    match usize::try_from(n) {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(UdxError::schema("nth_value requires n to be at least 1").with_field("n", n)),
    }
}

impl AnalyticFunction for NthValue {
    fn process_partition(
        &mut self,
        reader: &mut dyn PartitionReader,
        writer: &mut PartitionWriter,
    ) -> Result<()> {
        let expr = expr_column(reader)?;
        let n = match self.n {
            Some(n) => check_n(n)?,
            None => check_n(int_argument(reader, "n")?)?,
        };

        let mut pos = 1;
        while pos < n && reader.next() {
            pos += 1;
        }
        let value = if pos == n {
            reader.row().get(expr)?.clone()
        } else {
            ScalarValue::Null
        };

        while writer.write_value(value.clone())? {}
        Ok(())
    }
}

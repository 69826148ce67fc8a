use udx_error::{Result, UdxError};

use super::{AnalyticFunction, PartitionWriter, expr_column, int_argument};
use crate::arrays::scalar::ScalarValue;
use crate::pipeline::reader::PartitionReader;

/// `LAG(expr, offset)`: the value of `expr` `offset` rows before the current
/// row, NULL for the first `offset` rows.
///
/// The offset is taken from the first row of the partition.
#[derive(Debug, Default)]
pub struct Lag;

impl AnalyticFunction for Lag {
    fn process_partition(
        &mut self,
        reader: &mut dyn PartitionReader,
        writer: &mut PartitionWriter,
    ) -> Result<()> {
        let expr = expr_column(reader)?;
        let offset = partition_offset(reader)?;

        let mut written = 0;
        loop {
            let value = if written < offset {
                ScalarValue::Null
            } else {
                let value = reader.row().get(expr)?.clone();
                reader.next();
                value
            };
            written += 1;
            if !writer.write_value(value)? {
                return Ok(());
            }
        }
    }
}

/// Offset argument shared by lag and lead.
pub(crate) fn partition_offset(reader: &dyn PartitionReader) -> Result<usize> {
    let offset = int_argument(reader, "offset")?;
    usize::try_from(offset).map_err(|_| {
        UdxError::schema("The offset argument must not be negative").with_field("offset", offset)
    })
}

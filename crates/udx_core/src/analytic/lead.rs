use udx_error::Result;

use super::lag::partition_offset;
use super::{AnalyticFunction, PartitionWriter, expr_column};
use crate::arrays::scalar::ScalarValue;
use crate::pipeline::reader::PartitionReader;

/// `LEAD(expr, offset)`: the value of `expr` `offset` rows after the current
/// row, NULL for the last `offset` rows.
#[derive(Debug, Default)]
pub struct Lead;

impl AnalyticFunction for Lead {
    fn process_partition(
        &mut self,
        reader: &mut dyn PartitionReader,
        writer: &mut PartitionWriter,
    ) -> Result<()> {
        let expr = expr_column(reader)?;
        let offset = partition_offset(reader)?;

        let mut skipped = 0;
        loop {
            if skipped < offset {
                skipped += 1;
            } else if !writer.write_value(reader.row().get(expr)?.clone())? {
                return Ok(());
            }
            if !reader.next() {
                break;
            }
        }

        while writer.write_value(ScalarValue::Null)? {}
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use udx_error::ErrorKind;

    use super::*;
    use crate::analytic::tests::int_schema;
    use crate::pipeline::reader::PartitionRows;
    use crate::record;

    fn lead(values: &[i64], offset: i64) -> Result<Vec<ScalarValue>> {
        let rows = values
            .iter()
            .enumerate()
            .map(|(i, &v)| record!["p", i as i64, v, offset])
            .collect();
        let mut reader = PartitionRows::try_new(int_schema(2), rows)?;
        let mut writer = PartitionWriter::new(values.len());
        Lead.process_partition(&mut reader, &mut writer)?;
        writer.into_values()
    }

    #[test]
    fn lead_by_one() {
        let out = lead(&[10, 20, 30, 40], 1).unwrap();
        assert_eq!(
            vec![
                ScalarValue::Int64(20),
                ScalarValue::Int64(30),
                ScalarValue::Int64(40),
                ScalarValue::Null,
            ],
            out
        );
    }

    #[test]
    fn lead_zero_is_identity() {
        let out = lead(&[5, 6], 0).unwrap();
        assert_eq!(vec![ScalarValue::Int64(5), ScalarValue::Int64(6)], out);
    }

    #[test]
    fn offset_past_partition_is_all_null() {
        assert_eq!(vec![ScalarValue::Null; 3], lead(&[1, 2, 3], 3).unwrap());
    }

    #[test]
    fn single_row() {
        assert_eq!(vec![ScalarValue::Null], lead(&[1], 1).unwrap());
    }

    #[test]
    fn negative_offset() {
        let err = lead(&[1], -2).unwrap_err();
        assert_eq!(ErrorKind::Schema, err.kind());
    }
}

use udx_error::Result;

use super::{AnalyticFunction, PartitionWriter};
use crate::arrays::scalar::ScalarValue;
use crate::pipeline::reader::PartitionReader;

/// Standard `RANK()`: ties share a rank, and the next distinct order key
/// skips ahead by the size of the tie.
#[derive(Debug, Default)]
pub struct Rank {
    rank: i64,
    run: i64,
}

impl AnalyticFunction for Rank {
    fn process_partition(
        &mut self,
        reader: &mut dyn PartitionReader,
        writer: &mut PartitionWriter,
    ) -> Result<()> {
        self.rank = 0;
        self.run = 1;

        loop {
            if reader.is_new_order_key() {
                self.rank += self.run;
                self.run = 1;
            } else {
                self.run += 1;
            }
            if !writer.write_value(ScalarValue::Int64(self.rank))? || !reader.next() {
                return Ok(());
            }
        }
    }
}

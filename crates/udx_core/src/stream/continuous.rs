use tracing::debug;
use udx_error::Result;

use super::integer::parse_integer_token;
use super::reservation::ReservationReader;
use crate::arrays::record::{Record, RowSink};
use crate::arrays::scalar::ScalarValue;

/// Integer parser driving its own input through a [`ReservationReader`].
///
/// Produces the same rows as [`IntegerParser`](super::integer::IntegerParser)
/// for the same bytes, regardless of how the reader's input is chunked.
#[derive(Debug, Default)]
pub struct ContinuousIntegerParser {
    rows: usize,
}

impl ContinuousIntegerParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse until the reader is exhausted or the sink stops accepting rows.
    ///
    /// Returns the number of rows written during this call.
    pub fn run(&mut self, reader: &mut dyn ReservationReader, sink: &mut dyn RowSink) -> Result<usize> {
        let start = self.rows;

        loop {
            let mut pos = 0;
            while reader.reserve(pos + 1)? == pos + 1 && is_digit_at(reader, pos) {
                pos += 1;
            }

            if pos > 0 {
                let value = parse_integer_token(&reader.data()[..pos])?;
                reader.seek(pos)?;
                pos = 0;
                self.rows += 1;
                if !sink.write(Record::new([ScalarValue::Int64(value)]))? {
                    debug!(rows = self.rows, "sink closed, stopping continuous parse");
                    break;
                }
            }

            while reader.reserve(pos + 1)? == pos + 1 && !is_digit_at(reader, pos) {
                pos += 1;
            }

            if pos == 0 && reader.reserve(1)? == 0 {
                break;
            }
            reader.seek(pos)?;
        }

        Ok(self.rows - start)
    }
}

fn is_digit_at(reader: &dyn ReservationReader, pos: usize) -> bool {
    reader.byte_at(pos).is_some_and(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use udx_error::ErrorKind;

    use super::*;
    use crate::stream::reservation::ChunkedReservationReader;

    fn run_chunks<'a>(chunks: impl IntoIterator<Item = &'a [u8]>) -> Result<Vec<i64>> {
        let mut reader = ChunkedReservationReader::new(chunks.into_iter().collect::<Vec<_>>());
        let mut rows = Vec::new();
        ContinuousIntegerParser::new().run(&mut reader, &mut rows)?;
        Ok(rows.iter().map(|r| r.get_i64(0).unwrap().unwrap()).collect())
    }

    #[test]
    fn block_input() {
        assert_eq!(vec![1, 23, 456], run_chunks([&b"1 23\n456"[..]]).unwrap());
    }

    #[test]
    fn byte_at_a_time_matches_block() {
        let input = b"  12,, 345\n6 78901  ";
        let block = run_chunks([&input[..]]).unwrap();
        let bytes = run_chunks(input.chunks(1)).unwrap();
        assert_eq!(vec![12, 345, 6, 78901], block);
        assert_eq!(block, bytes);
    }

    #[test]
    fn leading_separators_and_empty() {
        assert_eq!(Vec::<i64>::new(), run_chunks([&b" ,\n"[..]]).unwrap());
        assert_eq!(Vec::<i64>::new(), run_chunks([&b""[..]]).unwrap());
        assert_eq!(vec![7], run_chunks([&b"x7"[..]]).unwrap());
    }

    #[test]
    fn overflow_is_fatal() {
        let err = run_chunks([&b"1 99999999999999999999"[..]]).unwrap_err();
        assert_eq!(ErrorKind::MalformedInput, err.kind());
    }

    #[derive(Default)]
    struct ClosesAfter(usize, Vec<Record>);

    impl RowSink for ClosesAfter {
        fn write(&mut self, row: Record) -> Result<bool> {
            self.1.push(row);
            Ok(self.1.len() < self.0)
        }
    }

    #[test]
    fn closed_sink_stops_early() {
        let mut reader = ChunkedReservationReader::new([&b"1 2 3 4"[..]]);
        let mut sink = ClosesAfter(2, Vec::new());
        let n = ContinuousIntegerParser::new().run(&mut reader, &mut sink).unwrap();
        assert_eq!(2, n);
        assert_eq!(b" 3 4", reader.data());
    }
}

use tracing::trace;
use udx_error::{Result, UdxError};

use super::buffer::ByteBuffer;
use super::{InputState, Parser, StreamState};
use crate::arrays::record::{Record, RowSink};
use crate::arrays::scalar::ScalarValue;

/// Convert a run of ASCII digits to an integer.
///
/// Errors on non-digits and on overflow, reporting the offending fragment.
pub fn parse_integer_token(token: &[u8]) -> Result<i64> {
    if token.is_empty() {
        return Err(UdxError::malformed("Empty integer token"));
    }

    let mut value: i64 = 0;
    for &b in token {
        if !b.is_ascii_digit() {
            return Err(UdxError::malformed("Invalid digit in integer token")
                .with_field("token", String::from_utf8_lossy(token)));
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add((b - b'0') as i64))
            .ok_or_else(|| {
                UdxError::malformed("Integer token out of range")
                    .with_field("token", String::from_utf8_lossy(token))
            })?;
    }

    Ok(value)
}

/// Parses a stream of decimal integers separated by arbitrary non-digit
/// bytes.
///
/// Separators are discarded and runs of separators collapse, so no empty
/// tokens are produced. A digit run touching the end of the buffer is left
/// unconsumed until either more input arrives or the stream ends.
#[derive(Debug, Default)]
pub struct IntegerParser {
    /// Number of digits of the current token that have already been scanned.
    ///
    /// Relative to the input offset, which stays parked at the token start
    /// while the token is incomplete. Lets us resume at the exact byte we
    /// stopped at instead of rescanning the token on every refill.
    scanned: usize,
}

impl IntegerParser {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Parser for IntegerParser {
    fn process(
        &mut self,
        input: &mut ByteBuffer,
        state: InputState,
        sink: &mut dyn RowSink,
    ) -> Result<StreamState> {
        loop {
            if self.scanned == 0 {
                let skip = input
                    .unconsumed()
                    .iter()
                    .take_while(|b| !b.is_ascii_digit())
                    .count();
                input.advance(skip)?;
            }

            let data = input.unconsumed();
            if self.scanned > data.len() {
                return Err(UdxError::contract(
                    "Input buffer lost bytes of a partially scanned token",
                )
                .with_field("scanned", self.scanned)
                .with_field("available", data.len()));
            }

            if data.is_empty() {
                return Ok(if state.is_end_of_stream() {
                    StreamState::Done
                } else {
                    StreamState::NeedsInput
                });
            }

            let end = self.scanned
                + data[self.scanned..]
                    .iter()
                    .take_while(|b| b.is_ascii_digit())
                    .count();

            if end == data.len() && !state.is_end_of_stream() {
                // Token might continue in the next buffer.
                trace!(scanned = end, "integer token cut at buffer boundary");
                self.scanned = end;
                return Ok(StreamState::NeedsInput);
            }

            let value = parse_integer_token(&data[..end])?;
            self.scanned = 0;
            input.advance(end)?;

            let more = sink.write(Record::new([ScalarValue::Int64(value)]))?;
            if !more {
                if input.remaining() == 0 && state.is_end_of_stream() {
                    return Ok(StreamState::Done);
                }
                return Ok(StreamState::NeedsOutputSpace);
            }
        }
    }
}

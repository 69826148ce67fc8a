use tracing::trace;
use udx_error::{Result, UdxError};

use super::buffer::ByteBuffer;
use super::{Filter, InputState, StreamState};

/// Rewrites every occurrence of one byte to another, leaving all other bytes
/// untouched.
#[derive(Debug, Clone)]
pub struct ByteSubstitutionFilter {
    from: u8,
    to: u8,
    /// Only advance half the available output space per call.
    throttle: bool,
}

impl ByteSubstitutionFilter {
    pub fn new(from: u8, to: u8) -> Self {
        ByteSubstitutionFilter {
            from,
            to,
            throttle: false,
        }
    }

    pub fn with_throttle(mut self, throttle: bool) -> Self {
        self.throttle = throttle;
        self
    }

    /// Parse a `X:Y` pair of single characters.
    pub fn from_pair(pair: &str) -> Result<Self> {
        match pair.as_bytes() {
            [from, b':', to] => Ok(Self::new(*from, *to)),
            _ => Err(UdxError::config(
                "Substitution must be two single-byte characters separated by ':'",
            )
            .with_field("value", pair)),
        }
    }

    /// The `(from, to)` byte pair.
    pub fn bytes(&self) -> (u8, u8) {
        (self.from, self.to)
    }

    fn step_size(&self, available: usize, space: usize) -> usize {
        if self.throttle {
            available.min((space / 2).max(1))
        } else {
            available.min(space)
        }
    }
}

impl Filter for ByteSubstitutionFilter {
    fn process(
        &mut self,
        input: &mut ByteBuffer,
        state: InputState,
        output: &mut ByteBuffer,
    ) -> Result<StreamState> {
        if output.capacity() == 0 {
            return Err(UdxError::capacity("Substitution filter got a zero sized output buffer"));
        }

        let n = self.step_size(input.remaining(), output.spare_capacity());
        if n > 0 {
            let src = &input.unconsumed()[..n];
            let dst = &mut output.spare_mut()[..n];
            for (d, &s) in dst.iter_mut().zip(src) {
                *d = if s == self.from { self.to } else { s };
            }
            output.commit(n)?;
            input.advance(n)?;
            trace!(n, "substituted bytes");
        }

        if input.remaining() == 0 {
            return Ok(if state.is_end_of_stream() {
                StreamState::Done
            } else {
                StreamState::NeedsInput
            });
        }

        Ok(StreamState::NeedsOutputSpace)
    }
}

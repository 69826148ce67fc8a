//! Streaming load stages: sources produce bytes, filters rewrite bytes,
//! parsers turn bytes into records.
//!
//! All stages follow the same bounded-buffer protocol. The caller hands a
//! stage its buffers, the stage does as much work as the buffers allow and
//! reports a [`StreamState`] telling the caller what to do before the next
//! call. Stages never block and never keep references into caller buffers
//! across calls.

pub mod buffer;
pub mod continuous;
pub mod driver;
pub mod integer;
pub mod reservation;
pub mod search_replace;
pub mod source;
pub mod substitute;

use std::fmt::Debug;

use buffer::ByteBuffer;
use udx_error::Result;

use crate::arrays::record::RowSink;

/// Outcome of a single processing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// All input was consumed, or the remaining bytes are an incomplete
    /// token. Supply more input (appending to any unconsumed bytes) and call
    /// again.
    NeedsInput,
    /// Output filled up before input was exhausted. Drain the output and
    /// call again with the same input.
    NeedsOutputSpace,
    /// End of stream reached and everything was flushed. Stop calling.
    Done,
}

/// Whether more input may follow the current buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    More,
    EndOfStream,
}

impl InputState {
    pub const fn is_end_of_stream(&self) -> bool {
        matches!(self, InputState::EndOfStream)
    }
}

impl From<bool> for InputState {
    /// `true` means the input is complete.
    fn from(complete: bool) -> Self {
        if complete {
            InputState::EndOfStream
        } else {
            InputState::More
        }
    }
}

/// Turns bytes into records.
pub trait Parser: Debug {
    fn process(
        &mut self,
        input: &mut ByteBuffer,
        state: InputState,
        sink: &mut dyn RowSink,
    ) -> Result<StreamState>;
}

/// Turns bytes into other bytes.
pub trait Filter: Debug {
    fn process(
        &mut self,
        input: &mut ByteBuffer,
        state: InputState,
        output: &mut ByteBuffer,
    ) -> Result<StreamState>;
}

/// Produces bytes.
pub trait Source: Debug {
    /// Acquire resources (open files, seek). Called once before `process`.
    fn setup(&mut self) -> Result<()>;

    /// Fill `output` with as many bytes as fit.
    ///
    /// Returns `NeedsOutputSpace` if the buffer filled up and more bytes
    /// remain, `Done` once the source is exhausted.
    fn process(&mut self, output: &mut ByteBuffer) -> Result<StreamState>;

    /// Release resources. Also happens on drop, calling this just makes the
    /// release point explicit and surfaces close errors.
    fn destroy(&mut self) -> Result<()>;
}

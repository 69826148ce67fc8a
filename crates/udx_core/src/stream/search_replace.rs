use tracing::trace;
use udx_error::{Result, UdxError};

use super::buffer::ByteBuffer;
use super::{Filter, InputState, StreamState};
use crate::config::params::NamedParams;

pub const MAX_PATTERN_LEN: usize = 1000;

/// Replaces every occurrence of a byte pattern with another byte string.
///
/// Matches spanning a buffer boundary are found: a trailing proper prefix of
/// the pattern is left unconsumed until more input arrives.
#[derive(Debug, Clone)]
pub struct SearchReplaceFilter {
    pattern: Vec<u8>,
    replace_with: Vec<u8>,
}

impl SearchReplaceFilter {
    pub fn try_new(pattern: impl Into<Vec<u8>>, replace_with: impl Into<Vec<u8>>) -> Result<Self> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(UdxError::config(
                "Can't have zero-length 'pattern', must have something to match with",
            ));
        }
        if pattern.len() > MAX_PATTERN_LEN {
            return Err(UdxError::config("'pattern' is too long")
                .with_field("len", pattern.len())
                .with_field("max", MAX_PATTERN_LEN));
        }

        Ok(SearchReplaceFilter {
            pattern,
            replace_with: replace_with.into(),
        })
    }

    /// Build from exactly the `pattern` and `replace_with` parameters.
    pub fn try_from_params(params: &NamedParams) -> Result<Self> {
        let mut names: Vec<_> = params.names().collect();
        names.sort_unstable();
        if names != ["pattern", "replace_with"] {
            return Err(UdxError::config(
                "Invalid arguments to search and replace filter, specify 'pattern' and 'replace_with'",
            )
            .with_field("got", names.join(",")));
        }

        Self::try_new(
            params.require_string("pattern")?,
            params.require_string("replace_with")?,
        )
    }

    /// Parse `PATTERN:WITH`, splitting on the first ':'.
    pub fn from_pair(pair: &str) -> Result<Self> {
        let (pattern, replace_with) = pair.split_once(':').ok_or_else(|| {
            UdxError::config("Replacement must be of the form PATTERN:WITH").with_field("value", pair)
        })?;
        Self::try_new(pattern, replace_with)
    }

    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    pub fn replace_with(&self) -> &[u8] {
        &self.replace_with
    }

    /// Whether `data` could hold the start of a match.
    fn is_candidate(&self, data: &[u8], end_of_stream: bool) -> bool {
        data.starts_with(&self.pattern) || (!end_of_stream && self.pattern.starts_with(data))
    }
}

impl Filter for SearchReplaceFilter {
    fn process(
        &mut self,
        input: &mut ByteBuffer,
        state: InputState,
        output: &mut ByteBuffer,
    ) -> Result<StreamState> {
        let eos = state.is_end_of_stream();

        loop {
            let data = input.unconsumed();
            if data.is_empty() {
                return Ok(if eos {
                    StreamState::Done
                } else {
                    StreamState::NeedsInput
                });
            }

            if data.starts_with(&self.pattern) {
                if output.spare_capacity() < self.replace_with.len() {
                    if output.capacity() < self.replace_with.len() {
                        return Err(UdxError::capacity(
                            "Output buffer smaller than the replacement string",
                        )
                        .with_field("capacity", output.capacity())
                        .with_field("needed", self.replace_with.len()));
                    }
                    return Ok(StreamState::NeedsOutputSpace);
                }
                output.put_slice(&self.replace_with)?;
                input.advance(self.pattern.len())?;
                continue;
            }

            if !eos && self.pattern.starts_with(data) {
                trace!(len = data.len(), "partial pattern at end of buffer");
                return Ok(StreamState::NeedsInput);
            }

            let space = output.spare_capacity();
            if space == 0 {
                return Ok(StreamState::NeedsOutputSpace);
            }

            // Position 0 is not a candidate, so at least one byte gets copied.
            let first = self.pattern[0];
            let next = (1..data.len())
                .find(|&i| data[i] == first && self.is_candidate(&data[i..], eos))
                .unwrap_or(data.len());
            let n = next.min(space);

            output.put_slice(&data[..n])?;
            input.advance(n)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use udx_error::ErrorKind;

    use super::*;
    use crate::stream::driver::filter_chunks;

    fn replace(pattern: &str, with: &str, chunks: &[&[u8]], out_size: usize) -> Vec<u8> {
        let mut filter = SearchReplaceFilter::try_new(pattern, with).unwrap();
        filter_chunks(&mut filter, chunks.iter().copied(), out_size).unwrap()
    }

    #[test]
    fn replaces_all_occurrences() {
        assert_eq!(
            b"a-b-c".to_vec(),
            replace("::", "-", &[b"a::b::c"], 64)
        );
    }

    #[test]
    fn pattern_across_boundary() {
        assert_eq!(
            b"hello world".to_vec(),
            replace("WORLD", "world", &[b"hello WO", b"R", b"LD"], 64)
        );
    }

    #[test]
    fn prefix_at_end_of_stream_is_copied() {
        assert_eq!(b"abcWOR".to_vec(), replace("WORLD", "x", &[b"abc", b"WOR"], 64));
    }

    #[test]
    fn overlapping_candidates() {
        // "aab" split so the first 'a' looks like a prefix of the pattern.
        assert_eq!(b"aX".to_vec(), replace("ab", "X", &[b"a", b"a", b"b"], 64));
    }

    #[test]
    fn growing_replacement_with_small_output() {
        assert_eq!(
            b"1<->2<->3".to_vec(),
            replace(",", "<->", &[b"1,2,3"], 3)
        );
    }

    #[test]
    fn empty_replacement() {
        assert_eq!(b"abc".to_vec(), replace("--", "", &[b"a--b----c"], 2));
    }

    #[test]
    fn replacement_larger_than_output() {
        let mut filter = SearchReplaceFilter::try_new(",", "<->").unwrap();
        let err = filter_chunks(&mut filter, [&b"1,2"[..]], 2).unwrap_err();
        assert_eq!(ErrorKind::Capacity, err.kind());
    }

    #[test]
    fn pattern_validation() {
        SearchReplaceFilter::try_new("", "x").unwrap_err();
        SearchReplaceFilter::try_new(vec![b'a'; 1001], "x").unwrap_err();
        SearchReplaceFilter::try_new(vec![b'a'; 1000], "x").unwrap();
    }

    #[test]
    fn from_params_requires_both() {
        let params = NamedParams::new()
            .with("pattern", "a")
            .with("replace_with", "b");
        SearchReplaceFilter::try_from_params(&params).unwrap();

        let params = NamedParams::new().with("pattern", "a");
        let err = SearchReplaceFilter::try_from_params(&params).unwrap_err();
        assert_eq!(ErrorKind::Config, err.kind());
    }
}

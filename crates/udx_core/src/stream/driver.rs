//! Host side of the streaming protocol.
//!
//! Wires a source, an optional filter, and a parser together and reacts to
//! every [`StreamState`] the way the database would: compact and refill on
//! `NeedsInput`, drain on `NeedsOutputSpace`, stop on `Done`.

use std::fmt;
use std::io::{self, Read};

use tracing::{debug, trace, warn};
use udx_error::{Result, UdxError};

use super::buffer::ByteBuffer;
use super::continuous::ContinuousIntegerParser;
use super::integer::IntegerParser;
use super::reservation::{ReadReservationReader, ReservationReader};
use super::search_replace::SearchReplaceFilter;
use super::substitute::ByteSubstitutionFilter;
use super::{Filter, InputState, Parser, Source, StreamState};
use crate::arrays::record::{Record, RowBuffer, RowSink};
use crate::config::load::LoadConfig;
use crate::config::params::NamedParams;

/// Counters for a completed load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Bytes produced by the source, before filtering.
    pub bytes_read: u64,
    pub rows: u64,
    pub batches: u64,
}

impl LoadStats {
    fn merge(&mut self, other: LoadStats) {
        self.bytes_read += other.bytes_read;
        self.rows += other.rows;
        self.batches += other.batches;
    }
}

impl fmt::Display for LoadStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bytes_read: {}, rows: {}, batches: {}",
            self.bytes_read, self.rows, self.batches
        )
    }
}

/// Parser implementations selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    BasicInteger,
    ContinuousInteger,
}

impl ParserKind {
    pub fn from_name(name: &str) -> Result<Self> {
        Ok(match name {
            "basic_integer" | "bounded" => ParserKind::BasicInteger,
            "continuous_integer" | "continuous" => ParserKind::ContinuousInteger,
            other => {
                return Err(UdxError::config(format!("Unknown parser '{other}'")));
            }
        })
    }

    pub const fn name(&self) -> &'static str {
        match self {
            ParserKind::BasicInteger => "basic_integer",
            ParserKind::ContinuousInteger => "continuous_integer",
        }
    }
}

/// Filter implementations selectable by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterKind {
    Substitute { from: u8, to: u8 },
    SearchReplace { pattern: Vec<u8>, replace_with: Vec<u8> },
}

impl FilterKind {
    /// Build from a filter name and its parameters.
    ///
    /// `substitute` takes optional single character `from` and `to`
    /// parameters defaulting to '1' and '2'. `search_replace` requires
    /// `pattern` and `replace_with`.
    pub fn from_name(name: &str, params: &NamedParams) -> Result<Self> {
        match name {
            "substitute" => {
                let byte_param = |name: &str, default: u8| -> Result<u8> {
                    match params.get_string(name)? {
                        None => Ok(default),
                        Some(s) if s.len() == 1 => Ok(s.as_bytes()[0]),
                        Some(s) => Err(UdxError::config(format!(
                            "Parameter '{name}' must be a single byte"
                        ))
                        .with_field("value", s)),
                    }
                };
                Ok(FilterKind::Substitute {
                    from: byte_param("from", b'1')?,
                    to: byte_param("to", b'2')?,
                })
            }
            "search_replace" => {
                let filter = SearchReplaceFilter::try_from_params(params)?;
                Ok(FilterKind::SearchReplace {
                    pattern: filter.pattern().to_vec(),
                    replace_with: filter.replace_with().to_vec(),
                })
            }
            other => Err(UdxError::config(format!("Unknown filter '{other}'"))),
        }
    }

    /// Build from the `X:Y` shorthand of `substitute` or the `PATTERN:WITH`
    /// shorthand of `search_replace`.
    pub fn from_pair(name: &str, pair: &str) -> Result<Self> {
        match name {
            "substitute" => {
                let (from, to) = ByteSubstitutionFilter::from_pair(pair)?.bytes();
                Ok(FilterKind::Substitute { from, to })
            }
            "search_replace" => {
                let filter = SearchReplaceFilter::from_pair(pair)?;
                Ok(FilterKind::SearchReplace {
                    pattern: filter.pattern().to_vec(),
                    replace_with: filter.replace_with().to_vec(),
                })
            }
            other => Err(UdxError::config(format!("Unknown filter '{other}'"))),
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            FilterKind::Substitute { .. } => "substitute",
            FilterKind::SearchReplace { .. } => "search_replace",
        }
    }

    pub fn create(&self, config: &LoadConfig) -> Result<Box<dyn Filter>> {
        Ok(match self {
            FilterKind::Substitute { from, to } => {
                if config.substitution_throttle {
                    warn!("substitution throttle enabled, filter advances at most half the output space per call");
                }
                Box::new(
                    ByteSubstitutionFilter::new(*from, *to)
                        .with_throttle(config.substitution_throttle),
                )
            }
            FilterKind::SearchReplace {
                pattern,
                replace_with,
            } => Box::new(SearchReplaceFilter::try_new(
                pattern.clone(),
                replace_with.clone(),
            )?),
        })
    }
}

/// Runs loads with a fixed parser and optional filter.
///
/// Every source gets fresh filter and parser instances.
#[derive(Debug, Clone)]
pub struct LoadDriver {
    config: LoadConfig,
    parser: ParserKind,
    filter: Option<FilterKind>,
}

impl LoadDriver {
    pub fn new(config: LoadConfig, parser: ParserKind) -> Self {
        LoadDriver {
            config,
            parser,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: FilterKind) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// Load every source in order, emitting row batches to `on_batch`.
    pub fn run_sources(
        &self,
        sources: Vec<Box<dyn Source>>,
        on_batch: &mut dyn FnMut(Vec<Record>) -> Result<()>,
    ) -> Result<LoadStats> {
        let mut stats = LoadStats::default();
        for mut source in sources {
            stats.merge(self.run_source(source.as_mut(), on_batch)?);
        }
        Ok(stats)
    }

    /// Load a single source.
    ///
    /// The source is set up before and destroyed after the load, even if the
    /// load fails.
    pub fn run_source(
        &self,
        source: &mut dyn Source,
        on_batch: &mut dyn FnMut(Vec<Record>) -> Result<()>,
    ) -> Result<LoadStats> {
        source.setup()?;
        let result = self.load(source, on_batch);
        let destroyed = source.destroy();
        let stats = result?;
        destroyed?;
        debug!(parser = self.parser.name(), %stats, "load complete");
        Ok(stats)
    }

    fn load(
        &self,
        source: &mut dyn Source,
        on_batch: &mut dyn FnMut(Vec<Record>) -> Result<()>,
    ) -> Result<LoadStats> {
        let mut filter = self
            .filter
            .as_ref()
            .map(|f| f.create(&self.config))
            .transpose()?;

        let source_stage = SourceStage::new(source, self.config.input_buffer_size);
        let mut stage: Box<dyn ByteStage + '_> = match filter.as_deref_mut() {
            Some(filter) => Box::new(FilterStage::new(
                Box::new(source_stage),
                filter,
                self.config.output_buffer_size,
            )),
            None => Box::new(source_stage),
        };

        let mut stats = LoadStats::default();
        match self.parser {
            ParserKind::BasicInteger => {
                drive_parser(
                    &mut IntegerParser::new(),
                    stage.as_mut(),
                    self.config.batch_size,
                    on_batch,
                    &mut stats,
                )?;
                stats.bytes_read = stage.bytes_read();
            }
            ParserKind::ContinuousInteger => {
                let reader = StageReader::new(stage);
                let mut reader = ReadReservationReader::new(reader, self.config.reserve_read_size)?;
                let mut sink = BatchSink::new(self.config.batch_size, on_batch, &mut stats);
                ContinuousIntegerParser::new().run(&mut reader, &mut sink)?;
                sink.flush()?;
                stats.bytes_read = reader.into_inner().stage.bytes_read();
            }
        }

        Ok(stats)
    }

    /// Run a source through a filter only, handing filtered bytes to
    /// `on_bytes`.
    pub fn filter_source(
        config: &LoadConfig,
        source: &mut dyn Source,
        filter: &FilterKind,
        on_bytes: &mut dyn FnMut(&[u8]) -> Result<()>,
    ) -> Result<LoadStats> {
        source.setup()?;
        let result = filter_all(config, source, filter, on_bytes);
        let destroyed = source.destroy();
        let stats = result?;
        destroyed?;
        Ok(stats)
    }
}

fn filter_all(
    config: &LoadConfig,
    source: &mut dyn Source,
    filter: &FilterKind,
    on_bytes: &mut dyn FnMut(&[u8]) -> Result<()>,
) -> Result<LoadStats> {
    let mut filter = filter.create(config)?;
    let mut stage = FilterStage::new(
        Box::new(SourceStage::new(source, config.input_buffer_size)),
        filter.as_mut(),
        config.output_buffer_size,
    );

    let mut stats = LoadStats::default();
    while let Some(chunk) = stage.next_chunk()? {
        on_bytes(&chunk)?;
        stats.batches += 1;
    }
    stats.bytes_read = stage.bytes_read();
    Ok(stats)
}

/// Run the continuous integer parser over a reader.
pub fn run_continuous(
    reader: impl Read,
    config: &LoadConfig,
    on_batch: &mut dyn FnMut(Vec<Record>) -> Result<()>,
) -> Result<LoadStats> {
    let mut reader = ReadReservationReader::new(reader, config.reserve_read_size)?;
    let mut stats = LoadStats::default();
    let mut sink = BatchSink::new(config.batch_size, on_batch, &mut stats);
    ContinuousIntegerParser::new().run(&mut reader, &mut sink)?;
    sink.flush()?;
    stats.bytes_read = reader.consumed();
    Ok(stats)
}

/// Feed `chunks` to `parser` one at a time, collecting every row.
///
/// The row buffer holds `batch_size` rows so parsers get exercised with
/// output backpressure.
pub fn parse_chunks<'a>(
    parser: &mut dyn Parser,
    chunks: impl IntoIterator<Item = &'a [u8]>,
    batch_size: usize,
) -> Result<Vec<Record>> {
    let mut stage = ChunkStage {
        chunks: chunks.into_iter(),
        bytes: 0,
    };
    let mut rows = Vec::new();
    let mut stats = LoadStats::default();
    drive_parser(
        parser,
        &mut stage,
        batch_size,
        &mut |batch| {
            rows.extend(batch);
            Ok(())
        },
        &mut stats,
    )?;
    Ok(rows)
}

/// Feed `chunks` through `filter` with an output buffer of `output_size`,
/// collecting the filtered bytes.
pub fn filter_chunks<'a>(
    filter: &mut dyn Filter,
    chunks: impl IntoIterator<Item = &'a [u8]>,
    output_size: usize,
) -> Result<Vec<u8>> {
    let upstream = ChunkStage {
        chunks: chunks.into_iter(),
        bytes: 0,
    };
    let mut stage = FilterStage::new(Box::new(upstream), filter, output_size);
    let mut out = Vec::new();
    while let Some(chunk) = stage.next_chunk()? {
        out.extend_from_slice(&chunk);
    }
    Ok(out)
}

fn drive_parser(
    parser: &mut dyn Parser,
    stage: &mut dyn ByteStage,
    batch_size: usize,
    on_batch: &mut dyn FnMut(Vec<Record>) -> Result<()>,
    stats: &mut LoadStats,
) -> Result<()> {
    let mut rows = RowBuffer::new(batch_size)?;
    let mut input = ByteBuffer::from_bytes(Vec::new());
    let mut state = InputState::More;

    loop {
        match parser.process(&mut input, state, &mut rows)? {
            StreamState::NeedsInput => {
                if state.is_end_of_stream() {
                    return Err(UdxError::contract("Parser requested input after end of stream"));
                }
                input.compact();
                match stage.next_chunk()? {
                    Some(chunk) => input.extend_from_slice(&chunk),
                    None => state = InputState::EndOfStream,
                }
            }
            StreamState::NeedsOutputSpace => {
                if rows.is_empty() {
                    return Err(UdxError::contract(
                        "Parser requested output space without producing rows",
                    ));
                }
                emit(&mut rows, on_batch, stats)?;
            }
            StreamState::Done => {
                emit(&mut rows, on_batch, stats)?;
                return Ok(());
            }
        }
    }
}

fn emit(
    rows: &mut RowBuffer,
    on_batch: &mut dyn FnMut(Vec<Record>) -> Result<()>,
    stats: &mut LoadStats,
) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let batch = rows.take();
    trace!(rows = batch.len(), "emitting batch");
    stats.rows += batch.len() as u64;
    stats.batches += 1;
    on_batch(batch)
}

/// Row sink that hands full batches to a callback and never refuses rows.
struct BatchSink<'a> {
    batch: Vec<Record>,
    batch_size: usize,
    on_batch: &'a mut dyn FnMut(Vec<Record>) -> Result<()>,
    stats: &'a mut LoadStats,
}

impl<'a> BatchSink<'a> {
    fn new(
        batch_size: usize,
        on_batch: &'a mut dyn FnMut(Vec<Record>) -> Result<()>,
        stats: &'a mut LoadStats,
    ) -> Self {
        BatchSink {
            batch: Vec::with_capacity(batch_size),
            batch_size: batch_size.max(1),
            on_batch,
            stats,
        }
    }

    fn flush(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let batch = std::mem::replace(&mut self.batch, Vec::with_capacity(self.batch_size));
        self.stats.rows += batch.len() as u64;
        self.stats.batches += 1;
        (self.on_batch)(batch)
    }
}

impl RowSink for BatchSink<'_> {
    fn write(&mut self, row: Record) -> Result<bool> {
        self.batch.push(row);
        if self.batch.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(true)
    }
}

/// Upstream producer of byte chunks for the next stage.
trait ByteStage {
    /// Next chunk of bytes, `None` once the stream is complete. Chunks may be
    /// empty.
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;

    /// Bytes produced by the originating source so far.
    fn bytes_read(&self) -> u64;
}

struct ChunkStage<I> {
    chunks: I,
    bytes: u64,
}

impl<I> ByteStage for ChunkStage<I>
where
    I: Iterator,
    I::Item: AsRef<[u8]>,
{
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.chunks.next().map(|chunk| {
            let chunk = chunk.as_ref();
            self.bytes += chunk.len() as u64;
            chunk.to_vec()
        }))
    }

    fn bytes_read(&self) -> u64 {
        self.bytes
    }
}

struct SourceStage<'a> {
    source: &'a mut dyn Source,
    buf: ByteBuffer,
    done: bool,
    bytes: u64,
}

impl<'a> SourceStage<'a> {
    fn new(source: &'a mut dyn Source, buffer_size: usize) -> Self {
        SourceStage {
            source,
            buf: ByteBuffer::with_capacity(buffer_size),
            done: false,
            bytes: 0,
        }
    }
}

impl ByteStage for SourceStage<'_> {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.done {
            return Ok(None);
        }
        match self.source.process(&mut self.buf)? {
            StreamState::Done => self.done = true,
            StreamState::NeedsOutputSpace => (),
            StreamState::NeedsInput => {
                return Err(UdxError::contract("Source requested input"));
            }
        }
        let chunk = self.buf.take_filled();
        self.bytes += chunk.len() as u64;
        Ok(Some(chunk))
    }

    fn bytes_read(&self) -> u64 {
        self.bytes
    }
}

struct FilterStage<'a> {
    upstream: Box<dyn ByteStage + 'a>,
    filter: &'a mut dyn Filter,
    input: ByteBuffer,
    output: ByteBuffer,
    state: InputState,
    done: bool,
}

impl<'a> FilterStage<'a> {
    fn new(upstream: Box<dyn ByteStage + 'a>, filter: &'a mut dyn Filter, output_size: usize) -> Self {
        FilterStage {
            upstream,
            filter,
            input: ByteBuffer::from_bytes(Vec::new()),
            output: ByteBuffer::with_capacity(output_size),
            state: InputState::More,
            done: false,
        }
    }
}

impl ByteStage for FilterStage<'_> {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.done {
            return Ok(None);
        }

        loop {
            match self
                .filter
                .process(&mut self.input, self.state, &mut self.output)?
            {
                StreamState::NeedsOutputSpace => {
                    if self.output.filled().is_empty() {
                        return Err(UdxError::contract(
                            "Filter requested output space without producing output",
                        ));
                    }
                    return Ok(Some(self.output.take_filled()));
                }
                StreamState::NeedsInput => {
                    if self.state.is_end_of_stream() {
                        return Err(UdxError::contract("Filter requested input after end of stream"));
                    }
                    self.input.compact();
                    match self.upstream.next_chunk()? {
                        Some(chunk) => self.input.extend_from_slice(&chunk),
                        None => self.state = InputState::EndOfStream,
                    }
                }
                StreamState::Done => {
                    self.done = true;
                    return Ok(Some(self.output.take_filled()));
                }
            }
        }
    }

    fn bytes_read(&self) -> u64 {
        self.upstream.bytes_read()
    }
}

/// Presents a stage as an `io::Read` so reservation readers can pull from
/// it.
struct StageReader<'a> {
    stage: Box<dyn ByteStage + 'a>,
    pending: Vec<u8>,
    pos: usize,
}

impl<'a> StageReader<'a> {
    fn new(stage: Box<dyn ByteStage + 'a>) -> Self {
        StageReader {
            stage,
            pending: Vec::new(),
            pos: 0,
        }
    }
}

impl Read for StageReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        // Returning 0 means end of stream, so keep pulling past empty chunks.
        loop {
            if self.pos < self.pending.len() {
                let n = buf.len().min(self.pending.len() - self.pos);
                buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }

            match self.stage.next_chunk() {
                Ok(Some(chunk)) => {
                    self.pending = chunk;
                    self.pos = 0;
                }
                Ok(None) => return Ok(0),
                Err(e) => return Err(io::Error::other(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use udx_error::ErrorKind;

    use super::*;

    /// Source over an in-memory byte string.
    #[derive(Debug)]
    struct MemorySource {
        data: Vec<u8>,
        pos: usize,
        setup: bool,
        destroyed: bool,
    }

    impl MemorySource {
        fn new(data: &[u8]) -> Self {
            MemorySource {
                data: data.to_vec(),
                pos: 0,
                setup: false,
                destroyed: false,
            }
        }
    }

    impl Source for MemorySource {
        fn setup(&mut self) -> Result<()> {
            self.setup = true;
            Ok(())
        }

        fn process(&mut self, output: &mut ByteBuffer) -> Result<StreamState> {
            let n = output.spare_capacity().min(self.data.len() - self.pos);
            output.put_slice(&self.data[self.pos..self.pos + n])?;
            self.pos += n;
            Ok(if self.pos == self.data.len() {
                StreamState::Done
            } else {
                StreamState::NeedsOutputSpace
            })
        }

        fn destroy(&mut self) -> Result<()> {
            self.destroyed = true;
            Ok(())
        }
    }

    fn small_config() -> LoadConfig {
        LoadConfig {
            input_buffer_size: 3,
            output_buffer_size: 4,
            batch_size: 2,
            reserve_read_size: 5,
            substitution_throttle: false,
        }
    }

    fn collect(driver: &LoadDriver, input: &[u8]) -> (Vec<i64>, LoadStats) {
        let mut source = MemorySource::new(input);
        let mut values = Vec::new();
        let stats = driver
            .run_source(&mut source, &mut |batch| {
                values.extend(batch.iter().map(|r| r.get_i64(0).unwrap().unwrap()));
                Ok(())
            })
            .unwrap();
        assert!(source.setup && source.destroyed);
        (values, stats)
    }

    #[test]
    fn bounded_load() {
        let driver = LoadDriver::new(small_config(), ParserKind::BasicInteger);
        let (values, stats) = collect(&driver, b"1 22 333 4444 5");
        assert_eq!(vec![1, 22, 333, 4444, 5], values);
        assert_eq!(15, stats.bytes_read);
        assert_eq!(5, stats.rows);
        assert_eq!(3, stats.batches);
    }

    #[test]
    fn continuous_load_matches_bounded() {
        let input = b"9,8,,77\n66 5 44444";
        let bounded = collect(&LoadDriver::new(small_config(), ParserKind::BasicInteger), input).0;
        let continuous =
            collect(&LoadDriver::new(small_config(), ParserKind::ContinuousInteger), input).0;
        assert_eq!(bounded, continuous);
    }

    #[test]
    fn substitute_before_parse() {
        // '1' becomes '2' and then ',' separates.
        let driver = LoadDriver::new(small_config(), ParserKind::BasicInteger)
            .with_filter(FilterKind::Substitute { from: b'1', to: b'2' });
        let (values, _) = collect(&driver, b"11,21,3");
        assert_eq!(vec![22, 22, 3], values);
    }

    #[test]
    fn throttled_substitute_same_rows() {
        let mut config = small_config();
        config.substitution_throttle = true;
        let filter = FilterKind::Substitute { from: b'|', to: b' ' };
        let input = b"10|20|30|40|50|60";

        let plain = collect(
            &LoadDriver::new(small_config(), ParserKind::BasicInteger).with_filter(filter.clone()),
            input,
        )
        .0;
        let throttled = collect(
            &LoadDriver::new(config, ParserKind::ContinuousInteger).with_filter(filter),
            input,
        )
        .0;
        assert_eq!(vec![10, 20, 30, 40, 50, 60], plain);
        assert_eq!(plain, throttled);
    }

    #[test]
    fn search_replace_before_parse() {
        let params = NamedParams::new()
            .with("pattern", "one")
            .with("replace_with", "1");
        let filter = FilterKind::from_name("search_replace", &params).unwrap();
        let driver = LoadDriver::new(small_config(), ParserKind::BasicInteger).with_filter(filter);
        let (values, _) = collect(&driver, b"one two one1 3");
        assert_eq!(vec![1, 11, 3], values);
    }

    #[test]
    fn run_continuous_over_reader() {
        let mut values = Vec::new();
        let stats = run_continuous(&b"5 6 7"[..], &small_config(), &mut |batch| {
            values.extend(batch.iter().map(|r| r.get_i64(0).unwrap().unwrap()));
            Ok(())
        })
        .unwrap();
        assert_eq!(vec![5, 6, 7], values);
        assert_eq!(3, stats.rows);
        assert_eq!(2, stats.batches);
    }

    #[test]
    fn parse_error_still_destroys_source() {
        let driver = LoadDriver::new(small_config(), ParserKind::BasicInteger);
        let mut source = MemorySource::new(b"1 99999999999999999999");
        let err = driver.run_source(&mut source, &mut |_| Ok(())).unwrap_err();
        assert_eq!(ErrorKind::MalformedInput, err.kind());
        assert!(source.destroyed);
    }

    #[test]
    fn continuous_parse_error_keeps_kind() {
        let driver = LoadDriver::new(small_config(), ParserKind::ContinuousInteger)
            .with_filter(FilterKind::Substitute { from: b'x', to: b'y' });
        let mut source = MemorySource::new(b"1 99999999999999999999");
        let err = driver.run_source(&mut source, &mut |_| Ok(())).unwrap_err();
        assert_eq!(ErrorKind::MalformedInput, err.kind());
    }

    #[test]
    fn filter_only() {
        let mut source = MemorySource::new(b"a-b-c");
        let mut out = Vec::new();
        LoadDriver::filter_source(
            &small_config(),
            &mut source,
            &FilterKind::Substitute { from: b'-', to: b'+' },
            &mut |bytes| {
                out.extend_from_slice(bytes);
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(b"a+b+c".to_vec(), out);
    }

    #[test]
    fn kinds_by_name() {
        assert_eq!(
            ParserKind::ContinuousInteger,
            ParserKind::from_name("continuous_integer").unwrap()
        );
        ParserKind::from_name("json").unwrap_err();

        let params = NamedParams::new().with("from", ",");
        assert_eq!(
            FilterKind::Substitute { from: b',', to: b'2' },
            FilterKind::from_name("substitute", &params).unwrap()
        );
        let err = FilterKind::from_name("search_replace", &NamedParams::new()).unwrap_err();
        assert_eq!(ErrorKind::Config, err.kind());

        assert_eq!(
            FilterKind::SearchReplace {
                pattern: b"a".to_vec(),
                replace_with: b"b:".to_vec(),
            },
            FilterKind::from_pair("search_replace", "a:b:").unwrap()
        );
        assert_eq!(
            FilterKind::Substitute { from: b'x', to: b'y' },
            FilterKind::from_pair("substitute", "x:y").unwrap()
        );
        FilterKind::from_pair("substitute", "xy").unwrap_err();
    }
}

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::{Args, Subcommand};
use tracing::info;
use udx_core::analytic::{AnalyticExecutor, AnalyticKind};
use udx_core::arrays::record::Record;
use udx_core::config::load::{LoadConfig, settings};
use udx_core::config::params::NamedParams;
use udx_core::pipeline::executor::PartitionedExecutor;
use udx_core::pipeline::inverted_index::{document_schema, inverted_index};
use udx_core::stream::driver::{FilterKind, LoadDriver, ParserKind, run_continuous};
use udx_core::stream::source::file::FileSource;
use udx_core::stream::source::{SourceParams, create_sources};
use udx_error::{Result, UdxError};

use crate::tsv;

#[derive(Subcommand)]
pub enum Commands {
    /// Load integers from a file, one per output line.
    ParseInts(ParseIntsArgs),
    /// Run a file through a byte filter, writing the result to stdout.
    Filter(FilterArgs),
    /// Build an inverted index from `doc_id<TAB>text` lines.
    InvertedIndex(InvertedIndexArgs),
    /// Evaluate an analytic function over `group<TAB>order<TAB>value` lines.
    Analytic(AnalyticArgs),
    /// List load settings with their current values.
    Settings,
}

impl Commands {
    pub fn run(self, config: LoadConfig) -> Result<()> {
        match self {
            Commands::ParseInts(args) => args.run(config),
            Commands::Filter(args) => args.run(config),
            Commands::InvertedIndex(args) => args.run(config),
            Commands::Analytic(args) => args.run(config),
            Commands::Settings => print_settings(&config),
        }
    }
}

trait RunCommand {
    fn run(self, config: LoadConfig) -> Result<()>;
}

#[derive(Args)]
pub struct FilterOpts {
    /// Replace one byte with another, `X:Y`.
    #[clap(long, value_name = "X:Y", conflicts_with = "replace")]
    substitute: Option<String>,
    /// Replace every occurrence of a pattern, `PATTERN:WITH`.
    #[clap(long, value_name = "PATTERN:WITH")]
    replace: Option<String>,
}

impl FilterOpts {
    fn filter_kind(&self) -> Result<Option<FilterKind>> {
        match (&self.substitute, &self.replace) {
            (Some(pair), _) => FilterKind::from_pair("substitute", pair).map(Some),
            (None, Some(pair)) => FilterKind::from_pair("search_replace", pair).map(Some),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Args)]
pub struct ParseIntsArgs {
    /// Input file, '-' reads stdin. The file name may be a glob.
    file: String,
    /// Parser, `basic_integer` or `continuous_integer`. Files default to
    /// `basic_integer`. Stdin is always read with `continuous_integer`.
    #[clap(long)]
    parser: Option<String>,
    /// Comma separated byte offsets splitting the file into portions.
    #[clap(long)]
    offsets: Option<String>,
    /// Comma separated nodes the portions are spread across.
    #[clap(long)]
    nodes: Option<String>,
    /// Name of the node this process acts as.
    #[clap(long, default_value = "local")]
    node: String,
    #[clap(flatten)]
    filter: FilterOpts,
}

impl RunCommand for ParseIntsArgs {
    fn run(self, config: LoadConfig) -> Result<()> {
        let parser = match &self.parser {
            Some(name) => ParserKind::from_name(name)?,
            None if self.file == "-" => ParserKind::ContinuousInteger,
            None => ParserKind::BasicInteger,
        };
        let filter = self.filter.filter_kind()?;

        let mut stdout = BufWriter::new(io::stdout().lock());
        let mut on_batch = |batch: Vec<Record>| -> Result<()> {
            for row in batch {
                writeln!(stdout, "{}", row.get(0)?)?;
            }
            Ok(())
        };

        let stats = if self.file == "-" {
            if filter.is_some() || self.offsets.is_some() {
                return Err(UdxError::config("Filters and offsets need a file input"));
            }
            if parser != ParserKind::ContinuousInteger {
                return Err(UdxError::config("Stdin can only be read by the continuous parser")
                    .with_field("parser", parser.name()));
            }
            run_continuous(io::stdin().lock(), &config, &mut on_batch)?
        } else {
            let mut params = NamedParams::new().with("file", self.file.as_str());
            if let Some(offsets) = &self.offsets {
                params.insert("offsets", offsets.as_str());
            }
            if let Some(nodes) = &self.nodes {
                params.insert("nodes", nodes.as_str());
            }
            let sources = create_sources(&SourceParams::try_from_params(&params)?, &self.node)?;

            let mut driver = LoadDriver::new(config, parser);
            if let Some(filter) = filter {
                driver = driver.with_filter(filter);
            }
            driver.run_sources(sources, &mut on_batch)?
        };

        stdout.flush()?;
        info!(%stats, "load complete");
        Ok(())
    }
}

#[derive(Args)]
pub struct FilterArgs {
    /// Input file.
    file: PathBuf,
    #[clap(flatten)]
    filter: FilterOpts,
}

impl RunCommand for FilterArgs {
    fn run(self, config: LoadConfig) -> Result<()> {
        let filter = self.filter.filter_kind()?.ok_or_else(|| {
            UdxError::config("Specify a filter with --substitute or --replace")
        })?;

        let mut stdout = BufWriter::new(io::stdout().lock());
        let mut source = FileSource::new(self.file);
        let stats = LoadDriver::filter_source(&config, &mut source, &filter, &mut |bytes: &[u8]| -> Result<()> {
            stdout.write_all(bytes)?;
            Ok(())
        })?;
        stdout.flush()?;

        info!(filter = filter.name(), %stats, "filter complete");
        Ok(())
    }
}

#[derive(Args)]
pub struct InvertedIndexArgs {
    /// Tab separated documents, `doc_id<TAB>text`.
    file: PathBuf,
    /// Only print the postings of this term.
    #[clap(long)]
    term: Option<String>,
}

impl RunCommand for InvertedIndexArgs {
    fn run(self, _config: LoadConfig) -> Result<()> {
        let documents = tsv::read_documents(&self.file)?;
        let planned = inverted_index().plan(&document_schema())?;

        let mut rows = Vec::new();
        PartitionedExecutor::new().execute(&planned, documents, &mut rows)?;
        if let Some(term) = &self.term {
            let term = term.to_lowercase();
            rows.retain(|row| matches!(row.get_str(0), Ok(Some(t)) if t == term));
        }

        info!(rows = rows.len(), "inverted index complete");
        tsv::write_rows(&rows, io::stdout().lock())
    }
}

#[derive(Args)]
pub struct AnalyticArgs {
    /// Function, one of `rank`, `lag`, `lead` or `nth_value`.
    function: String,
    /// Tab separated rows, `group<TAB>order<TAB>value`.
    file: PathBuf,
    /// Offset for `lag` and `lead`.
    #[clap(long, default_value_t = 1)]
    offset: i64,
    /// Row number for `nth_value`, starting at 1.
    #[clap(long, default_value_t = 1)]
    n: i64,
}

impl RunCommand for AnalyticArgs {
    fn run(self, _config: LoadConfig) -> Result<()> {
        let kind = AnalyticKind::from_name(&self.function)?;
        let with_offset = matches!(kind, AnalyticKind::Lag | AnalyticKind::Lead);

        let mut params = NamedParams::new();
        if kind == AnalyticKind::NthValue {
            params.insert("n", self.n);
        }

        let rows = tsv::read_series(&self.file, with_offset.then_some(self.offset))?;
        let schema = tsv::series_schema(with_offset);
        let output = AnalyticExecutor::new(kind, params).execute(&schema, rows)?;

        // Drop the constant offset column.
        let output: Vec<Record> = if with_offset {
            output
                .into_iter()
                .map(|row| {
                    let mut values = row.into_values();
                    values.remove(3);
                    Record::new(values)
                })
                .collect()
        } else {
            output
        };

        info!(function = kind.name(), rows = output.len(), "analytic complete");
        tsv::write_rows(&output, io::stdout().lock())
    }
}

fn print_settings(config: &LoadConfig) -> Result<()> {
    let mut stdout = BufWriter::new(io::stdout().lock());
    for (name, description, value) in settings(config) {
        writeln!(stdout, "{name}\t{value}\t{description}")?;
    }
    stdout.flush()?;
    Ok(())
}

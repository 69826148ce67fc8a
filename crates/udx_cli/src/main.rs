mod commands;
mod tsv;

use clap::{ArgAction, Parser};
use commands::Commands;
use logutil::LogFormat;
use udx_core::config::load::LoadConfig;
use udx_error::Result;

#[derive(Parser)]
#[clap(name = "udx", version)]
/// Run load stages, transforms, and analytic functions over local files.
struct Arguments {
    /// Log more (-v info, -vv debug, -vvv trace). RUST_LOG takes precedence.
    #[clap(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Log output format.
    #[clap(long, default_value = "plain", value_parser = parse_log_format, global = true)]
    log_format: LogFormat,
    /// Override a load setting. May be repeated.
    #[clap(long = "set", value_name = "NAME=VALUE", global = true)]
    settings: Vec<String>,
    #[clap(subcommand)]
    command: Commands,
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    LogFormat::from_name(s).ok_or_else(|| format!("unknown log format '{s}', expected 'plain' or 'json'"))
}

fn main() {
    let args = Arguments::parse();
    logutil::init(args.verbose, args.log_format);

    if let Err(err) = run(args) {
        eprintln!("ERROR: {err}");
        if let Some(backtrace) = err.get_backtrace() {
            eprintln!("{backtrace}");
        }
        std::process::exit(1);
    }
}

fn run(args: Arguments) -> Result<()> {
    let mut config = LoadConfig::default();
    for assignment in &args.settings {
        config.set_from_str(assignment)?;
    }
    args.command.run(config)
}

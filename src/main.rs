use anyhow::Context;
use clap::{Parser, ValueEnum};
use compute::{Accounts, Balances};
use log::{info, warn};
use read::{read_accounts, ReadStats};
use std::{
    env, fmt,
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::PathBuf,
};
use symbols::{DisplayMode, SymbolTable};
use write::{write_balances, ReportOptions};

mod amount;
mod compute;
mod data;
mod read;
mod symbols;
mod write;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LoggingFormat {
    Standard,
    Json,
}

impl fmt::Display for LoggingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoggingFormat::Standard => write!(f, "standard"),
            LoggingFormat::Json => write!(f, "json"),
        }
    }
}

/// Export wallet SOL and SPL token balances from a solana-snapshot-gpa dump
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Snapshot dump (tab or comma separated), `-` for stdin
    #[arg(default_value = "matched.csv")]
    input: String,

    /// Balance report, `-` for stdout
    #[arg(default_value = "balances.csv")]
    output: String,

    /// Symbol table with columns address,symbol,decimals,name
    #[arg(long, default_value = "symbols.csv")]
    symbols: PathBuf,

    /// What to print in the label column of token lines
    #[arg(long, value_enum, default_value_t = DisplayMode::Symbol)]
    display: DisplayMode,

    /// Output delimiter, a single character
    #[arg(long, default_value = "\t")]
    out_delim: String,

    /// Logging format
    #[arg(short, long, default_value_t = LoggingFormat::Standard)]
    logging_format: LoggingFormat,
}

/// Logs go to stderr, stdout may well be the report.
fn setup_logging(logging_format: LoggingFormat) {
    let env_filter = env::var("RUST_LOG").unwrap_or("info".to_string());
    let t = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr);
    match logging_format {
        LoggingFormat::Standard => t.init(),
        LoggingFormat::Json => t.json().init(),
    }
}

/// `\t` may come in escaped since it's a pain to type in a shell.
fn parse_delimiter(delimiter: &str) -> Result<u8, anyhow::Error> {
    match delimiter {
        "\\t" => Ok(b'\t'),
        d if d.len() == 1 && d.is_ascii() => Ok(d.as_bytes()[0]),
        d => anyhow::bail!("output delimiter must be a single ASCII character, got {d:?}"),
    }
}

fn open_input(path: &str) -> Result<Box<dyn Read>, anyhow::Error> {
    if path == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("can't open input {path}"))?;
    Ok(Box::new(file))
}

fn open_output(path: &str) -> Result<Box<dyn Write>, anyhow::Error> {
    if path == "-" {
        return Ok(Box::new(io::stdout().lock()));
    }
    let file = File::create(path).with_context(|| format!("can't create output {path}"))?;
    Ok(Box::new(BufWriter::new(file)))
}

/// Read the whole dump, keep the latest state of each account and total
/// everything up. Nothing is written until this has succeeded.
fn compute_balances<R: Read>(input: R) -> Result<(Balances, ReadStats), anyhow::Error> {
    let mut accounts = Accounts::new();
    let stats = read_accounts(input, &mut accounts)?;
    info!(
        "Read {} rows, {} usable, {} skipped: {} native accounts, {} token accounts",
        stats.rows,
        stats.accounts,
        stats.skipped,
        accounts.native.len(),
        accounts.tokens.len()
    );
    Ok((Balances::aggregate(&accounts), stats))
}

/// The whole export. Fatal errors come back before the output is created, so
/// a failed run leaves nothing behind.
fn run(args: Args) -> Result<(), anyhow::Error> {
    let options = ReportOptions {
        display: args.display,
        delimiter: parse_delimiter(&args.out_delim)?,
    };

    let symbols = SymbolTable::load(&args.symbols)?;
    if symbols.is_empty() {
        warn!(
            "Symbol table {} not found or empty, tokens will show their mint and raw amounts",
            args.symbols.display()
        );
    } else {
        info!("Loaded {} symbols from {}", symbols.len(), args.symbols.display());
    }

    let input = open_input(&args.input)?;
    let (balances, _) =
        compute_balances(input).with_context(|| format!("can't read input {}", args.input))?;

    let output = open_output(&args.output)?;
    let lines = write_balances(output, &balances, &symbols, options)
        .with_context(|| format!("can't write output {}", args.output))?;
    info!(
        "Wrote {lines} lines for {} wallets to {}",
        balances.eligible.len(),
        args.output
    );
    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    setup_logging(args.logging_format);
    run(args)
}

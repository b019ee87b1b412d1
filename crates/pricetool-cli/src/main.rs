//! CLI for converting hospital MRF disclosures to analytical Parquet.

mod error;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use pricetool_core::{ConvertOptions, ConvertReport, convert};
use snafu::ResultExt;

use crate::error::{CliResult, ConvertSnafu, NoFileNameSnafu};

#[derive(Debug, Parser)]
#[command(
    name = "pricetool",
    about = "Convert hospital MRF price files (CSV/JSON) to query-optimized Parquet"
)]
struct Args {
    /// Input MRF file (.csv or .json)
    input: PathBuf,

    /// Output Parquet file (defaults to the input file stem + .parquet)
    #[arg(short = 'o', long = "out")]
    out: Option<PathBuf>,

    /// Charge rows accumulated per writer batch
    #[arg(long, default_value_t = 10_000)]
    batch: usize,

    /// Drop payer-specific rows, keeping one gross-pricing row per source record
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    skip_payer_charges: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> CliResult<()> {
    let output = match &args.out {
        Some(out) => out.clone(),
        None => default_output(&args.input)?,
    };

    let options = ConvertOptions {
        batch_size: args.batch.max(1),
        skip_payer_charges: args.skip_payer_charges,
    };

    println!("Input:   {}", args.input.display());
    println!("Output:  {}", output.display());

    let report = convert(&args.input, &output, &options).context(ConvertSnafu)?;
    print_report(&report);
    Ok(())
}

/// Output defaults to the input's file stem with a `.parquet` extension, in
/// the current directory.
fn default_output(input: &Path) -> CliResult<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| NoFileNameSnafu { path: input }.build())?;
    let mut name = stem.to_os_string();
    name.push(".parquet");
    Ok(PathBuf::from(name))
}

fn print_report(report: &ConvertReport) {
    const MB: f64 = 1024.0 * 1024.0;

    println!("Format:  {}", report.format);
    if let Some(pairs) = report.payer_plan_count {
        println!("Payers:  {pairs} payer/plan combinations");
    }
    println!();
    println!("Done in {:?}", report.elapsed);
    println!("  Source records: {}", report.source_records);
    println!("  Parquet rows:   {}", report.rows_written);
    let seconds = report.elapsed.as_secs_f64();
    if seconds > 0.0 {
        println!(
            "  Throughput:     {:.0} rows/s",
            report.rows_written as f64 / seconds
        );
    }
    if report.input_bytes > 0 && report.output_bytes > 0 {
        println!(
            "  Input size:     {:.1} MB",
            report.input_bytes as f64 / MB
        );
        println!(
            "  Output size:    {:.1} MB ({:.1}x compression)",
            report.output_bytes as f64 / MB,
            report.input_bytes as f64 / report.output_bytes as f64
        );
    }
}

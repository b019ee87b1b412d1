//! End-to-end conversion driver.
//!
//! The pipeline is single-threaded and cooperative: the driver alternately
//! pulls one source record's rows from the reader and hands accumulated
//! batches to the writer, then closes the writer to sort and lay out the
//! file. No parallelism, no shared state; the reader and writer each own
//! their file handle exclusively.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use snafu::prelude::*;

use crate::detect::SourceFormat;
use crate::reader::{ChargeReader, ReadError, ReaderOptions};
use crate::writer::{ChargeWriter, WriteError};

/// Default number of charge rows accumulated before a writer hand-off.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Conversion configuration.
#[derive(Debug, Clone, Copy)]
pub struct ConvertOptions {
    /// Charge rows accumulated per [`ChargeWriter::write`] call.
    pub batch_size: usize,
    /// Drop payer-specific rows, keeping one gross-pricing row per source
    /// record where gross pricing exists.
    pub skip_payer_charges: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            skip_payer_charges: false,
        }
    }
}

/// What a conversion did, for caller-side reporting.
#[derive(Debug, Clone)]
pub struct ConvertReport {
    /// Detected input format.
    pub format: SourceFormat,
    /// `(payer, plan)` pairs discovered in a Wide header; `None` otherwise.
    pub payer_plan_count: Option<usize>,
    /// Source records consumed (CSV body rows or JSON items).
    pub source_records: u64,
    /// Charge rows written to the output file.
    pub rows_written: u64,
    /// Input file size in bytes.
    pub input_bytes: u64,
    /// Output file size in bytes.
    pub output_bytes: u64,
    /// Wall time for the whole conversion.
    pub elapsed: Duration,
}

/// Errors from a full conversion run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PipelineError {
    /// Reading or decoding the input failed.
    #[snafu(display("Failed to read {}: {source}", path.display()))]
    Read {
        /// Input path.
        path: PathBuf,
        /// Underlying reader error.
        source: ReadError,
    },

    /// Creating or finalizing the output failed.
    #[snafu(display("Failed to write {}: {source}", path.display()))]
    Write {
        /// Output path.
        path: PathBuf,
        /// Underlying writer error.
        source: WriteError,
    },

    /// Sizing the input or output file failed after conversion.
    #[snafu(display("Failed to stat {}: {source}", path.display()))]
    Stat {
        /// Path that failed to stat.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

/// Result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Converts one MRF input file into the analytical Parquet artifact.
pub fn convert(
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
) -> PipelineResult<ConvertReport> {
    let start = Instant::now();

    let reader_options = ReaderOptions {
        skip_payer_charges: options.skip_payer_charges,
    };
    let mut reader =
        ChargeReader::open(input, reader_options).context(ReadSnafu { path: input })?;
    let format = reader.format();
    let payer_plan_count = reader.payer_plan_count();

    let mut writer = ChargeWriter::create(output).context(WriteSnafu { path: output })?;

    let batch_size = options.batch_size.max(1);
    let mut batch = Vec::with_capacity(batch_size);
    while let Some(rows) = reader.next_rows().context(ReadSnafu { path: input })? {
        batch.extend(rows);
        if batch.len() >= batch_size {
            writer.write(std::mem::replace(&mut batch, Vec::with_capacity(batch_size)));
        }
    }
    if !batch.is_empty() {
        writer.write(batch);
    }

    let source_records = reader.records_read();
    let rows_written = writer.row_count() as u64;
    writer.close().context(WriteSnafu { path: output })?;
    drop(reader);

    let input_bytes = fs::metadata(input).context(StatSnafu { path: input })?.len();
    let output_bytes = fs::metadata(output)
        .context(StatSnafu { path: output })?
        .len();

    Ok(ConvertReport {
        format,
        payer_plan_count,
        source_records,
        rows_written,
        input_bytes,
        output_bytes,
        elapsed: start.elapsed(),
    })
}

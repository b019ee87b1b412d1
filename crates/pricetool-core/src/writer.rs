//! Parquet writer tuned for selective remote reads.
//!
//! The published file is meant to be queried in place over HTTP (DuckDB and
//! friends reading from object storage), so the layout is chosen to keep a
//! `cpt_code = X` point query down to a few range requests:
//!
//! - rows are globally sorted by `cpt_code` (nulls first), so per-row-group
//!   min/max statistics are tight and most groups are pruned outright;
//! - row groups hold exactly 50,000 rows, giving a typical 200k-row file
//!   about four independently skippable groups;
//! - every code column plus `payer_name`/`plan_name` carries a bloom filter,
//!   which rules out a group even when its min/max range overlaps;
//! - 8 KiB pages with page statistics let engines skip within a group;
//! - zstd(3) keeps the artifact smaller than snappy at tolerable write cost.
//!
//! All rows are buffered in memory until [`ChargeWriter::close`]; the global
//! sort has to see the whole file, and a single MRF is small enough that an
//! external sort would be unjustified.

pub mod schema;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::errors::ParquetError;
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use parquet::schema::types::ColumnPath;
use snafu::prelude::*;

use crate::model::{CODE_COLUMNS, HospitalChargeRow, cmp_by_cpt};
use crate::writer::schema::{charge_batch, charge_schema};

/// Rows per Parquet row group. Smaller groups mean finer-grained predicate
/// pushdown over the network; 50k yields ~4 groups for a typical 210k-row
/// hospital file.
pub const ROWS_PER_GROUP: usize = 50_000;

/// Target false-positive rate for the bloom filters, roughly 10 bits/value.
const BLOOM_FILTER_FPP: f64 = 0.01;

/// Page size limit. Small pages make page-level statistics selective enough
/// for engines to skip within a row group.
const DATA_PAGE_SIZE_LIMIT: usize = 8 * 1024;

const CREATED_BY: &str = "pricetool/1.0";

/// Equality-probe columns carrying bloom filters: all 19 code columns plus
/// the payer/plan identity.
fn bloom_filter_columns() -> impl Iterator<Item = &'static str> {
    CODE_COLUMNS.into_iter().chain(["payer_name", "plan_name"])
}

/// Errors raised while creating or finalizing the output file.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum WriteError {
    /// The output file could not be created.
    #[snafu(display("Failed to create output file {}: {source}", path.display()))]
    Create {
        /// Path that failed to create.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parquet-level write or flush failure.
    #[snafu(display("Parquet write error: {source}"))]
    Parquet {
        /// Underlying parquet error.
        source: ParquetError,
    },

    /// Row-to-batch conversion failure.
    #[snafu(display("Arrow conversion error: {source}"))]
    Arrow {
        /// Underlying arrow error.
        source: ArrowError,
    },
}

/// Result alias for writer operations.
pub type WriteResult<T> = Result<T, WriteError>;

/// Buffering Parquet writer for [`HospitalChargeRow`]s.
///
/// [`write`](Self::write) only accumulates; all IO happens in
/// [`close`](Self::close), which consumes the writer. Dropping an unclosed
/// writer abandons the partially created file; removing it is the caller's
/// policy.
pub struct ChargeWriter {
    writer: ArrowWriter<File>,
    schema: SchemaRef,
    rows: Vec<HospitalChargeRow>,
}

impl ChargeWriter {
    /// Creates the output file and configures the layout properties.
    pub fn create(path: &Path) -> WriteResult<Self> {
        let schema = charge_schema();
        let file = File::create(path).context(CreateSnafu { path })?;
        let writer = ArrowWriter::try_new(file, Arc::clone(&schema), Some(writer_properties()?))
            .context(ParquetSnafu)?;
        Ok(Self {
            writer,
            schema,
            rows: Vec::new(),
        })
    }

    /// Buffers rows for the final sorted write. Returns how many were taken.
    pub fn write(&mut self, rows: Vec<HospitalChargeRow>) -> usize {
        let taken = rows.len();
        self.rows.extend(rows);
        taken
    }

    /// Total rows buffered so far.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Sorts all buffered rows by `cpt_code` (nulls first, stable), writes
    /// them in consecutive 50,000-row chunks with a forced row-group boundary
    /// after each, and finalizes the file.
    pub fn close(mut self) -> WriteResult<()> {
        let mut rows = std::mem::take(&mut self.rows);
        rows.sort_by(cmp_by_cpt);

        for chunk in rows.chunks(ROWS_PER_GROUP) {
            let batch = charge_batch(&self.schema, chunk).context(ArrowSnafu)?;
            self.writer.write(&batch).context(ParquetSnafu)?;
            self.writer.flush().context(ParquetSnafu)?;
        }

        self.writer.close().context(ParquetSnafu)?;
        Ok(())
    }
}

impl std::fmt::Debug for ChargeWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChargeWriter")
            .field("buffered_rows", &self.rows.len())
            .finish_non_exhaustive()
    }
}

fn writer_properties() -> WriteResult<WriterProperties> {
    let zstd = ZstdLevel::try_new(3).context(ParquetSnafu)?;
    let mut builder = WriterProperties::builder()
        .set_compression(Compression::ZSTD(zstd))
        .set_created_by(CREATED_BY.to_string())
        .set_data_page_size_limit(DATA_PAGE_SIZE_LIMIT)
        .set_statistics_enabled(EnabledStatistics::Page)
        .set_max_row_group_size(ROWS_PER_GROUP);
    for column in bloom_filter_columns() {
        let column = ColumnPath::from(column);
        builder = builder
            .set_column_bloom_filter_enabled(column.clone(), true)
            .set_column_bloom_filter_fpp(column, BLOOM_FILTER_FPP);
    }
    Ok(builder.build())
}

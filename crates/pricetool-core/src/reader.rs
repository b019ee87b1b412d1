//! Reader front-end: format dispatch, shared cell parsing, error types.
//!
//! A [`ChargeReader`] is a tagged variant over the four concrete decoders
//! (Tall/Wide CSV in [`csv`](mod@crate::reader::csv), JSON v2/v3 in
//! [`json`](mod@crate::reader::json)). Each call to
//! [`ChargeReader::next_rows`] consumes exactly one source record (a CSV body
//! row or a JSON `standard_charge_information` item) and yields every charge
//! row it expands into; `Ok(None)` signals end of input. Dropping the reader
//! releases the underlying file.

pub mod csv;
pub mod json;

use std::path::{Path, PathBuf};

use snafu::prelude::*;

use crate::detect::{self, SourceFormat};
use crate::model::HospitalChargeRow;
use crate::reader::csv::CsvChargeReader;
use crate::reader::json::JsonChargeReader;

/// Errors raised while opening or decoding an input MRF.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ReadError {
    /// The input file could not be opened.
    #[snafu(display("Failed to open input file {}: {source}", path.display()))]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The CSV file ended before the two-row hospital-metadata preamble.
    #[snafu(display("CSV file {} is missing its hospital-metadata preamble", path.display()))]
    MissingPreamble {
        /// Path of the truncated file.
        path: PathBuf,
    },

    /// The CSV file has a preamble but no body column header.
    #[snafu(display("CSV file {} has no body column header", path.display()))]
    MissingBodyHeader {
        /// Path of the truncated file.
        path: PathBuf,
    },

    /// The body column header lacks a column the data model requires.
    #[snafu(display("CSV body header is missing required column {column:?}"))]
    MissingColumn {
        /// Name of the absent column.
        column: &'static str,
    },

    /// Structural CSV error (malformed quoting, IO failure mid-file).
    #[snafu(display("CSV error at row {row}: {source}"))]
    Csv {
        /// 1-based body row where decoding failed.
        row: u64,
        /// Underlying csv crate error.
        source: ::csv::Error,
    },

    /// A body row's cell count does not match the body header.
    #[snafu(display("Row {row} has {got} columns, header has {expected}"))]
    RowWidth {
        /// 1-based body row with the mismatch.
        row: u64,
        /// Column count declared by the body header.
        expected: usize,
        /// Column count found on the row.
        got: usize,
    },

    /// A numeric cell holds something other than a number or a null sentinel.
    #[snafu(display("Row {row}, column {column:?}: cannot parse {value:?} as a number"))]
    ParseCell {
        /// 1-based body row carrying the cell.
        row: u64,
        /// Source column name of the cell.
        column: String,
        /// Offending cell contents.
        value: String,
    },

    /// The JSON document failed to deserialize.
    #[snafu(display("Malformed JSON in {}: {source}", path.display()))]
    Json {
        /// Path of the malformed document.
        path: PathBuf,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// A `standard_charge_information` item lacks a required field.
    #[snafu(display("Item {index}: missing required field {field:?}"))]
    ItemField {
        /// Zero-based index of the failing item.
        index: usize,
        /// Name of the missing field.
        field: &'static str,
    },
}

/// Result alias for reader operations.
pub type ReadResult<T> = Result<T, ReadError>;

/// Reader configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReaderOptions {
    /// Suppress payer-specific rows. One no-payer row per source record is
    /// still emitted when any of gross/cash/min/max is present.
    pub skip_payer_charges: bool,
}

/// Streaming reader over any recognized MRF input.
#[derive(Debug)]
pub enum ChargeReader {
    /// Tall or Wide CSV input.
    Csv(CsvChargeReader),
    /// JSON v2 or v3 input.
    Json(JsonChargeReader),
}

impl ChargeReader {
    /// Opens `path`, classifying it by extension: `.json` goes to the JSON
    /// decoder, everything else to the CSV decoder. The concrete layout or
    /// schema version is detected inside the decoder and available from
    /// [`format`](Self::format) immediately after opening.
    pub fn open(path: &Path, options: ReaderOptions) -> ReadResult<Self> {
        if detect::is_json_path(path) {
            JsonChargeReader::open(path, options).map(Self::Json)
        } else {
            CsvChargeReader::open(path, options).map(Self::Csv)
        }
    }

    /// Decodes the next source record, returning every charge row it expands
    /// into. An empty `Vec` is a dropped record, not an error; `Ok(None)` is
    /// end of input.
    pub fn next_rows(&mut self) -> ReadResult<Option<Vec<HospitalChargeRow>>> {
        match self {
            Self::Csv(reader) => reader.next_rows(),
            Self::Json(reader) => reader.next_rows(),
        }
    }

    /// Detected input format.
    pub fn format(&self) -> SourceFormat {
        match self {
            Self::Csv(reader) => reader.format(),
            Self::Json(reader) => reader.format(),
        }
    }

    /// Number of `(payer, plan)` pairs discovered in a Wide header;
    /// `None` for every other format.
    pub fn payer_plan_count(&self) -> Option<usize> {
        match self {
            Self::Csv(reader) => reader.payer_plan_count(),
            Self::Json(_) => None,
        }
    }

    /// Source records consumed so far (CSV body rows or JSON items).
    pub fn records_read(&self) -> u64 {
        match self {
            Self::Csv(reader) => reader.row_num(),
            Self::Json(reader) => reader.items_read(),
        }
    }
}

/// Normalizes an optional string cell: whitespace-only becomes absent,
/// everything else is kept trimmed.
pub(crate) fn opt_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parses a numeric cell. Empty, whitespace-only, `N/A`, and `NA` cells are
/// null; anything else must parse as a float or the row fails with the
/// column name attached.
pub(crate) fn money_cell(raw: &str, row: u64, column: &str) -> ReadResult<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("n/a")
        || trimmed.eq_ignore_ascii_case("na")
    {
        return Ok(None);
    }
    trimmed.parse::<f64>().ok().map(Some).ok_or_else(|| {
        ParseCellSnafu {
            row,
            column: column.to_string(),
            value: trimmed.to_string(),
        }
        .build()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_cell_null_sentinels() {
        assert_eq!(money_cell("", 1, "c").unwrap(), None);
        assert_eq!(money_cell("   ", 1, "c").unwrap(), None);
        assert_eq!(money_cell("N/A", 1, "c").unwrap(), None);
        assert_eq!(money_cell("na", 1, "c").unwrap(), None);
        assert_eq!(money_cell("1500.00", 1, "c").unwrap(), Some(1500.0));
        assert_eq!(money_cell(" 8.25 ", 1, "c").unwrap(), Some(8.25));
    }

    #[test]
    fn money_cell_rejects_garbage_with_position() {
        let err = money_cell("twelve", 7, "standard_charge|gross").unwrap_err();
        match err {
            ReadError::ParseCell { row, column, value } => {
                assert_eq!(row, 7);
                assert_eq!(column, "standard_charge|gross");
                assert_eq!(value, "twelve");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn opt_cell_distinguishes_absent_from_text() {
        assert_eq!(opt_cell(""), None);
        assert_eq!(opt_cell("  "), None);
        assert_eq!(opt_cell(" fee_schedule "), Some("fee_schedule".to_string()));
    }
}

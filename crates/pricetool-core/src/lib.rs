//! Hospital price-transparency (MRF) decoding and analytical Parquet layout.
//!
//! U.S. hospitals publish machine-readable price files in four shapes: Tall
//! and Wide CSV layouts, and JSON schema v2/v3. This crate normalizes all
//! four into one flat charge-row table and writes it as a single Parquet
//! file engineered for selective remote queries: globally sorted by
//! `cpt_code`, fixed 50k-row groups, page statistics, and bloom filters on
//! every code column so a point query transfers only a small fraction of the
//! file.
//!
//! Layers:
//! - [`model`]: the normalized [`HospitalChargeRow`] and code vocabularies.
//! - [`detect`]: structural classification of the four input shapes.
//! - [`reader`]: streaming decoders, one source record at a time.
//! - [`writer`]: the buffering, sorting, layout-tuned Parquet writer.
//! - [`pipeline`]: the driver wiring a reader to the writer.
//!
//! Downloading inputs, uploading outputs, and querying the artifact are left
//! to callers; the crate works strictly from local path to local path.

pub mod detect;
pub mod model;
pub mod pipeline;
pub mod reader;
pub mod writer;

pub use detect::SourceFormat;
pub use model::{HospitalChargeRow, HospitalMeta};
pub use pipeline::{ConvertOptions, ConvertReport, PipelineError, convert};
pub use reader::{ChargeReader, ReadError, ReaderOptions};
pub use writer::{ChargeWriter, ROWS_PER_GROUP, WriteError};

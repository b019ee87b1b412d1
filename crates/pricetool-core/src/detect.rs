//! Input-format classification.
//!
//! Hospitals publish MRFs in four shapes: two CSV layouts (Tall repeats a row
//! per payer, Wide encodes payer/plan identity inside column names) and two
//! JSON schema generations (v2 and v3). Classification is structural only:
//! the file extension separates CSV from JSON, the body column header
//! separates Tall from Wide, and the JSON top-level keys separate v2 from v3.
//! Keep the header-shape rules here so the readers stay free of guesswork.

use std::fmt;
use std::path::Path;

/// The four recognized input shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// CSV with generic `payer_name`/`plan_name` columns, one payer per row.
    TallCsv,
    /// CSV with `standard_charge|<payer>|<plan>|<field>` column groups.
    WideCsv,
    /// JSON schema v2 (`hospital_location` + `affirmation`).
    JsonV2,
    /// JSON schema v3 (`location_name` + `attestation`).
    JsonV3,
}

impl SourceFormat {
    /// Short diagnostic label, matching the CLI's `Format:` line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TallCsv => "tall",
            Self::WideCsv => "wide",
            Self::JsonV2 => "json-v2",
            Self::JsonV3 => "json-v3",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CSV body layout, decided from the body column header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvLayout {
    Tall,
    Wide,
}

/// Payer-pricing field encoded in the last segment of a Wide column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WideField {
    NegotiatedDollar,
    NegotiatedPercentage,
    EstimatedAmount,
    Methodology,
    NegotiatedAlgorithm,
}

impl WideField {
    fn parse(segment: &str) -> Option<Self> {
        match segment {
            "negotiated_dollar" => Some(Self::NegotiatedDollar),
            "negotiated_percentage" => Some(Self::NegotiatedPercentage),
            "estimated_amount" => Some(Self::EstimatedAmount),
            "methodology" => Some(Self::Methodology),
            "negotiated_algorithm" => Some(Self::NegotiatedAlgorithm),
            _ => None,
        }
    }
}

/// A parsed `standard_charge|<payer>|<plan>|<field>` column name.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct WideHeader<'a> {
    pub payer: &'a str,
    pub plan: &'a str,
    pub field: WideField,
}

/// Parses one body-header cell as a Wide payer column.
///
/// Only the exact four-segment shape qualifies. Tall files legitimately carry
/// cells like `standard_charge|methodology`; those never parse here, which is
/// what keeps Tall detection deterministic.
pub(crate) fn wide_header(cell: &str) -> Option<WideHeader<'_>> {
    let parts: Vec<&str> = cell.split('|').collect();
    let [prefix, payer, plan, field] = parts[..] else {
        return None;
    };
    if prefix != "standard_charge" || payer.is_empty() || plan.is_empty() {
        return None;
    }
    WideField::parse(field).map(|field| WideHeader { payer, plan, field })
}

/// Classifies a CSV body header as Tall or Wide.
///
/// Wide wins only when at least one header cell encodes a full
/// `(payer, plan, field)` triple; the mere presence of `standard_charge|...`
/// pipes does not.
pub fn csv_layout<'a>(header: impl IntoIterator<Item = &'a str>) -> CsvLayout {
    if header.into_iter().any(|cell| wide_header(cell).is_some()) {
        CsvLayout::Wide
    } else {
        CsvLayout::Tall
    }
}

/// True when the path carries a `.json` extension (ASCII case-insensitive).
/// Everything else is treated as CSV.
pub fn is_json_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

//! JSON v2/v3 MRF decoding.
//!
//! Both schema generations share one top-level shape: hospital metadata plus
//! a `standard_charge_information` array. They differ in the metadata keys
//! (`hospital_location`/`affirmation` in v2, `location_name`/`attestation`
//! in v3) and in how forgiving the numeric fields are (v2 files routinely
//! write numbers as strings). The document is deserialized into one tolerant
//! set of typed structs; the version is decided from which metadata keys are
//! present, falling back to v2.
//!
//! Each item expands as: merged `code_information` codes × one row per
//! `(setting, payer)`, with a no-payer row for settings that list no payers.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use snafu::prelude::*;

use crate::detect::SourceFormat;
use crate::model::{CodeType, HospitalChargeRow, HospitalMeta, MULTI_VALUE_SEPARATOR};
use crate::reader::{ItemFieldSnafu, JsonSnafu, OpenSnafu, ReadResult, ReaderOptions};

/// Streaming decoder over a parsed JSON MRF document.
#[derive(Debug)]
pub struct JsonChargeReader {
    meta: HospitalMeta,
    format: SourceFormat,
    items: std::vec::IntoIter<RawItem>,
    next_index: usize,
    options: ReaderOptions,
}

impl JsonChargeReader {
    /// Opens and deserializes a JSON MRF, capturing hospital metadata and the
    /// schema version before the first item is yielded.
    pub(crate) fn open(path: &Path, options: ReaderOptions) -> ReadResult<Self> {
        let file = File::open(path).context(OpenSnafu { path })?;
        let document: RawDocument =
            serde_json::from_reader(BufReader::new(file)).context(JsonSnafu { path })?;

        let format = if document.location_name.is_some() || document.attestation.is_some() {
            SourceFormat::JsonV3
        } else {
            SourceFormat::JsonV2
        };

        let location = document
            .location_name
            .or(document.hospital_location)
            .map(|v| v.joined())
            .unwrap_or_default();
        let address = document
            .hospital_address
            .map(|v| v.joined())
            .unwrap_or_default();
        let (license_number, license_state) = document
            .license_information
            .map(|license| (license.license_number, license.state))
            .unwrap_or_default();
        let affirmation = document
            .affirmation
            .and_then(|a| a.affirmation)
            .or_else(|| document.attestation.and_then(|a| a.attested))
            .unwrap_or(false);

        let meta = HospitalMeta {
            hospital_name: document.hospital_name.unwrap_or_default(),
            last_updated_on: document.last_updated_on.unwrap_or_default(),
            version: document.version.unwrap_or_default(),
            hospital_location: location,
            hospital_address: address,
            license_number,
            license_state,
            affirmation,
        };

        Ok(Self {
            meta,
            format,
            items: document.standard_charge_information.into_iter(),
            next_index: 0,
            options,
        })
    }

    /// Expands the next `standard_charge_information` item into charge rows.
    pub(crate) fn next_rows(&mut self) -> ReadResult<Option<Vec<HospitalChargeRow>>> {
        let Some(item) = self.items.next() else {
            return Ok(None);
        };
        let index = self.next_index;
        self.next_index += 1;
        decode_item(item, index, &self.meta, self.options).map(Some)
    }

    /// Detected schema generation.
    pub fn format(&self) -> SourceFormat {
        self.format
    }

    /// Zero-based index of the item most recently decoded.
    pub fn item_num(&self) -> usize {
        self.next_index.saturating_sub(1)
    }

    /// Items consumed so far.
    pub fn items_read(&self) -> u64 {
        self.next_index as u64
    }
}

fn decode_item(
    item: RawItem,
    index: usize,
    meta: &HospitalMeta,
    options: ReaderOptions,
) -> ReadResult<Vec<HospitalChargeRow>> {
    let description = item
        .description
        .filter(|d| !d.trim().is_empty())
        .context(ItemFieldSnafu {
            index,
            field: "description",
        })?;

    let mut base = HospitalChargeRow::from_meta(meta);
    base.description = description;

    for code_info in &item.code_information {
        let (Some(code), Some(label)) = (&code_info.code, &code_info.code_type) else {
            continue;
        };
        match CodeType::parse(label) {
            Some(code_type) => base.set_code(code_type, code.clone()),
            None => log::warn!("item {index}: dropping code {code:?} with unknown type {label:?}"),
        }
    }

    if let Some(drug) = &item.drug_information {
        base.drug_unit_of_measurement = drug.unit.as_ref().and_then(NumberCell::value);
        base.drug_type_of_measurement = drug.drug_type.clone().filter(|t| !t.is_empty());
    }

    let mut rows = Vec::new();
    for charge in item.standard_charges {
        let mut setting_row = base.clone();
        setting_row.setting = charge.setting.unwrap_or_default();
        setting_row.gross_charge = charge.gross_charge.as_ref().and_then(NumberCell::value);
        setting_row.discounted_cash = charge.discounted_cash.as_ref().and_then(NumberCell::value);
        setting_row.min_charge = charge.minimum.as_ref().and_then(NumberCell::value);
        setting_row.max_charge = charge.maximum.as_ref().and_then(NumberCell::value);
        if !charge.billing_code_modifier.is_empty() {
            setting_row.modifiers = Some(charge.billing_code_modifier.join("|"));
        }
        setting_row.additional_generic_notes =
            charge.additional_generic_notes.filter(|n| !n.is_empty());

        if options.skip_payer_charges || charge.payers_information.is_empty() {
            rows.push(setting_row);
            continue;
        }

        for payer in charge.payers_information {
            let Some(payer_name) = payer.payer_name.filter(|p| !p.trim().is_empty()) else {
                log::warn!("item {index}: dropping payer entry without payer_name");
                continue;
            };
            let mut out = setting_row.clone();
            out.payer_name = Some(payer_name);
            out.plan_name = payer.plan_name.filter(|p| !p.is_empty());
            out.negotiated_dollar = payer
                .standard_charge_dollar
                .as_ref()
                .and_then(NumberCell::value);
            out.negotiated_percentage = payer
                .standard_charge_percentage
                .as_ref()
                .and_then(NumberCell::value);
            out.estimated_amount = payer.estimated_amount.as_ref().and_then(NumberCell::value);
            out.methodology = payer.methodology.filter(|m| !m.is_empty());
            out.negotiated_algorithm = payer.standard_charge_algorithm.filter(|a| !a.is_empty());
            out.additional_payer_notes = payer.additional_payer_notes.filter(|n| !n.is_empty());
            rows.push(out);
        }
    }
    Ok(rows)
}

/// Top-level MRF document; tolerant union of the v2 and v3 metadata keys.
#[derive(Debug, Deserialize)]
struct RawDocument {
    hospital_name: Option<String>,
    last_updated_on: Option<String>,
    version: Option<String>,
    hospital_location: Option<OneOrMany>,
    location_name: Option<OneOrMany>,
    hospital_address: Option<OneOrMany>,
    license_information: Option<RawLicense>,
    affirmation: Option<RawAffirmation>,
    attestation: Option<RawAttestation>,
    #[serde(default)]
    standard_charge_information: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawLicense {
    license_number: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAffirmation {
    affirmation: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawAttestation {
    attested: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    description: Option<String>,
    #[serde(default)]
    code_information: Vec<RawCode>,
    drug_information: Option<RawDrug>,
    #[serde(default)]
    standard_charges: Vec<RawCharge>,
}

#[derive(Debug, Deserialize)]
struct RawCode {
    code: Option<String>,
    #[serde(rename = "type")]
    code_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDrug {
    unit: Option<NumberCell>,
    #[serde(rename = "type")]
    drug_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCharge {
    setting: Option<String>,
    gross_charge: Option<NumberCell>,
    discounted_cash: Option<NumberCell>,
    minimum: Option<NumberCell>,
    maximum: Option<NumberCell>,
    #[serde(default)]
    billing_code_modifier: Vec<String>,
    additional_generic_notes: Option<String>,
    #[serde(default)]
    payers_information: Vec<RawPayer>,
}

#[derive(Debug, Deserialize)]
struct RawPayer {
    payer_name: Option<String>,
    plan_name: Option<String>,
    standard_charge_dollar: Option<NumberCell>,
    standard_charge_percentage: Option<NumberCell>,
    estimated_amount: Option<NumberCell>,
    methodology: Option<String>,
    standard_charge_algorithm: Option<String>,
    additional_payer_notes: Option<String>,
}

/// A numeric field that v2 files may write as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NumberCell {
    Number(f64),
    Text(String),
}

impl NumberCell {
    /// Numeric value; empty or non-numeric text decodes as null.
    fn value(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse().ok()
                }
            }
        }
    }
}

/// A field that may be a single string or an array of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn joined(self) -> String {
        match self {
            Self::One(s) => s,
            Self::Many(v) => v.join(MULTI_VALUE_SEPARATOR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_cell_accepts_numbers_and_numeric_strings() {
        let n: NumberCell = serde_json::from_str("45000.0").unwrap();
        assert_eq!(n.value(), Some(45000.0));
        let s: NumberCell = serde_json::from_str("\"45000.00\"").unwrap();
        assert_eq!(s.value(), Some(45000.0));
        let blank: NumberCell = serde_json::from_str("\"\"").unwrap();
        assert_eq!(blank.value(), None);
        let text: NumberCell = serde_json::from_str("\"varies\"").unwrap();
        assert_eq!(text.value(), None);
    }

    #[test]
    fn one_or_many_joins_arrays() {
        let one: OneOrMany = serde_json::from_str("\"Metro Health Center\"").unwrap();
        assert_eq!(one.joined(), "Metro Health Center");
        let many: OneOrMany = serde_json::from_str("[\"456 Oak Ave\",\"Brooklyn, NY 11201\"]").unwrap();
        assert_eq!(many.joined(), "456 Oak Ave; Brooklyn, NY 11201");
    }

    #[test]
    fn item_without_description_fails_with_index() {
        let item: RawItem = serde_json::from_str(r#"{"standard_charges": []}"#).unwrap();
        let err = decode_item(item, 4, &HospitalMeta::default(), ReaderOptions::default())
            .unwrap_err();
        match err {
            crate::reader::ReadError::ItemField { index, field } => {
                assert_eq!(index, 4);
                assert_eq!(field, "description");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn setting_without_payers_emits_one_no_payer_row() {
        let item: RawItem = serde_json::from_str(
            r#"{
                "description": "EMERGENCY ROOM VISIT LEVEL 3",
                "code_information": [{"code": "99283", "type": "CPT"}],
                "standard_charges": [{
                    "setting": "outpatient",
                    "gross_charge": 950.00,
                    "discounted_cash": 475.00,
                    "payers_information": []
                }]
            }"#,
        )
        .unwrap();
        let rows = decode_item(item, 0, &HospitalMeta::default(), ReaderOptions::default())
            .expect("decode");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].payer_name, None);
        assert_eq!(rows[0].gross_charge, Some(950.0));
        assert_eq!(rows[0].min_charge, None);
        assert_eq!(rows[0].cpt_code.as_deref(), Some("99283"));
    }
}

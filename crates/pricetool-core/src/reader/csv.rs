//! Tall and Wide CSV MRF decoding.
//!
//! CSV MRFs carry three logical sections: a hospital-metadata header row, a
//! metadata values row, and a body with its own column header. The body
//! header decides the layout. Tall bodies name payers in generic
//! `payer_name`/`plan_name` columns and expand to exactly one charge row per
//! body row. Wide bodies encode each `(payer, plan)` pair inside
//! `standard_charge|<payer>|<plan>|<field>` column names and expand to one
//! charge row per populated pair, falling back to a single no-payer row when
//! no pair is populated but gross pricing is present.
//!
//! Header names are parsed once, into column indexes; per-row decoding is
//! index lookups only.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;

use csv::{Reader, ReaderBuilder, StringRecord};
use snafu::prelude::*;

use crate::detect::{self, CsvLayout, SourceFormat, WideField};
use crate::model::{CodeType, HospitalChargeRow, HospitalMeta};
use crate::reader::{
    CsvSnafu, MissingBodyHeaderSnafu, MissingColumnSnafu, MissingPreambleSnafu, OpenSnafu,
    ReadResult, ReaderOptions, RowWidthSnafu, money_cell, opt_cell,
};

/// Streaming decoder for Tall and Wide CSV MRFs.
#[derive(Debug)]
pub struct CsvChargeReader {
    reader: Reader<File>,
    meta: HospitalMeta,
    layout: Layout,
    options: ReaderOptions,
    row_num: u64,
}

impl CsvChargeReader {
    /// Opens a CSV MRF: consumes the two-row preamble, reads the body column
    /// header, and classifies the layout.
    pub(crate) fn open(path: &Path, options: ReaderOptions) -> ReadResult<Self> {
        let file = File::open(path).context(OpenSnafu { path })?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut record = StringRecord::new();
        if !reader.read_record(&mut record).context(CsvSnafu { row: 0u64 })? {
            return MissingPreambleSnafu { path }.fail();
        }
        let meta_names = record.clone();
        if !reader.read_record(&mut record).context(CsvSnafu { row: 0u64 })? {
            return MissingPreambleSnafu { path }.fail();
        }
        let meta = hospital_meta(&meta_names, &record);
        if !reader.read_record(&mut record).context(CsvSnafu { row: 0u64 })? {
            return MissingBodyHeaderSnafu { path }.fail();
        }
        let layout = Layout::from_header(record.clone())?;

        Ok(Self {
            reader,
            meta,
            layout,
            options,
            row_num: 0,
        })
    }

    /// Decodes the next body row. Tall rows expand to one charge row; Wide
    /// rows expand to up to `payer_plan_count` charge rows plus the no-payer
    /// fallback.
    pub(crate) fn next_rows(&mut self) -> ReadResult<Option<Vec<HospitalChargeRow>>> {
        let mut record = StringRecord::new();
        let more = self
            .reader
            .read_record(&mut record)
            .context(CsvSnafu {
                row: self.row_num + 1,
            })?;
        if !more {
            return Ok(None);
        }
        self.row_num += 1;
        let row = self.row_num;

        let expected = self.layout.header().len();
        ensure!(
            record.len() == expected,
            RowWidthSnafu {
                row,
                expected,
                got: record.len(),
            }
        );

        let rows = match &self.layout {
            Layout::Tall(columns) => decode_tall(columns, &self.meta, &record, row, self.options)?,
            Layout::Wide(columns) => decode_wide(columns, &self.meta, &record, row, self.options)?,
        };
        Ok(Some(rows))
    }

    /// Detected body layout.
    pub fn format(&self) -> SourceFormat {
        match self.layout {
            Layout::Tall(_) => SourceFormat::TallCsv,
            Layout::Wide(_) => SourceFormat::WideCsv,
        }
    }

    /// Number of `(payer, plan)` pairs found in a Wide header.
    pub fn payer_plan_count(&self) -> Option<usize> {
        match &self.layout {
            Layout::Wide(columns) => Some(columns.pairs.len()),
            Layout::Tall(_) => None,
        }
    }

    /// 1-based body row most recently decoded; 0 before the first row.
    pub fn row_num(&self) -> u64 {
        self.row_num
    }
}

#[derive(Debug)]
enum Layout {
    Tall(TallColumns),
    Wide(WideColumns),
}

impl Layout {
    fn from_header(header: StringRecord) -> ReadResult<Self> {
        match detect::csv_layout(header.iter()) {
            CsvLayout::Tall => TallColumns::from_header(header).map(Layout::Tall),
            CsvLayout::Wide => WideColumns::from_header(header).map(Layout::Wide),
        }
    }

    fn header(&self) -> &StringRecord {
        match self {
            Layout::Tall(columns) => &columns.body.header,
            Layout::Wide(columns) => &columns.body.header,
        }
    }
}

/// Column indexes shared by both layouts.
#[derive(Debug)]
struct BodyColumns {
    header: StringRecord,
    description: usize,
    setting: usize,
    codes: Vec<CodePair>,
    gross_charge: Option<usize>,
    discounted_cash: Option<usize>,
    min_charge: Option<usize>,
    max_charge: Option<usize>,
    drug_unit: Option<usize>,
    drug_type: Option<usize>,
    generic_notes: Option<usize>,
    modifiers: Option<usize>,
}

/// A `code|N` column and its `code|N|type` companion.
#[derive(Debug)]
struct CodePair {
    code: usize,
    label: usize,
}

impl BodyColumns {
    fn from_header(header: StringRecord) -> ReadResult<Self> {
        let mut description = None;
        let mut setting = None;
        let mut gross_charge = None;
        let mut discounted_cash = None;
        let mut min_charge = None;
        let mut max_charge = None;
        let mut drug_unit = None;
        let mut drug_type = None;
        let mut generic_notes = None;
        let mut modifiers = None;
        let mut code_slots: BTreeMap<u32, (Option<usize>, Option<usize>)> = BTreeMap::new();

        for (idx, name) in header.iter().enumerate() {
            match name {
                "description" => description = Some(idx),
                "setting" => setting = Some(idx),
                "standard_charge|gross" => gross_charge = Some(idx),
                "standard_charge|discounted_cash" => discounted_cash = Some(idx),
                "standard_charge|min" => min_charge = Some(idx),
                "standard_charge|max" => max_charge = Some(idx),
                "drug_unit_of_measurement" => drug_unit = Some(idx),
                "drug_type_of_measurement" => drug_type = Some(idx),
                "additional_generic_notes" => generic_notes = Some(idx),
                "modifiers" => modifiers = Some(idx),
                other => {
                    if let Some((n, part)) = code_header(other) {
                        let slot = code_slots.entry(n).or_default();
                        match part {
                            CodePart::Code => slot.0 = Some(idx),
                            CodePart::Label => slot.1 = Some(idx),
                        }
                    }
                }
            }
        }

        let codes = code_slots
            .into_values()
            .filter_map(|(code, label)| {
                Some(CodePair {
                    code: code?,
                    label: label?,
                })
            })
            .collect();

        Ok(Self {
            description: description.context(MissingColumnSnafu {
                column: "description",
            })?,
            setting: setting.context(MissingColumnSnafu { column: "setting" })?,
            header,
            codes,
            gross_charge,
            discounted_cash,
            min_charge,
            max_charge,
            drug_unit,
            drug_type,
            generic_notes,
            modifiers,
        })
    }
}

#[derive(Debug)]
enum CodePart {
    Code,
    Label,
}

fn code_header(name: &str) -> Option<(u32, CodePart)> {
    let rest = name.strip_prefix("code|")?;
    match rest.split_once('|') {
        None => rest.parse().ok().map(|n| (n, CodePart::Code)),
        Some((n, "type")) => n.parse().ok().map(|n| (n, CodePart::Label)),
        Some(_) => None,
    }
}

#[derive(Debug)]
struct TallColumns {
    body: BodyColumns,
    payer_name: Option<usize>,
    plan_name: Option<usize>,
    negotiated_dollar: Option<usize>,
    negotiated_percentage: Option<usize>,
    estimated_amount: Option<usize>,
    methodology: Option<usize>,
    negotiated_algorithm: Option<usize>,
    payer_notes: Option<usize>,
}

impl TallColumns {
    fn from_header(header: StringRecord) -> ReadResult<Self> {
        let mut payer_name = None;
        let mut plan_name = None;
        let mut negotiated_dollar = None;
        let mut negotiated_percentage = None;
        let mut estimated_amount = None;
        let mut methodology = None;
        let mut negotiated_algorithm = None;
        let mut payer_notes = None;

        for (idx, name) in header.iter().enumerate() {
            match name {
                "payer_name" => payer_name = Some(idx),
                "plan_name" => plan_name = Some(idx),
                "standard_charge|negotiated_dollar" => negotiated_dollar = Some(idx),
                "standard_charge|negotiated_percentage" => negotiated_percentage = Some(idx),
                "standard_charge|estimated_amount" => estimated_amount = Some(idx),
                "standard_charge|methodology" => methodology = Some(idx),
                "standard_charge|negotiated_algorithm" => negotiated_algorithm = Some(idx),
                "additional_payer_notes" => payer_notes = Some(idx),
                _ => {}
            }
        }

        Ok(Self {
            body: BodyColumns::from_header(header)?,
            payer_name,
            plan_name,
            negotiated_dollar,
            negotiated_percentage,
            estimated_amount,
            methodology,
            negotiated_algorithm,
            payer_notes,
        })
    }
}

#[derive(Debug)]
struct WideColumns {
    body: BodyColumns,
    pairs: Vec<PayerPlanColumns>,
}

/// One `(payer, plan)` column group, in first-seen header order.
#[derive(Debug)]
struct PayerPlanColumns {
    payer: String,
    plan: String,
    negotiated_dollar: Option<usize>,
    negotiated_percentage: Option<usize>,
    estimated_amount: Option<usize>,
    methodology: Option<usize>,
    negotiated_algorithm: Option<usize>,
}

impl PayerPlanColumns {
    /// Underscores in the header-encoded plan segment stand in for spaces;
    /// payer segments pass through verbatim.
    fn new(payer: &str, plan: &str) -> Self {
        Self {
            payer: payer.to_string(),
            plan: plan.replace('_', " "),
            negotiated_dollar: None,
            negotiated_percentage: None,
            estimated_amount: None,
            methodology: None,
            negotiated_algorithm: None,
        }
    }
}

impl WideColumns {
    fn from_header(header: StringRecord) -> ReadResult<Self> {
        let mut pairs: Vec<PayerPlanColumns> = Vec::new();
        let mut by_identity: HashMap<(String, String), usize> = HashMap::new();

        for (idx, name) in header.iter().enumerate() {
            let Some(parsed) = detect::wide_header(name) else {
                continue;
            };
            let key = (parsed.payer.to_string(), parsed.plan.to_string());
            let pair_idx = *by_identity.entry(key).or_insert_with(|| {
                pairs.push(PayerPlanColumns::new(parsed.payer, parsed.plan));
                pairs.len() - 1
            });
            let pair = &mut pairs[pair_idx];
            match parsed.field {
                WideField::NegotiatedDollar => pair.negotiated_dollar = Some(idx),
                WideField::NegotiatedPercentage => pair.negotiated_percentage = Some(idx),
                WideField::EstimatedAmount => pair.estimated_amount = Some(idx),
                WideField::Methodology => pair.methodology = Some(idx),
                WideField::NegotiatedAlgorithm => pair.negotiated_algorithm = Some(idx),
            }
        }

        Ok(Self {
            body: BodyColumns::from_header(header)?,
            pairs,
        })
    }
}

fn hospital_meta(names: &StringRecord, values: &StringRecord) -> HospitalMeta {
    let mut meta = HospitalMeta::default();
    for (name, value) in names.iter().zip(values.iter()) {
        match name.trim() {
            "hospital_name" => meta.hospital_name = value.trim().to_string(),
            "last_updated_on" => meta.last_updated_on = value.trim().to_string(),
            "version" => meta.version = value.trim().to_string(),
            "hospital_location" => meta.hospital_location = value.trim().to_string(),
            "hospital_address" => meta.hospital_address = value.trim().to_string(),
            "license_number" => meta.license_number = opt_cell(value),
            "license_state" => meta.license_state = opt_cell(value),
            _ => {}
        }
    }
    meta
}

fn cell<'a>(record: &'a StringRecord, idx: usize) -> &'a str {
    record.get(idx).unwrap_or("")
}

fn opt_at(record: &StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| opt_cell(cell(record, i)))
}

fn money_at(
    record: &StringRecord,
    header: &StringRecord,
    idx: Option<usize>,
    row: u64,
) -> ReadResult<Option<f64>> {
    match idx {
        None => Ok(None),
        Some(i) => money_cell(cell(record, i), row, header.get(i).unwrap_or("")),
    }
}

fn decode_body(
    body: &BodyColumns,
    meta: &HospitalMeta,
    record: &StringRecord,
    row: u64,
) -> ReadResult<HospitalChargeRow> {
    let mut out = HospitalChargeRow::from_meta(meta);
    out.description = cell(record, body.description).trim().to_string();
    out.setting = cell(record, body.setting).trim().to_string();

    for pair in &body.codes {
        let Some(code) = opt_cell(cell(record, pair.code)) else {
            continue;
        };
        let label = cell(record, pair.label);
        match CodeType::parse(label) {
            Some(code_type) => out.set_code(code_type, code),
            None if !label.trim().is_empty() => {
                log::warn!("row {row}: dropping code {code:?} with unknown type {label:?}");
            }
            None => {}
        }
    }

    out.gross_charge = money_at(record, &body.header, body.gross_charge, row)?;
    out.discounted_cash = money_at(record, &body.header, body.discounted_cash, row)?;
    out.min_charge = money_at(record, &body.header, body.min_charge, row)?;
    out.max_charge = money_at(record, &body.header, body.max_charge, row)?;
    out.drug_unit_of_measurement = money_at(record, &body.header, body.drug_unit, row)?;
    out.drug_type_of_measurement = opt_at(record, body.drug_type);
    out.additional_generic_notes = opt_at(record, body.generic_notes);
    out.modifiers = opt_at(record, body.modifiers);
    Ok(out)
}

fn decode_tall(
    columns: &TallColumns,
    meta: &HospitalMeta,
    record: &StringRecord,
    row: u64,
    options: ReaderOptions,
) -> ReadResult<Vec<HospitalChargeRow>> {
    let mut out = decode_body(&columns.body, meta, record, row)?;
    let header = &columns.body.header;

    match opt_at(record, columns.payer_name) {
        Some(payer_name) if !options.skip_payer_charges => {
            out.payer_name = Some(payer_name);
            out.plan_name = opt_at(record, columns.plan_name);
            out.negotiated_dollar = money_at(record, header, columns.negotiated_dollar, row)?;
            out.negotiated_percentage =
                money_at(record, header, columns.negotiated_percentage, row)?;
            out.estimated_amount = money_at(record, header, columns.estimated_amount, row)?;
            out.methodology = opt_at(record, columns.methodology);
            out.negotiated_algorithm = opt_at(record, columns.negotiated_algorithm);
            out.additional_payer_notes = opt_at(record, columns.payer_notes);
            Ok(vec![out])
        }
        // skip_payer_charges converts a payer row into its gross-only shadow,
        // or drops it when there is no gross pricing to keep.
        Some(_) => Ok(if out.has_gross_pricing() {
            vec![out]
        } else {
            Vec::new()
        }),
        None if options.skip_payer_charges && !out.has_gross_pricing() => Ok(Vec::new()),
        None => Ok(vec![out]),
    }
}

fn decode_wide(
    columns: &WideColumns,
    meta: &HospitalMeta,
    record: &StringRecord,
    row: u64,
    options: ReaderOptions,
) -> ReadResult<Vec<HospitalChargeRow>> {
    let body = decode_body(&columns.body, meta, record, row)?;
    let header = &columns.body.header;

    let mut rows = Vec::new();
    if !options.skip_payer_charges {
        for pair in &columns.pairs {
            let negotiated_dollar = money_at(record, header, pair.negotiated_dollar, row)?;
            let negotiated_percentage =
                money_at(record, header, pair.negotiated_percentage, row)?;
            let estimated_amount = money_at(record, header, pair.estimated_amount, row)?;
            let methodology = opt_at(record, pair.methodology);
            if negotiated_dollar.is_none()
                && negotiated_percentage.is_none()
                && estimated_amount.is_none()
                && methodology.is_none()
            {
                continue;
            }
            let mut out = body.clone();
            out.payer_name = Some(pair.payer.clone());
            out.plan_name = Some(pair.plan.clone());
            out.negotiated_dollar = negotiated_dollar;
            out.negotiated_percentage = negotiated_percentage;
            out.estimated_amount = estimated_amount;
            out.methodology = methodology;
            out.negotiated_algorithm = opt_at(record, pair.negotiated_algorithm);
            rows.push(out);
        }
    }

    if rows.is_empty() && body.has_gross_pricing() {
        rows.push(body);
    }
    Ok(rows)
}

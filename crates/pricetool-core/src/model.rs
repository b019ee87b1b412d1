//! Normalized charge-row data model.
//!
//! Every input variant (Tall/Wide CSV, JSON v2/v3) decodes into the same flat
//! [`HospitalChargeRow`]. One row is one fact: "at this hospital, for this
//! service, under this setting, the charge for this payer/plan is X, computed
//! by methodology M". Readers create rows, the writer buffers and lays them
//! out; rows are never mutated after they are handed to the writer.

use std::cmp::Ordering;

/// Separator used when a source file carries multiple locations or addresses.
pub const MULTI_VALUE_SEPARATOR: &str = "; ";

/// Output column names of the 19 code fields, in schema order.
///
/// This order is shared by the Parquet schema, the row conversion, and the
/// bloom-filter configuration; keep the three in sync through this constant.
pub const CODE_COLUMNS: [&str; 19] = [
    "cpt_code",
    "hcpcs_code",
    "ms_drg_code",
    "ndc_code",
    "rc_code",
    "icd_code",
    "drg_code",
    "cdm_code",
    "local_code",
    "apc_code",
    "eapg_code",
    "hipps_code",
    "cdt_code",
    "r_drg_code",
    "s_drg_code",
    "aps_drg_code",
    "ap_drg_code",
    "apr_drg_code",
    "tris_drg_code",
];

/// Hospital-level metadata parsed once from a file's preamble (CSV) or
/// top-level object (JSON) and copied onto every emitted row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HospitalMeta {
    /// Disclosing hospital's name.
    pub hospital_name: String,
    /// Date the disclosure was last updated, as written in the source.
    pub last_updated_on: String,
    /// MRF schema version string declared by the file.
    pub version: String,
    /// Location name(s); multi-valued sources are joined with `"; "`.
    pub hospital_location: String,
    /// Street address line(s); multi-valued sources are joined with `"; "`.
    pub hospital_address: String,
    /// State license number, when disclosed.
    pub license_number: Option<String>,
    /// Two-letter licensing state, when disclosed.
    pub license_state: Option<String>,
    /// Whether the hospital affirmed/attested the disclosure.
    pub affirmation: bool,
}

/// A single denormalized charge fact; one row of the output table.
///
/// Field order here is the output column order. Optional fields distinguish
/// absent from empty so null state round-trips through Parquet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HospitalChargeRow {
    pub hospital_name: String,
    pub last_updated_on: String,
    pub version: String,
    pub hospital_location: String,
    pub hospital_address: String,
    pub license_number: Option<String>,
    pub license_state: Option<String>,
    pub affirmation: bool,

    pub description: String,
    pub setting: String,

    pub cpt_code: Option<String>,
    pub hcpcs_code: Option<String>,
    pub ms_drg_code: Option<String>,
    pub ndc_code: Option<String>,
    pub rc_code: Option<String>,
    pub icd_code: Option<String>,
    pub drg_code: Option<String>,
    pub cdm_code: Option<String>,
    pub local_code: Option<String>,
    pub apc_code: Option<String>,
    pub eapg_code: Option<String>,
    pub hipps_code: Option<String>,
    pub cdt_code: Option<String>,
    pub r_drg_code: Option<String>,
    pub s_drg_code: Option<String>,
    pub aps_drg_code: Option<String>,
    pub ap_drg_code: Option<String>,
    pub apr_drg_code: Option<String>,
    pub tris_drg_code: Option<String>,

    pub gross_charge: Option<f64>,
    pub discounted_cash: Option<f64>,
    pub min_charge: Option<f64>,
    pub max_charge: Option<f64>,

    pub payer_name: Option<String>,
    pub plan_name: Option<String>,
    pub negotiated_dollar: Option<f64>,
    pub negotiated_percentage: Option<f64>,
    pub estimated_amount: Option<f64>,
    pub methodology: Option<String>,
    pub negotiated_algorithm: Option<String>,

    pub drug_unit_of_measurement: Option<f64>,
    pub drug_type_of_measurement: Option<String>,
    pub additional_generic_notes: Option<String>,
    pub additional_payer_notes: Option<String>,
    pub modifiers: Option<String>,
}

impl HospitalChargeRow {
    /// Starts a row with the hospital metadata filled in and everything else
    /// empty. Readers populate service identity and pricing on top.
    pub fn from_meta(meta: &HospitalMeta) -> Self {
        Self {
            hospital_name: meta.hospital_name.clone(),
            last_updated_on: meta.last_updated_on.clone(),
            version: meta.version.clone(),
            hospital_location: meta.hospital_location.clone(),
            hospital_address: meta.hospital_address.clone(),
            license_number: meta.license_number.clone(),
            license_state: meta.license_state.clone(),
            affirmation: meta.affirmation,
            ..Self::default()
        }
    }

    /// Stores `code` in the column selected by `code_type`.
    pub fn set_code(&mut self, code_type: CodeType, code: String) {
        let slot = match code_type {
            CodeType::Cpt => &mut self.cpt_code,
            CodeType::Hcpcs => &mut self.hcpcs_code,
            CodeType::MsDrg => &mut self.ms_drg_code,
            CodeType::Ndc => &mut self.ndc_code,
            CodeType::Rc => &mut self.rc_code,
            CodeType::Icd => &mut self.icd_code,
            CodeType::Drg => &mut self.drg_code,
            CodeType::Cdm => &mut self.cdm_code,
            CodeType::Local => &mut self.local_code,
            CodeType::Apc => &mut self.apc_code,
            CodeType::Eapg => &mut self.eapg_code,
            CodeType::Hipps => &mut self.hipps_code,
            CodeType::Cdt => &mut self.cdt_code,
            CodeType::RDrg => &mut self.r_drg_code,
            CodeType::SDrg => &mut self.s_drg_code,
            CodeType::ApsDrg => &mut self.aps_drg_code,
            CodeType::ApDrg => &mut self.ap_drg_code,
            CodeType::AprDrg => &mut self.apr_drg_code,
            CodeType::TrisDrg => &mut self.tris_drg_code,
        };
        *slot = Some(code);
    }

    /// True when at least one of the gross/cash/min/max prices is present.
    pub fn has_gross_pricing(&self) -> bool {
        self.gross_charge.is_some()
            || self.discounted_cash.is_some()
            || self.min_charge.is_some()
            || self.max_charge.is_some()
    }
}

/// Compares two optional `cpt_code` values; nulls sort before any value.
///
/// This is the writer's global sort key. Use with a stable sort so rows with
/// equal keys keep insertion order.
pub fn cmp_by_cpt(a: &HospitalChargeRow, b: &HospitalChargeRow) -> Ordering {
    match (&a.cpt_code, &b.cpt_code) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.cmp(b),
    }
}

/// Medical billing code vocabulary, one variant per output code column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeType {
    Cpt,
    Hcpcs,
    MsDrg,
    Ndc,
    Rc,
    Icd,
    Drg,
    Cdm,
    Local,
    Apc,
    Eapg,
    Hipps,
    Cdt,
    RDrg,
    SDrg,
    ApsDrg,
    ApDrg,
    AprDrg,
    TrisDrg,
}

impl CodeType {
    /// Parses a source type label. Matching is case-insensitive and treats
    /// `-` and `_` as equivalent, so `MS-DRG`, `ms_drg`, and `Ms-Drg` all
    /// select the same column. Unknown labels return `None`.
    pub fn parse(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .chars()
            .map(|c| match c {
                '_' => '-',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        match normalized.as_str() {
            "CPT" => Some(Self::Cpt),
            "HCPCS" => Some(Self::Hcpcs),
            "MS-DRG" => Some(Self::MsDrg),
            "NDC" => Some(Self::Ndc),
            "RC" => Some(Self::Rc),
            "ICD" => Some(Self::Icd),
            "DRG" => Some(Self::Drg),
            "CDM" => Some(Self::Cdm),
            "LOCAL" => Some(Self::Local),
            "APC" => Some(Self::Apc),
            "EAPG" => Some(Self::Eapg),
            "HIPPS" => Some(Self::Hipps),
            "CDT" => Some(Self::Cdt),
            "R-DRG" => Some(Self::RDrg),
            "S-DRG" => Some(Self::SDrg),
            "APS-DRG" => Some(Self::ApsDrg),
            "AP-DRG" => Some(Self::ApDrg),
            "APR-DRG" => Some(Self::AprDrg),
            "TRIS-DRG" => Some(Self::TrisDrg),
            _ => None,
        }
    }

    /// Output column name for this vocabulary.
    pub const fn column(self) -> &'static str {
        match self {
            Self::Cpt => "cpt_code",
            Self::Hcpcs => "hcpcs_code",
            Self::MsDrg => "ms_drg_code",
            Self::Ndc => "ndc_code",
            Self::Rc => "rc_code",
            Self::Icd => "icd_code",
            Self::Drg => "drg_code",
            Self::Cdm => "cdm_code",
            Self::Local => "local_code",
            Self::Apc => "apc_code",
            Self::Eapg => "eapg_code",
            Self::Hipps => "hipps_code",
            Self::Cdt => "cdt_code",
            Self::RDrg => "r_drg_code",
            Self::SDrg => "s_drg_code",
            Self::ApsDrg => "aps_drg_code",
            Self::ApDrg => "ap_drg_code",
            Self::AprDrg => "apr_drg_code",
            Self::TrisDrg => "tris_drg_code",
        }
    }
}

//! Arrow schema for the charge table and row-to-batch conversion.
//!
//! Column order follows the data model field order; the 19 code columns sit
//! between the service identity and the gross pricing block. Nullability is
//! exact: required metadata and identity columns are non-null, everything
//! else is nullable so absent values survive the trip into Parquet.

use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;

use crate::model::{CODE_COLUMNS, HospitalChargeRow};

/// Builds the output schema. One field per `HospitalChargeRow` column.
pub fn charge_schema() -> SchemaRef {
    let mut fields = vec![
        Field::new("hospital_name", DataType::Utf8, false),
        Field::new("last_updated_on", DataType::Utf8, false),
        Field::new("version", DataType::Utf8, false),
        Field::new("hospital_location", DataType::Utf8, false),
        Field::new("hospital_address", DataType::Utf8, false),
        Field::new("license_number", DataType::Utf8, true),
        Field::new("license_state", DataType::Utf8, true),
        Field::new("affirmation", DataType::Boolean, false),
        Field::new("description", DataType::Utf8, false),
        Field::new("setting", DataType::Utf8, false),
    ];
    fields.extend(
        CODE_COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::Utf8, true)),
    );
    fields.extend([
        Field::new("gross_charge", DataType::Float64, true),
        Field::new("discounted_cash", DataType::Float64, true),
        Field::new("min_charge", DataType::Float64, true),
        Field::new("max_charge", DataType::Float64, true),
        Field::new("payer_name", DataType::Utf8, true),
        Field::new("plan_name", DataType::Utf8, true),
        Field::new("negotiated_dollar", DataType::Float64, true),
        Field::new("negotiated_percentage", DataType::Float64, true),
        Field::new("estimated_amount", DataType::Float64, true),
        Field::new("methodology", DataType::Utf8, true),
        Field::new("negotiated_algorithm", DataType::Utf8, true),
        Field::new("drug_unit_of_measurement", DataType::Float64, true),
        Field::new("drug_type_of_measurement", DataType::Utf8, true),
        Field::new("additional_generic_notes", DataType::Utf8, true),
        Field::new("additional_payer_notes", DataType::Utf8, true),
        Field::new("modifiers", DataType::Utf8, true),
    ]);
    Arc::new(Schema::new(fields))
}

fn required_string<'a>(
    rows: &'a [HospitalChargeRow],
    get: impl Fn(&'a HospitalChargeRow) -> &'a str,
) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(rows.iter().map(get)))
}

fn opt_string<'a>(
    rows: &'a [HospitalChargeRow],
    get: impl Fn(&'a HospitalChargeRow) -> Option<&'a str>,
) -> ArrayRef {
    Arc::new(StringArray::from_iter(rows.iter().map(get)))
}

fn opt_f64(
    rows: &[HospitalChargeRow],
    get: impl Fn(&HospitalChargeRow) -> Option<f64>,
) -> ArrayRef {
    Arc::new(Float64Array::from_iter(rows.iter().map(get)))
}

/// Converts a slice of rows into one `RecordBatch` matching [`charge_schema`].
pub fn charge_batch(
    schema: &SchemaRef,
    rows: &[HospitalChargeRow],
) -> Result<RecordBatch, ArrowError> {
    let columns: Vec<ArrayRef> = vec![
        required_string(rows, |r| r.hospital_name.as_str()),
        required_string(rows, |r| r.last_updated_on.as_str()),
        required_string(rows, |r| r.version.as_str()),
        required_string(rows, |r| r.hospital_location.as_str()),
        required_string(rows, |r| r.hospital_address.as_str()),
        opt_string(rows, |r| r.license_number.as_deref()),
        opt_string(rows, |r| r.license_state.as_deref()),
        Arc::new(BooleanArray::from_iter(
            rows.iter().map(|r| Some(r.affirmation)),
        )),
        required_string(rows, |r| r.description.as_str()),
        required_string(rows, |r| r.setting.as_str()),
        opt_string(rows, |r| r.cpt_code.as_deref()),
        opt_string(rows, |r| r.hcpcs_code.as_deref()),
        opt_string(rows, |r| r.ms_drg_code.as_deref()),
        opt_string(rows, |r| r.ndc_code.as_deref()),
        opt_string(rows, |r| r.rc_code.as_deref()),
        opt_string(rows, |r| r.icd_code.as_deref()),
        opt_string(rows, |r| r.drg_code.as_deref()),
        opt_string(rows, |r| r.cdm_code.as_deref()),
        opt_string(rows, |r| r.local_code.as_deref()),
        opt_string(rows, |r| r.apc_code.as_deref()),
        opt_string(rows, |r| r.eapg_code.as_deref()),
        opt_string(rows, |r| r.hipps_code.as_deref()),
        opt_string(rows, |r| r.cdt_code.as_deref()),
        opt_string(rows, |r| r.r_drg_code.as_deref()),
        opt_string(rows, |r| r.s_drg_code.as_deref()),
        opt_string(rows, |r| r.aps_drg_code.as_deref()),
        opt_string(rows, |r| r.ap_drg_code.as_deref()),
        opt_string(rows, |r| r.apr_drg_code.as_deref()),
        opt_string(rows, |r| r.tris_drg_code.as_deref()),
        opt_f64(rows, |r| r.gross_charge),
        opt_f64(rows, |r| r.discounted_cash),
        opt_f64(rows, |r| r.min_charge),
        opt_f64(rows, |r| r.max_charge),
        opt_string(rows, |r| r.payer_name.as_deref()),
        opt_string(rows, |r| r.plan_name.as_deref()),
        opt_f64(rows, |r| r.negotiated_dollar),
        opt_f64(rows, |r| r.negotiated_percentage),
        opt_f64(rows, |r| r.estimated_amount),
        opt_string(rows, |r| r.methodology.as_deref()),
        opt_string(rows, |r| r.negotiated_algorithm.as_deref()),
        opt_f64(rows, |r| r.drug_unit_of_measurement),
        opt_string(rows, |r| r.drug_type_of_measurement.as_deref()),
        opt_string(rows, |r| r.additional_generic_notes.as_deref()),
        opt_string(rows, |r| r.additional_payer_notes.as_deref()),
        opt_string(rows, |r| r.modifiers.as_deref()),
    ];
    RecordBatch::try_new(Arc::clone(schema), columns)
}

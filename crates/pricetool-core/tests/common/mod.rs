#![allow(dead_code)]

use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::array::{Array, BooleanArray, Float64Array, StringArray};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use pricetool_core::{ChargeReader, HospitalChargeRow};

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Tall CSV fixture. Carries both payer_name/plan_name and generic
/// standard_charge|... columns, the combination that must not flip detection
/// to Wide.
pub const TALL_CSV: &str = "\
hospital_name,last_updated_on,version,hospital_location,hospital_address
Test General Hospital,2024-01-15,2.0.0,\"New York, NY\",\"123 Main St, New York, NY 10001\"
description,setting,code|1,code|1|type,code|2,code|2|type,standard_charge|gross,standard_charge|discounted_cash,standard_charge|min,standard_charge|max,payer_name,plan_name,standard_charge|negotiated_dollar,standard_charge|methodology,drug_unit_of_measurement,drug_type_of_measurement,additional_generic_notes,modifiers
ECHOCARDIOGRAM COMPLETE,outpatient,93306,CPT,G0389,HCPCS,1500.00,750.00,500.00,2000.00,Aetna,Aetna PPO,900.00,fee_schedule,,,,
ECHOCARDIOGRAM COMPLETE,outpatient,93306,CPT,G0389,HCPCS,1500.00,750.00,500.00,2000.00,UnitedHealthcare,UHC Choice Plus,1100.00,case_rate,,,,
ACETAMINOPHEN 500MG TABLET,inpatient,00456-0422-01,NDC,,,15.50,8.25,5.00,20.00,Cigna,Cigna Open Access,10.00,fee_schedule,500.0,ME,Oral tablet only,
HEART TRANSPLANT WITH MCC,inpatient,001,MS-DRG,,,500000.00,250000.00,200000.00,750000.00,,,,,,,,26 59
";

/// Wide CSV fixture: two payer/plan column groups, second row populated for
/// Aetna only.
pub const WIDE_CSV: &str = "\
hospital_name,last_updated_on,version,hospital_location,hospital_address
Wide Test Hospital,2024-06-01,2.0.0,Brooklyn NY,456 Oak Ave Brooklyn NY 11201
description,setting,code|1,code|1|type,standard_charge|gross,standard_charge|discounted_cash,standard_charge|min,standard_charge|max,standard_charge|Aetna|PPO|negotiated_dollar,standard_charge|Aetna|PPO|methodology,standard_charge|UHC|Choice_Plus|negotiated_dollar,standard_charge|UHC|Choice_Plus|methodology
X-RAY CHEST,outpatient,71046,CPT,250.00,125.00,80.00,300.00,150.00,fee_schedule,175.00,case_rate
MRI BRAIN,inpatient,70553,CPT,3500.00,1750.00,1200.00,4000.00,2200.00,per_diem,,
";

/// JSON schema v2 fixture: three items, one of them payer-free, with v2's
/// string-typed numerics on the last item.
pub const V2_JSON: &str = r#"{
  "hospital_name": "Test Community Hospital",
  "last_updated_on": "2024-06-01",
  "version": "2.0.0",
  "hospital_location": ["Test Community Hospital", "456 Oak Ave, Brooklyn, NY 11201"],
  "hospital_address": ["456 Oak Ave", "Brooklyn, NY 11201"],
  "license_information": {"license_number": "H-99887", "state": "NY"},
  "affirmation": {"affirmation": true},
  "standard_charge_information": [
    {
      "description": "X-RAY CHEST 2 VIEWS",
      "code_information": [
        {"code": "71046", "type": "CPT"},
        {"code": "0324", "type": "RC"}
      ],
      "standard_charges": [
        {
          "setting": "outpatient",
          "gross_charge": 1250.00,
          "discounted_cash": 625.00,
          "minimum": 400.00,
          "maximum": 1800.00,
          "billing_code_modifier": ["26", "TC"],
          "additional_generic_notes": "Includes interpretation",
          "payers_information": [
            {
              "payer_name": "Aetna",
              "plan_name": "Aetna PPO",
              "standard_charge_dollar": 800.00,
              "methodology": "fee_schedule",
              "additional_payer_notes": "Network rate"
            },
            {
              "payer_name": "Blue Cross",
              "plan_name": "BC Standard",
              "standard_charge_percentage": 75.5,
              "estimated_amount": 943.75,
              "methodology": "percent_of_total_billed_charges"
            }
          ]
        }
      ]
    },
    {
      "description": "IBUPROFEN 200MG TABLET",
      "code_information": [
        {"code": "00573-0150-20", "type": "NDC"},
        {"code": "J3490", "type": "HCPCS"}
      ],
      "drug_information": {"unit": "200.0", "type": "ME"},
      "standard_charges": [
        {
          "setting": "inpatient",
          "gross_charge": 12.50,
          "discounted_cash": 6.25,
          "payers_information": [
            {
              "payer_name": "UnitedHealthcare",
              "plan_name": "UHC Choice Plus",
              "standard_charge_dollar": 8.00,
              "methodology": "per_diem",
              "standard_charge_algorithm": "per diem rate table v3"
            }
          ]
        }
      ]
    },
    {
      "description": "KNEE REPLACEMENT",
      "code_information": [{"code": "470", "type": "MS-DRG"}],
      "standard_charges": [
        {
          "setting": "inpatient",
          "gross_charge": "45000.00",
          "discounted_cash": "22500.00",
          "minimum": 20000.00,
          "maximum": 65000.00,
          "payers_information": []
        }
      ]
    }
  ]
}
"#;

/// JSON schema v3 fixture: `location_name` + `attestation`, one payer-free
/// item without min/max.
pub const V3_JSON: &str = r#"{
  "hospital_name": "Metro Health Center",
  "last_updated_on": "2025-01-15",
  "version": "3.0.0",
  "location_name": ["Metro Health Center", "789 Elm St, Manhattan, NY 10010"],
  "hospital_address": ["789 Elm St", "Manhattan, NY 10010"],
  "license_information": {"license_number": "MHC-5544", "state": "NY"},
  "attestation": {"attested": true},
  "standard_charge_information": [
    {
      "description": "MRI BRAIN WITHOUT CONTRAST",
      "code_information": [{"code": "70551", "type": "CPT"}],
      "standard_charges": [
        {
          "setting": "outpatient",
          "gross_charge": 3500.00,
          "discounted_cash": 1750.00,
          "minimum": 1200.00,
          "maximum": 4500.00,
          "payers_information": [
            {
              "payer_name": "Cigna",
              "plan_name": "Cigna Open Access",
              "standard_charge_dollar": 2200.00,
              "methodology": "case_rate"
            }
          ]
        }
      ]
    },
    {
      "description": "EMERGENCY ROOM VISIT LEVEL 3",
      "code_information": [
        {"code": "99283", "type": "CPT"},
        {"code": "0450", "type": "RC"}
      ],
      "standard_charges": [
        {
          "setting": "outpatient",
          "gross_charge": 950.00,
          "discounted_cash": 475.00,
          "payers_information": []
        }
      ]
    }
  ]
}
"#;

pub fn write_fixture(dir: &Path, name: &str, content: &str) -> TestResult<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, content)?;
    Ok(path)
}

/// Drains a reader into a flat row list.
pub fn collect_rows(reader: &mut ChargeReader) -> TestResult<Vec<HospitalChargeRow>> {
    let mut rows = Vec::new();
    while let Some(batch) = reader.next_rows()? {
        rows.extend(batch);
    }
    Ok(rows)
}

/// Reads every row back out of a written Parquet file.
pub fn read_rows(path: &Path) -> TestResult<Vec<HospitalChargeRow>> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let mut rows = Vec::new();
    for batch in reader {
        rows.extend(rows_from_batch(&batch?));
    }
    Ok(rows)
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> &'a StringArray {
    batch
        .column_by_name(name)
        .unwrap_or_else(|| panic!("missing column {name}"))
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap_or_else(|| panic!("column {name} is not Utf8"))
}

fn f64_col<'a>(batch: &'a RecordBatch, name: &str) -> &'a Float64Array {
    batch
        .column_by_name(name)
        .unwrap_or_else(|| panic!("missing column {name}"))
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap_or_else(|| panic!("column {name} is not Float64"))
}

pub fn rows_from_batch(batch: &RecordBatch) -> Vec<HospitalChargeRow> {
    let s = |name: &str, i: usize| string_col(batch, name).value(i).to_string();
    let os = |name: &str, i: usize| {
        let array = string_col(batch, name);
        (!array.is_null(i)).then(|| array.value(i).to_string())
    };
    let of = |name: &str, i: usize| {
        let array = f64_col(batch, name);
        (!array.is_null(i)).then(|| array.value(i))
    };
    let affirmations = batch
        .column_by_name("affirmation")
        .expect("missing column affirmation")
        .as_any()
        .downcast_ref::<BooleanArray>()
        .expect("column affirmation is not Boolean");

    (0..batch.num_rows())
        .map(|i| HospitalChargeRow {
            hospital_name: s("hospital_name", i),
            last_updated_on: s("last_updated_on", i),
            version: s("version", i),
            hospital_location: s("hospital_location", i),
            hospital_address: s("hospital_address", i),
            license_number: os("license_number", i),
            license_state: os("license_state", i),
            affirmation: affirmations.value(i),
            description: s("description", i),
            setting: s("setting", i),
            cpt_code: os("cpt_code", i),
            hcpcs_code: os("hcpcs_code", i),
            ms_drg_code: os("ms_drg_code", i),
            ndc_code: os("ndc_code", i),
            rc_code: os("rc_code", i),
            icd_code: os("icd_code", i),
            drg_code: os("drg_code", i),
            cdm_code: os("cdm_code", i),
            local_code: os("local_code", i),
            apc_code: os("apc_code", i),
            eapg_code: os("eapg_code", i),
            hipps_code: os("hipps_code", i),
            cdt_code: os("cdt_code", i),
            r_drg_code: os("r_drg_code", i),
            s_drg_code: os("s_drg_code", i),
            aps_drg_code: os("aps_drg_code", i),
            ap_drg_code: os("ap_drg_code", i),
            apr_drg_code: os("apr_drg_code", i),
            tris_drg_code: os("tris_drg_code", i),
            gross_charge: of("gross_charge", i),
            discounted_cash: of("discounted_cash", i),
            min_charge: of("min_charge", i),
            max_charge: of("max_charge", i),
            payer_name: os("payer_name", i),
            plan_name: os("plan_name", i),
            negotiated_dollar: of("negotiated_dollar", i),
            negotiated_percentage: of("negotiated_percentage", i),
            estimated_amount: of("estimated_amount", i),
            methodology: os("methodology", i),
            negotiated_algorithm: os("negotiated_algorithm", i),
            drug_unit_of_measurement: of("drug_unit_of_measurement", i),
            drug_type_of_measurement: os("drug_type_of_measurement", i),
            additional_generic_notes: os("additional_generic_notes", i),
            additional_payer_notes: os("additional_payer_notes", i),
            modifiers: os("modifiers", i),
        })
        .collect()
}

/// Finds the unique row with this description and payer; panics when absent.
pub fn find_row<'a>(
    rows: &'a [HospitalChargeRow],
    description: &str,
    payer: Option<&str>,
) -> &'a HospitalChargeRow {
    rows.iter()
        .find(|r| r.description == description && r.payer_name.as_deref() == payer)
        .unwrap_or_else(|| panic!("row not found: description={description:?} payer={payer:?}"))
}

/// Sorts rows with the writer's comparator so collections can be compared to
/// Parquet output order.
pub fn sort_by_cpt(rows: &mut [HospitalChargeRow]) {
    rows.sort_by(pricetool_core::model::cmp_by_cpt);
}

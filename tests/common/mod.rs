#![allow(dead_code)]

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde_json::{json, Value};

pub const MODEL_PATH: &str = "models/scoring_model.json";

/// Reference encounter accepted by the validator.
pub fn reference_payload() -> Value {
    json!({
        "age": 45,
        "gender": "Male",
        "weight": 70,
        "admission_type_id": 1,
        "discharge_disposition_id": 1,
        "admission_source_id": 1,
        "time_in_hospital": 1,
        "num_lab_procedures": 0,
        "num_procedures": 0,
        "num_medications": 0,
        "number_outpatient": 0,
        "number_emergency": 0,
        "number_inpatient": 0,
        "diag_1": 250.0,
        "diag_2": 250.0,
        "diag_3": 250.0,
        "number_diagnoses": 1,
        "max_glu_serum": 0,
        "a1cresult": 0,
        "metformin": "No",
        "insulin": "No",
        "diabetesmed": "No",
        "race": "Caucasian"
    })
}

const INT_COLUMNS: &[&str] = &[
    "admission_type_id",
    "discharge_disposition_id",
    "admission_source_id",
    "time_in_hospital",
    "num_lab_procedures",
    "num_procedures",
    "num_medications",
    "number_outpatient",
    "number_emergency",
    "number_inpatient",
    "number_diagnoses",
    "max_glu_serum",
    "a1cresult",
];

const FLOAT_COLUMNS: &[&str] = &["weight", "diag_1", "diag_2", "diag_3"];

/// Write a demo dataset of `n` patients with ids `1000 + i`.
///
/// Ids listed in `missing_ids` are written as nulls.
pub fn write_dataset(path: &Path, n: usize, missing_ids: &[usize]) {
    let ids: Int64Array = (0..n)
        .map(|i| (!missing_ids.contains(&i)).then_some(1000 + i as i64))
        .collect();
    let ages: Int64Array = (0..n).map(|i| Some(18 + (i as i64 * 7) % 80)).collect();

    let mut fields = vec![
        Field::new("patient_nbr", DataType::Int64, true),
        Field::new("age", DataType::Int64, false),
    ];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(ids), Arc::new(ages)];

    for (k, name) in INT_COLUMNS.iter().enumerate() {
        let values: Int64Array = (0..n).map(|i| Some(1 + ((i + k) % 5) as i64)).collect();
        fields.push(Field::new(*name, DataType::Int64, false));
        columns.push(Arc::new(values));
    }
    for (k, name) in FLOAT_COLUMNS.iter().enumerate() {
        let values: Float64Array = (0..n)
            .map(|i| Some(60.0 + ((i * 13 + k * 31) % 120) as f64))
            .collect();
        fields.push(Field::new(*name, DataType::Float64, false));
        columns.push(Arc::new(values));
    }

    let text = |choices: &[&str]| -> ArrayRef {
        let values: StringArray = (0..n)
            .map(|i| Some(choices[i % choices.len()]))
            .collect();
        Arc::new(values)
    };
    for (name, choices) in [
        ("gender", &["Male", "Female"][..]),
        ("race", &["Caucasian", "AfricanAmerican", "Hispanic", "Other"][..]),
        ("metformin", &["No", "Steady", "Up"][..]),
        ("insulin", &["No", "Steady", "Down", "Up"][..]),
        ("diabetesmed", &["Yes", "No"][..]),
    ] {
        fields.push(Field::new(name, DataType::Utf8, false));
        columns.push(text(choices));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(Arc::clone(&schema), columns).expect("record batch");

    let file = File::create(path).expect("create parquet file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("parquet writer");
    writer.write(&batch).expect("write batch");
    writer.close().expect("close writer");
}

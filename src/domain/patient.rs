//! Patient record types for readmission risk scoring.
//!
//! A [`PatientRecord`] is only ever built through [`PatientRecord::validate`],
//! so holding one means every field already satisfied its declared constraint.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::features::{FeatureValue, NamedFeatures};

/// Gender of the patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const ALLOWED: &'static [&'static str] = &["Male", "Female", "Other"];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Other => "Other",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "Male" => Some(Self::Male),
            "Female" => Some(Self::Female),
            "Other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Race of the patient. Absent values default to [`Race::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Race {
    AfricanAmerican,
    Caucasian,
    #[default]
    Other,
    Asian,
    Hispanic,
}

impl Race {
    pub const ALLOWED: &'static [&'static str] =
        &["AfricanAmerican", "Caucasian", "Other", "Asian", "Hispanic"];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AfricanAmerican => "AfricanAmerican",
            Self::Caucasian => "Caucasian",
            Self::Other => "Other",
            Self::Asian => "Asian",
            Self::Hispanic => "Hispanic",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "AfricanAmerican" => Some(Self::AfricanAmerican),
            "Caucasian" => Some(Self::Caucasian),
            "Other" => Some(Self::Other),
            "Asian" => Some(Self::Asian),
            "Hispanic" => Some(Self::Hispanic),
            _ => None,
        }
    }
}

/// Clinical and administrative features of one hospital encounter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientRecord {
    /// Age in years, 0-120
    pub age: i64,
    pub gender: Gender,
    /// Weight in kg, 30-200
    pub weight: f64,
    pub admission_type_id: i64,
    pub discharge_disposition_id: i64,
    pub admission_source_id: i64,
    /// Days spent in hospital, 1-30
    pub time_in_hospital: i64,
    pub num_lab_procedures: i64,
    pub num_procedures: i64,
    pub num_medications: i64,
    pub number_outpatient: i64,
    pub number_emergency: i64,
    pub number_inpatient: i64,
    /// Primary diagnosis code (ICD-9, numeric part)
    pub diag_1: f64,
    pub diag_2: f64,
    pub diag_3: f64,
    pub number_diagnoses: i64,
    pub max_glu_serum: i64,
    pub a1cresult: i64,
    pub metformin: String,
    pub insulin: String,
    pub diabetesmed: String,
    pub race: Race,
}

/// Field names in declaration order.
pub const FIELD_NAMES: [&str; 23] = [
    "age",
    "gender",
    "weight",
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
    "diag_1",
    "diag_2",
    "diag_3",
    "number_diagnoses",
    "max_glu_serum",
    "a1cresult",
    "metformin",
    "insulin",
    "diabetesmed",
    "race",
];

/// The rule a field value broke.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Required field absent (or null)
    Missing,
    /// Value could not be read as the declared type
    Type(&'static str),
    /// Value below the inclusive minimum
    Min(f64),
    /// Value above the inclusive maximum
    Max(f64),
    /// Value outside the enumeration
    OneOf(&'static [&'static str]),
    /// NaN or infinite number
    Finite,
}

impl Constraint {
    /// Short machine-readable code for API error bodies.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Type(_) => "type",
            Self::Min(_) => "ge",
            Self::Max(_) => "le",
            Self::OneOf(_) => "enum",
            Self::Finite => "finite",
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "field required"),
            Self::Type(expected) => write!(f, "expected {expected}"),
            Self::Min(min) => write!(f, "must be >= {min}"),
            Self::Max(max) => write!(f, "must be <= {max}"),
            Self::OneOf(allowed) => write!(f, "must be one of {}", allowed.join(", ")),
            Self::Finite => write!(f, "must be a finite number"),
        }
    }
}

/// One offending field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub constraint: Constraint,
    /// Offending input rendered as JSON, when there was one
    pub got: Option<String>,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.got {
            Some(got) => write!(f, "{}: {} (got {})", self.field, self.constraint, got),
            None => write!(f, "{}: {}", self.field, self.constraint),
        }
    }
}

/// Rejection of a raw patient payload. Lists every offending field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid patient record: {}", describe(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    /// Whether the given field is among the violations.
    #[must_use]
    pub fn cites(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    /// The violation recorded for a field, if any.
    #[must_use]
    pub fn violation(&self, field: &str) -> Option<&FieldViolation> {
        self.violations.iter().find(|v| v.field == field)
    }

    fn not_an_object(got: &Value) -> Self {
        Self {
            violations: vec![FieldViolation {
                field: "body",
                constraint: Constraint::Type("JSON object"),
                got: Some(type_name(got).to_string()),
            }],
        }
    }
}

fn describe(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reads typed fields out of a JSON object, collecting violations as it goes.
///
/// Accessors return a placeholder on failure so the caller can keep reading;
/// the record must not be built before [`FieldReader::finish`] succeeds.
struct FieldReader<'a> {
    raw: &'a Map<String, Value>,
    violations: Vec<FieldViolation>,
}

impl<'a> FieldReader<'a> {
    fn new(raw: &'a Map<String, Value>) -> Self {
        Self {
            raw,
            violations: Vec::new(),
        }
    }

    fn reject(&mut self, field: &'static str, constraint: Constraint, got: Option<&Value>) {
        self.violations.push(FieldViolation {
            field,
            constraint,
            got: got.map(Value::to_string),
        });
    }

    fn present(&mut self, field: &'static str) -> Option<&'a Value> {
        let raw: &'a Map<String, Value> = self.raw;
        match raw.get(field) {
            None | Some(Value::Null) => {
                self.reject(field, Constraint::Missing, None);
                None
            }
            Some(v) => Some(v),
        }
    }

    fn int(&mut self, field: &'static str, min: Option<i64>, max: Option<i64>) -> i64 {
        let Some(value) = self.present(field) else {
            return 0;
        };
        let Some(n) = coerce_int(value) else {
            self.reject(field, Constraint::Type("an integer"), Some(value));
            return 0;
        };
        if let Some(min) = min.filter(|&m| n < m) {
            self.reject(field, Constraint::Min(min as f64), Some(value));
        } else if let Some(max) = max.filter(|&m| n > m) {
            self.reject(field, Constraint::Max(max as f64), Some(value));
        }
        n
    }

    fn float(&mut self, field: &'static str, min: Option<f64>, max: Option<f64>) -> f64 {
        let Some(value) = self.present(field) else {
            return 0.0;
        };
        let Some(x) = coerce_float(value) else {
            self.reject(field, Constraint::Type("a number"), Some(value));
            return 0.0;
        };
        if !x.is_finite() {
            self.reject(field, Constraint::Finite, Some(value));
        } else if let Some(min) = min.filter(|&m| x < m) {
            self.reject(field, Constraint::Min(min), Some(value));
        } else if let Some(max) = max.filter(|&m| x > m) {
            self.reject(field, Constraint::Max(max), Some(value));
        }
        x
    }

    fn text(&mut self, field: &'static str) -> String {
        let Some(value) = self.present(field) else {
            return String::new();
        };
        match value {
            Value::String(s) => s.clone(),
            other => {
                self.reject(field, Constraint::Type("a string"), Some(other));
                String::new()
            }
        }
    }

    fn choice<T>(
        &mut self,
        field: &'static str,
        allowed: &'static [&'static str],
        parse: fn(&str) -> Option<T>,
        default: Option<T>,
    ) -> Option<T> {
        let raw: &'a Map<String, Value> = self.raw;
        let value = match (raw.get(field), default) {
            (None | Some(Value::Null), Some(d)) => return Some(d),
            _ => self.present(field)?,
        };
        match value.as_str().and_then(parse) {
            Some(v) => Some(v),
            None => {
                self.reject(field, Constraint::OneOf(allowed), Some(value));
                None
            }
        }
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                violations: self.violations,
            })
        }
    }
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|x| x.fract() == 0.0 && x.abs() < i64::MAX as f64)
                .map(|x| x as i64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|x| x.is_finite() && x.fract() == 0.0 && x.abs() < i64::MAX as f64)
                    .map(|x| x as i64)
            })
        }
        _ => None,
    }
}

fn coerce_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

impl PatientRecord {
    /// Validate a raw JSON payload against the patient schema.
    ///
    /// Unknown fields are ignored. Every violation is reported, not just the
    /// first one.
    ///
    /// # Errors
    /// Returns [`ValidationError`] naming each offending field.
    pub fn validate(raw: &Value) -> Result<Self, ValidationError> {
        let Value::Object(obj) = raw else {
            return Err(ValidationError::not_an_object(raw));
        };
        Self::validate_map(obj)
    }

    /// Validate an already-parsed JSON object.
    ///
    /// # Errors
    /// Returns [`ValidationError`] naming each offending field.
    pub fn validate_map(obj: &Map<String, Value>) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(obj);

        let age = r.int("age", Some(0), Some(120));
        let gender = r.choice("gender", Gender::ALLOWED, Gender::parse, None);
        let weight = r.float("weight", Some(30.0), Some(200.0));
        let admission_type_id = r.int("admission_type_id", Some(1), None);
        let discharge_disposition_id = r.int("discharge_disposition_id", Some(1), None);
        let admission_source_id = r.int("admission_source_id", Some(1), None);
        let time_in_hospital = r.int("time_in_hospital", Some(1), Some(30));
        let num_lab_procedures = r.int("num_lab_procedures", Some(0), None);
        let num_procedures = r.int("num_procedures", Some(0), None);
        let num_medications = r.int("num_medications", Some(0), None);
        let number_outpatient = r.int("number_outpatient", Some(0), None);
        let number_emergency = r.int("number_emergency", Some(0), None);
        let number_inpatient = r.int("number_inpatient", Some(0), None);
        let diag_1 = r.float("diag_1", None, None);
        let diag_2 = r.float("diag_2", None, None);
        let diag_3 = r.float("diag_3", None, None);
        let number_diagnoses = r.int("number_diagnoses", Some(1), None);
        let max_glu_serum = r.int("max_glu_serum", Some(0), None);
        let a1cresult = r.int("a1cresult", Some(0), None);
        let metformin = r.text("metformin");
        let insulin = r.text("insulin");
        let diabetesmed = r.text("diabetesmed");
        let race = r.choice("race", Race::ALLOWED, Race::parse, Some(Race::Other));

        r.finish()?;

        Ok(Self {
            age,
            // finish() succeeded, so both enumerations were read
            gender: gender.unwrap_or(Gender::Other),
            weight,
            admission_type_id,
            discharge_disposition_id,
            admission_source_id,
            time_in_hospital,
            num_lab_procedures,
            num_procedures,
            num_medications,
            number_outpatient,
            number_emergency,
            number_inpatient,
            diag_1,
            diag_2,
            diag_3,
            number_diagnoses,
            max_glu_serum,
            a1cresult,
            metformin,
            insulin,
            diabetesmed,
            race: race.unwrap_or_default(),
        })
    }

    /// Serialize back to the raw JSON form accepted by [`PatientRecord::validate`].
    #[must_use]
    pub fn to_raw(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Named model inputs: numeric fields as numbers, enumerations and
    /// indicator strings as categories.
    #[must_use]
    pub fn features(&self) -> NamedFeatures {
        let n = |x: i64| FeatureValue::Number(x as f64);
        let c = |s: &str| FeatureValue::Category(s.to_string());

        let mut out = BTreeMap::new();
        out.insert("age".to_string(), n(self.age));
        out.insert("gender".to_string(), c(self.gender.as_str()));
        out.insert("weight".to_string(), FeatureValue::Number(self.weight));
        out.insert("admission_type_id".to_string(), n(self.admission_type_id));
        out.insert(
            "discharge_disposition_id".to_string(),
            n(self.discharge_disposition_id),
        );
        out.insert("admission_source_id".to_string(), n(self.admission_source_id));
        out.insert("time_in_hospital".to_string(), n(self.time_in_hospital));
        out.insert("num_lab_procedures".to_string(), n(self.num_lab_procedures));
        out.insert("num_procedures".to_string(), n(self.num_procedures));
        out.insert("num_medications".to_string(), n(self.num_medications));
        out.insert("number_outpatient".to_string(), n(self.number_outpatient));
        out.insert("number_emergency".to_string(), n(self.number_emergency));
        out.insert("number_inpatient".to_string(), n(self.number_inpatient));
        out.insert("diag_1".to_string(), FeatureValue::Number(self.diag_1));
        out.insert("diag_2".to_string(), FeatureValue::Number(self.diag_2));
        out.insert("diag_3".to_string(), FeatureValue::Number(self.diag_3));
        out.insert("number_diagnoses".to_string(), n(self.number_diagnoses));
        out.insert("max_glu_serum".to_string(), n(self.max_glu_serum));
        out.insert("a1cresult".to_string(), n(self.a1cresult));
        out.insert("metformin".to_string(), c(&self.metformin));
        out.insert("insulin".to_string(), c(&self.insulin));
        out.insert("diabetesmed".to_string(), c(&self.diabetesmed));
        out.insert("race".to_string(), c(self.race.as_str()));
        out
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// Reference encounter used across the test suite.
    pub(crate) fn reference_payload() -> Value {
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

    fn with(field: &str, value: Value) -> Value {
        let mut payload = reference_payload();
        payload[field] = value;
        payload
    }

    fn without(field: &str) -> Value {
        let mut payload = reference_payload();
        payload.as_object_mut().map(|o| o.remove(field));
        payload
    }

    #[test]
    fn test_reference_payload_is_valid() {
        let record = PatientRecord::validate(&reference_payload()).expect("Should validate");
        assert_eq!(record.age, 45);
        assert_eq!(record.gender, Gender::Male);
        assert_eq!(record.race, Race::Caucasian);
        assert!((record.weight - 70.0).abs() < f64::EPSILON);
        assert_eq!(record.metformin, "No");
    }

    #[test]
    fn test_age_above_max() {
        let err = PatientRecord::validate(&with("age", json!(150))).expect_err("age 150");
        assert_eq!(err.violations.len(), 1);
        let v = err.violation("age").expect("age cited");
        assert_eq!(v.constraint, Constraint::Max(120.0));
        assert!(err.to_string().contains("age"));
    }

    #[test]
    fn test_gender_not_in_enumeration() {
        let err = PatientRecord::validate(&with("gender", json!("Unknown"))).expect_err("gender");
        let v = err.violation("gender").expect("gender cited");
        assert_eq!(v.constraint, Constraint::OneOf(Gender::ALLOWED));
        assert_eq!(v.constraint.code(), "enum");
    }

    #[test]
    fn test_missing_required_field() {
        for field in FIELD_NAMES.iter().filter(|f| **f != "race") {
            let err = PatientRecord::validate(&without(field))
                .expect_err("missing field must be rejected");
            assert!(err.cites(field), "{field} should be cited");
            assert_eq!(
                err.violation(field).map(|v| &v.constraint),
                Some(&Constraint::Missing)
            );
        }
    }

    #[test]
    fn test_race_defaults_to_other() {
        let record = PatientRecord::validate(&without("race")).expect("race is optional");
        assert_eq!(record.race, Race::Other);

        let record = PatientRecord::validate(&with("race", Value::Null)).expect("null race");
        assert_eq!(record.race, Race::Other);

        let err = PatientRecord::validate(&with("race", json!("Martian"))).expect_err("race");
        assert!(err.cites("race"));
    }

    #[test]
    fn test_range_boundaries_are_inclusive() {
        assert!(PatientRecord::validate(&with("age", json!(0))).is_ok());
        assert!(PatientRecord::validate(&with("age", json!(120))).is_ok());
        assert!(PatientRecord::validate(&with("weight", json!(30))).is_ok());
        assert!(PatientRecord::validate(&with("weight", json!(200.0))).is_ok());
        assert!(PatientRecord::validate(&with("time_in_hospital", json!(30))).is_ok());

        let err = PatientRecord::validate(&with("weight", json!(29.9))).expect_err("weight");
        assert_eq!(err.violations[0].constraint, Constraint::Min(30.0));
        let err = PatientRecord::validate(&with("time_in_hospital", json!(0))).expect_err("tih");
        assert!(err.cites("time_in_hospital"));
        let err = PatientRecord::validate(&with("number_diagnoses", json!(0))).expect_err("nd");
        assert!(err.cites("number_diagnoses"));
        let err = PatientRecord::validate(&with("num_medications", json!(-1))).expect_err("neg");
        assert!(err.cites("num_medications"));
    }

    #[test]
    fn test_valid_siblings_do_not_mask_rejections() {
        let mut payload = with("age", json!(150));
        payload["gender"] = json!("Unknown");
        payload["number_emergency"] = json!(-3);

        let err = PatientRecord::validate(&payload).expect_err("three violations");
        assert_eq!(err.violations.len(), 3);
        assert!(err.cites("age"));
        assert!(err.cites("gender"));
        assert!(err.cites("number_emergency"));
        assert!(!err.cites("weight"));
    }

    #[test]
    fn test_type_coercion() {
        let record = PatientRecord::validate(&with("age", json!("45"))).expect("numeric string");
        assert_eq!(record.age, 45);
        let record = PatientRecord::validate(&with("age", json!(45.0))).expect("integral float");
        assert_eq!(record.age, 45);
        let record = PatientRecord::validate(&with("diag_1", json!("428.5"))).expect("string");
        assert!((record.diag_1 - 428.5).abs() < f64::EPSILON);

        let err = PatientRecord::validate(&with("age", json!(45.5))).expect_err("fraction");
        assert_eq!(err.violations[0].constraint, Constraint::Type("an integer"));
        let err = PatientRecord::validate(&with("age", json!(true))).expect_err("bool");
        assert!(err.cites("age"));
        let err = PatientRecord::validate(&with("metformin", json!(1))).expect_err("text");
        assert!(err.cites("metformin"));
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let record = PatientRecord::validate(&with("encounter_id", json!("abc-123")))
            .expect("extra fields are ignored");
        assert_eq!(record.age, 45);
    }

    #[test]
    fn test_non_object_body_rejected() {
        let err = PatientRecord::validate(&json!([1, 2, 3])).expect_err("array body");
        assert!(err.cites("body"));
    }

    #[test]
    fn test_round_trip_reproduces_values() {
        let payload = reference_payload();
        let record = PatientRecord::validate(&payload).expect("Should validate");
        let raw = record.to_raw();

        for field in FIELD_NAMES {
            let original = &payload[field];
            let back = &raw[field];
            match original {
                Value::Number(n) => assert_eq!(
                    n.as_f64(),
                    back.as_f64(),
                    "{field} changed across round trip"
                ),
                other => assert_eq!(other, back, "{field} changed across round trip"),
            }
        }

        let again = PatientRecord::validate(&raw).expect("round trip re-validates");
        assert_eq!(again, record);
    }

    #[test]
    fn test_features_cover_every_field() {
        let record = PatientRecord::validate(&reference_payload()).expect("Should validate");
        let features = record.features();
        assert_eq!(features.len(), FIELD_NAMES.len());
        assert_eq!(features["age"], FeatureValue::Number(45.0));
        assert_eq!(
            features["gender"],
            FeatureValue::Category("Male".to_string())
        );
    }
}

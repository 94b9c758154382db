//! Domain layer: Core business types and logic.
//!
//! Pure types with no I/O. Everything here is serializable and validated at
//! construction.

mod features;
mod patient;
mod score;

pub use features::{Attribution, FeatureContribution, FeatureValue, NamedFeatures};
pub use patient::{
    Constraint, FieldViolation, Gender, PatientRecord, Race, ValidationError, FIELD_NAMES,
};
pub use score::{RiskClass, ScoreResult, DEFAULT_THRESHOLD};

#[cfg(test)]
pub(crate) use patient::tests::reference_payload;

//! Scorer and explainer ports.
//!
//! These traits abstract the classifier artifact from the application logic
//! so the scoring service can be exercised against stub models.

use crate::domain::{Attribution, FeatureValue, NamedFeatures};

/// Failure of a single inference call. Never corrupts shared state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("Feature count mismatch: got {got}, expected {expected}")]
    FeatureCount { expected: usize, got: usize },

    #[error("Missing model feature: {0}")]
    MissingFeature(String),

    #[error("Feature {feature} is numeric in the model but got category {level:?}")]
    UnexpectedCategory { feature: String, level: String },

    #[error("Feature {0} is not a finite number")]
    NonFinite(String),

    #[error("Model produced an invalid probability: {0}")]
    InvalidProbability(f64),
}

/// A loaded binary classifier.
///
/// Implementations are immutable after construction and shared across
/// threads without locking.
pub trait Scorer: Send + Sync {
    /// Input feature names in the exact order `predict_proba` expects.
    fn feature_names(&self) -> &[String];

    /// Positive-class probability for one ordered input row.
    ///
    /// # Errors
    /// Returns [`InferenceError`] when the row does not fit the model.
    fn predict_proba(&self, row: &[FeatureValue]) -> Result<f64, InferenceError>;

    /// Project named features down to the model's ordered input row.
    ///
    /// Extra names are ignored.
    ///
    /// # Errors
    /// Returns [`InferenceError::MissingFeature`] for the first model feature
    /// absent from `named`.
    fn project(&self, named: &NamedFeatures) -> Result<Vec<FeatureValue>, InferenceError> {
        self.feature_names()
            .iter()
            .map(|name| {
                named
                    .get(name)
                    .cloned()
                    .ok_or_else(|| InferenceError::MissingFeature(name.clone()))
            })
            .collect()
    }
}

/// Per-feature attribution for a single prediction.
pub trait Explainer: Send + Sync {
    /// Explain one ordered input row.
    ///
    /// # Errors
    /// Returns [`InferenceError`] when the row does not fit the model.
    fn explain(&self, row: &[FeatureValue]) -> Result<Attribution, InferenceError>;
}

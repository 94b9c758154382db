//! Scoring service: validated record -> probability, label and runtime.

use std::sync::Arc;
use std::time::Instant;

use crate::domain::{NamedFeatures, PatientRecord, ScoreResult, DEFAULT_THRESHOLD};
use crate::ports::{InferenceError, Scorer};

/// Service wrapping a shared, immutable model handle.
///
/// Cloning is cheap: clones share the same model.
pub struct ScoringService<M: Scorer + ?Sized> {
    model: Arc<M>,
    threshold: f64,
}

impl<M: Scorer + ?Sized> Clone for ScoringService<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            threshold: self.threshold,
        }
    }
}

impl<M: Scorer + ?Sized> ScoringService<M> {
    /// Create a service with the default 0.5 threshold.
    pub fn new(model: Arc<M>) -> Self {
        Self {
            model,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Replace the classification threshold. Must lie in [0, 1].
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        debug_assert!((0.0..=1.0).contains(&threshold));
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    #[must_use]
    pub fn model(&self) -> &Arc<M> {
        &self.model
    }

    /// Score a validated patient record.
    ///
    /// # Errors
    /// Returns [`InferenceError`] if the record does not fit the model or the
    /// model yields an invalid probability.
    pub fn score(&self, record: &PatientRecord) -> Result<ScoreResult, InferenceError> {
        self.score_features(&record.features())
    }

    /// Score an arbitrary name -> value map, e.g. a dataset row with overrides.
    ///
    /// # Errors
    /// Returns [`InferenceError`] on the same conditions as [`Self::score`].
    pub fn score_features(&self, named: &NamedFeatures) -> Result<ScoreResult, InferenceError> {
        let started = Instant::now();

        let row = self.model.project(named)?;
        let probability = self.model.predict_proba(&row)?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(InferenceError::InvalidProbability(probability));
        }

        let result = ScoreResult::new(probability, self.threshold, started.elapsed().as_secs_f64());
        tracing::debug!(
            "Scored record: probability={:.4}, classification={}",
            result.probability,
            result.classification
        );
        Ok(result)
    }
}

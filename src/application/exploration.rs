//! Exploration session: the state machine behind the interactive explorer.
//!
//! Select a sampled patient, optionally override their age, then recompute
//! the score and its attribution. Nothing here knows about the terminal, so
//! every transition is exercised directly in tests.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::application::ScoringService;
use crate::domain::{Attribution, FeatureContribution, FeatureValue, NamedFeatures, ScoreResult};
use crate::ports::{Explainer, InferenceError, PatientId, PatientSource, Scorer};

/// Number of sampled candidate patients.
pub const DEFAULT_SAMPLE_SIZE: usize = 100;

/// Number of contributions shown in the attribution chart.
pub const TOP_CONTRIBUTIONS: usize = 10;

/// Inclusive bounds of the age slider.
pub const AGE_MIN: i64 = 15;
pub const AGE_MAX: i64 = 100;

const AGE_COLUMN: &str = "age";

/// Errors raised by session transitions. None of them end the session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExploreError {
    #[error("Dataset has no patients to sample")]
    EmptyDataset,

    #[error("Patient {0} is not in the sampled set")]
    NotInSample(PatientId),

    #[error("No stored row for patient {0}")]
    MissingRow(PatientId),

    #[error("Stored row for patient {0} has no usable age")]
    MissingAge(PatientId),

    #[error("Age {0} is outside [15, 100]")]
    AgeOutOfRange(i64),

    #[error("No patient selected")]
    NoSelection,

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Everything needed to render one recomputation.
#[derive(Debug, Clone, PartialEq)]
pub struct Insight {
    pub patient_id: PatientId,
    pub age: i64,
    pub score: ScoreResult,
    pub attribution: Attribution,
    /// Model inputs that were scored, age override included
    pub features: NamedFeatures,
}

impl Insight {
    /// The contributions shown in the chart, largest magnitude first.
    #[must_use]
    pub fn top_contributions(&self) -> Vec<&FeatureContribution> {
        self.attribution.top(TOP_CONTRIBUTIONS)
    }
}

#[derive(Debug, Clone, Copy)]
struct Selection {
    id: PatientId,
    age: i64,
}

/// Single-user exploration state.
pub struct ExplorationSession<M, D>
where
    M: Scorer + Explainer + ?Sized,
    D: PatientSource + ?Sized,
{
    scoring: ScoringService<M>,
    dataset: Arc<D>,
    candidates: Vec<PatientId>,
    selection: Option<Selection>,
    show_raw: bool,
}

impl<M, D> ExplorationSession<M, D>
where
    M: Scorer + Explainer + ?Sized,
    D: PatientSource + ?Sized,
{
    /// Sample up to `sample_size` candidate patients without replacement.
    ///
    /// Sampling is seeded from the OS unless `seed` is given.
    ///
    /// # Errors
    /// Returns [`ExploreError::EmptyDataset`] if there is nothing to sample.
    pub fn new(
        scoring: ScoringService<M>,
        dataset: Arc<D>,
        sample_size: usize,
        seed: Option<u64>,
    ) -> Result<Self, ExploreError> {
        let ids = dataset.patient_ids();
        if ids.is_empty() || sample_size == 0 {
            return Err(ExploreError::EmptyDataset);
        }

        let mut rng = match seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        };
        let mut candidates: Vec<PatientId> = ids
            .choose_multiple(&mut rng, sample_size.min(ids.len()))
            .copied()
            .collect();
        candidates.sort_unstable();

        tracing::info!(
            "Exploration session sampled {} of {} patients",
            candidates.len(),
            ids.len()
        );

        Ok(Self {
            scoring,
            dataset,
            candidates,
            selection: None,
            show_raw: false,
        })
    }

    /// Sampled patient identifiers, ascending.
    #[must_use]
    pub fn candidates(&self) -> &[PatientId] {
        &self.candidates
    }

    #[must_use]
    pub fn selected(&self) -> Option<PatientId> {
        self.selection.map(|s| s.id)
    }

    /// Current age override, if a patient is selected.
    #[must_use]
    pub fn age(&self) -> Option<i64> {
        self.selection.map(|s| s.age)
    }

    #[must_use]
    pub fn show_raw(&self) -> bool {
        self.show_raw
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.scoring.threshold()
    }

    /// Select a sampled patient and reset the age override to their stored
    /// age, clamped to the slider range.
    ///
    /// # Errors
    /// Rejects identifiers outside the sample and rows without an age. The
    /// previous selection is kept on error.
    pub fn select(&mut self, id: PatientId) -> Result<Insight, ExploreError> {
        if self.candidates.binary_search(&id).is_err() {
            return Err(ExploreError::NotInSample(id));
        }
        let row = self.dataset.row(id).ok_or(ExploreError::MissingRow(id))?;
        let stored = row
            .get(AGE_COLUMN)
            .and_then(|cell| cell.as_f64())
            .filter(|age| age.is_finite())
            .ok_or(ExploreError::MissingAge(id))?;
        let age = (stored.round() as i64).clamp(AGE_MIN, AGE_MAX);

        let selection = Selection { id, age };
        let insight = self.compute(selection)?;
        self.selection = Some(selection);
        tracing::debug!("Selected patient {id}");
        Ok(insight)
    }

    /// Override the selected patient's age and recompute.
    ///
    /// # Errors
    /// Rejects ages outside the slider range without changing state.
    pub fn adjust_age(&mut self, age: i64) -> Result<Insight, ExploreError> {
        if !(AGE_MIN..=AGE_MAX).contains(&age) {
            return Err(ExploreError::AgeOutOfRange(age));
        }
        let current = self.selection.ok_or(ExploreError::NoSelection)?;
        let selection = Selection { age, ..current };
        let insight = self.compute(selection)?;
        self.selection = Some(selection);
        Ok(insight)
    }

    /// Move the age override by `delta`, saturating at the slider bounds.
    ///
    /// # Errors
    /// Returns [`ExploreError::NoSelection`] before any patient is selected.
    pub fn step_age(&mut self, delta: i64) -> Result<Insight, ExploreError> {
        let current = self.selection.ok_or(ExploreError::NoSelection)?;
        self.adjust_age(current.age.saturating_add(delta).clamp(AGE_MIN, AGE_MAX))
    }

    pub fn toggle_raw(&mut self) -> bool {
        self.show_raw = !self.show_raw;
        self.show_raw
    }

    /// Recompute score and attribution for the current state.
    ///
    /// # Errors
    /// Returns [`ExploreError::NoSelection`] before any patient is selected.
    pub fn recompute(&self) -> Result<Insight, ExploreError> {
        let selection = self.selection.ok_or(ExploreError::NoSelection)?;
        self.compute(selection)
    }

    fn compute(&self, selection: Selection) -> Result<Insight, ExploreError> {
        let row = self
            .dataset
            .row(selection.id)
            .ok_or(ExploreError::MissingRow(selection.id))?;

        let mut named = row.features();
        named.insert(
            AGE_COLUMN.to_string(),
            FeatureValue::Number(selection.age as f64),
        );

        let model = self.scoring.model();
        let score = self.scoring.score_features(&named)?;
        let ordered = model.project(&named)?;
        let attribution = model.explain(&ordered)?;
        let features: NamedFeatures = model
            .feature_names()
            .iter()
            .cloned()
            .zip(ordered)
            .collect();

        Ok(Insight {
            patient_id: selection.id,
            age: selection.age,
            score,
            attribution,
            features,
        })
    }
}

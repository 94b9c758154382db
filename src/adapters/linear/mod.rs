//! Linear adapter: Implementation of Scorer and Explainer for the exported
//! logistic model artifact.
//!
//! The artifact is a JSON document produced by the training pipeline:
//! per-feature coefficients over standardized inputs, an intercept, category
//! encodings for non-numeric features and an optional isotonic calibration
//! curve.
//!
//! # Integrity
//!
//! If a sidecar file `<artifact>.sha256` exists next to the artifact, the
//! artifact's SHA-256 digest must match it or loading fails.
//!
//! # Attribution
//!
//! For a linear model over standardized inputs the exact per-feature
//! attribution in log-odds space is `coef_i * z_i`, with the intercept as the
//! base value (the standardized mean row has zero contribution everywhere).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{Attribution, FeatureContribution, FeatureValue};
use crate::ports::{Explainer, InferenceError, Scorer};

/// Only artifact layout currently understood.
const ARTIFACT_VERSION: u32 = 1;

/// Error type for model loading. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Model artifact not found at {0:?}")]
    NotFound(PathBuf),

    #[error("Failed to read model artifact {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid model artifact format: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Invalid model artifact: {0}")]
    Invalid(String),

    #[error("Model artifact digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },
}

/// Isotonic calibration curve mapping raw to calibrated probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Raw probability breakpoints, strictly increasing
    pub x: Vec<f64>,
    /// Calibrated probability at each breakpoint, non-decreasing in [0, 1]
    pub y: Vec<f64>,
}

impl Calibration {
    /// Piecewise-linear interpolation, flat outside the breakpoints.
    #[must_use]
    pub fn apply(&self, p: f64) -> f64 {
        let last = self.x.len() - 1;
        if p <= self.x[0] {
            return self.y[0];
        }
        if p >= self.x[last] {
            return self.y[last];
        }
        // x[i - 1] <= p < x[i]
        let i = self.x.partition_point(|&x| x <= p);
        let (x0, x1) = (self.x[i - 1], self.x[i]);
        let (y0, y1) = (self.y[i - 1], self.y[i]);
        y0 + (y1 - y0) * (p - x0) / (x1 - x0)
    }

    fn check(&self) -> Result<(), LoadError> {
        if self.x.len() < 2 || self.x.len() != self.y.len() {
            return Err(LoadError::Invalid(format!(
                "calibration needs at least 2 matching points, got x={} y={}",
                self.x.len(),
                self.y.len()
            )));
        }
        if self.x.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(LoadError::Invalid(
                "calibration x must be strictly increasing".into(),
            ));
        }
        if self.y.iter().any(|y| !(0.0..=1.0).contains(y)) {
            return Err(LoadError::Invalid("calibration y must lie in [0, 1]".into()));
        }
        if self.y.windows(2).any(|w| w[0] > w[1]) {
            return Err(LoadError::Invalid(
                "calibration y must be non-decreasing".into(),
            ));
        }
        Ok(())
    }
}

/// Model parameters exported by the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: u32,
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub scaler_mean: Vec<f64>,
    pub scaler_std: Vec<f64>,
    /// Encoding of categorical levels, per feature name
    #[serde(default)]
    pub categories: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default)]
    pub calibration: Option<Calibration>,
}

impl ModelArtifact {
    fn check(&self) -> Result<(), LoadError> {
        if self.version != ARTIFACT_VERSION {
            return Err(LoadError::Invalid(format!(
                "unsupported artifact version {} (expected {ARTIFACT_VERSION})",
                self.version
            )));
        }

        let n = self.feature_names.len();
        if n == 0 {
            return Err(LoadError::Invalid("artifact declares no features".into()));
        }
        if self.coefficients.len() != n || self.scaler_mean.len() != n || self.scaler_std.len() != n
        {
            return Err(LoadError::Invalid(
                "parameter lengths do not match feature_names length".into(),
            ));
        }

        let mut seen = std::collections::BTreeSet::new();
        for name in &self.feature_names {
            if !seen.insert(name.as_str()) {
                return Err(LoadError::Invalid(format!("duplicate feature {name}")));
            }
        }

        let all_finite = self.intercept.is_finite()
            && self
                .coefficients
                .iter()
                .chain(&self.scaler_mean)
                .all(|x| x.is_finite());
        if !all_finite {
            return Err(LoadError::Invalid("non-finite model parameter".into()));
        }
        if let Some(i) = self.scaler_std.iter().position(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(LoadError::Invalid(format!(
                "scaler_std for {} must be finite and > 0",
                self.feature_names[i]
            )));
        }

        for feature in self.categories.keys() {
            if !seen.contains(feature.as_str()) {
                return Err(LoadError::Invalid(format!(
                    "categories given for unknown feature {feature}"
                )));
            }
        }

        if let Some(calibration) = &self.calibration {
            calibration.check()?;
        }
        Ok(())
    }
}

/// Loaded logistic model. Immutable once built.
#[derive(Debug, Clone)]
pub struct LinearModel {
    artifact: ModelArtifact,
}

impl LinearModel {
    /// Load and check an artifact from disk.
    ///
    /// # Errors
    /// Returns [`LoadError`] if the file is missing, unreadable, fails its
    /// digest check or is not a valid artifact.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }

        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        verify_digest(path, &bytes)?;

        let artifact: ModelArtifact = serde_json::from_slice(&bytes)?;
        let model = Self::from_artifact(artifact)?;

        tracing::info!(
            "Loaded model from {:?} (n_features={}, calibrated={})",
            path,
            model.artifact.feature_names.len(),
            model.artifact.calibration.is_some()
        );
        Ok(model)
    }

    /// Build a model from in-memory parameters.
    ///
    /// # Errors
    /// Returns [`LoadError::Invalid`] if the parameters are inconsistent.
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, LoadError> {
        artifact.check()?;
        Ok(Self { artifact })
    }

    /// Numeric encoding of one input value for feature `i`.
    fn encode(&self, i: usize, value: &FeatureValue) -> Result<f64, InferenceError> {
        let name = &self.artifact.feature_names[i];
        match value {
            FeatureValue::Number(x) if x.is_finite() => Ok(*x),
            FeatureValue::Number(_) => Err(InferenceError::NonFinite(name.clone())),
            FeatureValue::Category(level) => match self.artifact.categories.get(name) {
                // Unseen levels sit at the mean: zero contribution.
                Some(table) => Ok(table
                    .get(level)
                    .copied()
                    .unwrap_or(self.artifact.scaler_mean[i])),
                None => level
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|x| x.is_finite())
                    .ok_or_else(|| InferenceError::UnexpectedCategory {
                        feature: name.clone(),
                        level: level.clone(),
                    }),
            },
        }
    }

    /// Per-feature log-odds terms `coef_i * z_i`.
    fn terms(&self, row: &[FeatureValue]) -> Result<Vec<f64>, InferenceError> {
        let a = &self.artifact;
        let n = a.feature_names.len();
        if row.len() != n {
            return Err(InferenceError::FeatureCount {
                expected: n,
                got: row.len(),
            });
        }

        row.iter()
            .enumerate()
            .map(|(i, value)| {
                let x = self.encode(i, value)?;
                let z = (x - a.scaler_mean[i]) / a.scaler_std[i];
                Ok(a.coefficients[i] * z)
            })
            .collect()
    }

    /// Raw model output (log-odds) for one row.
    ///
    /// # Errors
    /// Returns [`InferenceError`] when the row does not fit the model.
    pub fn logit(&self, row: &[FeatureValue]) -> Result<f64, InferenceError> {
        Ok(self.artifact.intercept + self.terms(row)?.iter().sum::<f64>())
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Check the artifact against `<path>.sha256` when that file exists.
fn verify_digest(path: &Path, bytes: &[u8]) -> Result<(), LoadError> {
    let mut sidecar = path.as_os_str().to_owned();
    sidecar.push(".sha256");
    let sidecar = PathBuf::from(sidecar);
    if !sidecar.exists() {
        tracing::debug!("No digest file at {:?}, skipping integrity check", sidecar);
        return Ok(());
    }

    let content = std::fs::read_to_string(&sidecar).map_err(|source| LoadError::Io {
        path: sidecar.clone(),
        source,
    })?;
    // Accept `sha256sum` output: "<hex>  <filename>"
    let expected = content
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let actual = sha256_hex(bytes);
    if expected != actual {
        return Err(LoadError::DigestMismatch { expected, actual });
    }

    tracing::info!("Model artifact digest verified");
    Ok(())
}

impl Scorer for LinearModel {
    fn feature_names(&self) -> &[String] {
        &self.artifact.feature_names
    }

    fn predict_proba(&self, row: &[FeatureValue]) -> Result<f64, InferenceError> {
        let raw = sigmoid(self.logit(row)?);
        let p = match &self.artifact.calibration {
            Some(calibration) => calibration.apply(raw).clamp(0.0, 1.0),
            None => raw,
        };
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(InferenceError::InvalidProbability(p));
        }
        Ok(p)
    }
}

impl Explainer for LinearModel {
    fn explain(&self, row: &[FeatureValue]) -> Result<Attribution, InferenceError> {
        let terms = self.terms(row)?;
        let contributions = self
            .artifact
            .feature_names
            .iter()
            .zip(row)
            .zip(terms)
            .map(|((name, value), contribution)| FeatureContribution {
                name: name.clone(),
                value: value.clone(),
                contribution,
            })
            .collect();

        Ok(Attribution {
            base_value: self.artifact.intercept,
            contributions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{reference_payload, PatientRecord};
    use tempfile::tempdir;

    fn two_feature_artifact() -> ModelArtifact {
        let mut gender = BTreeMap::new();
        gender.insert("Male".to_string(), 0.0);
        gender.insert("Female".to_string(), 1.0);
        let mut categories = BTreeMap::new();
        categories.insert("gender".to_string(), gender);

        ModelArtifact {
            version: 1,
            feature_names: vec!["age".into(), "gender".into()],
            coefficients: vec![1.0, -0.5],
            intercept: -0.2,
            scaler_mean: vec![50.0, 0.5],
            scaler_std: vec![10.0, 0.5],
            categories,
            calibration: None,
        }
    }

    fn row(age: f64, gender: &str) -> Vec<FeatureValue> {
        vec![
            FeatureValue::Number(age),
            FeatureValue::Category(gender.to_string()),
        ]
    }

    #[test]
    fn test_predict_matches_logistic_formula() {
        let model = LinearModel::from_artifact(two_feature_artifact()).expect("valid");
        // z_age = 1.0, z_gender = (0 - 0.5) / 0.5 = -1.0
        let expected_logit = -0.2 + 1.0 * 1.0 + (-0.5) * (-1.0);
        let p = model.predict_proba(&row(60.0, "Male")).expect("predict");
        assert!((p - sigmoid(expected_logit)).abs() < 1e-12);
    }

    #[test]
    fn test_attribution_sums_to_logit() {
        let model = LinearModel::from_artifact(two_feature_artifact()).expect("valid");
        let r = row(72.0, "Female");
        let attribution = model.explain(&r).expect("explain");
        let logit = model.logit(&r).expect("logit");

        assert_eq!(attribution.contributions.len(), 2);
        assert!((attribution.output() - logit).abs() < 1e-12);
        assert_eq!(attribution.contributions[0].name, "age");
        assert!((attribution.contributions[0].contribution - 2.2).abs() < 1e-12);
    }

    #[test]
    fn test_unseen_category_is_neutral() {
        let model = LinearModel::from_artifact(two_feature_artifact()).expect("valid");
        let attribution = model.explain(&row(50.0, "Other")).expect("explain");
        assert!(attribution.contributions[1].contribution.abs() < 1e-12);
    }

    #[test]
    fn test_category_for_numeric_feature_rejected() {
        let model = LinearModel::from_artifact(two_feature_artifact()).expect("valid");
        let r = vec![
            FeatureValue::Category("old".into()),
            FeatureValue::Category("Male".into()),
        ];
        let err = model.predict_proba(&r).expect_err("category for age");
        assert!(matches!(err, InferenceError::UnexpectedCategory { .. }));

        // Numeric text is read as a number.
        let r = vec![
            FeatureValue::Category("60".into()),
            FeatureValue::Category("Male".into()),
        ];
        assert!(model.predict_proba(&r).is_ok());
    }

    #[test]
    fn test_shape_mismatch_is_inference_error() {
        let model = LinearModel::from_artifact(two_feature_artifact()).expect("valid");
        let err = model
            .predict_proba(&[FeatureValue::Number(1.0)])
            .expect_err("short row");
        assert_eq!(
            err,
            InferenceError::FeatureCount {
                expected: 2,
                got: 1
            }
        );

        let err = model
            .predict_proba(&row(f64::NAN, "Male"))
            .expect_err("nan input");
        assert_eq!(err, InferenceError::NonFinite("age".into()));
    }

    #[test]
    fn test_calibration_interpolates_and_clamps() {
        let calibration = Calibration {
            x: vec![0.0, 0.5, 1.0],
            y: vec![0.0, 0.2, 1.0],
        };
        assert!((calibration.apply(0.25) - 0.1).abs() < 1e-12);
        assert!((calibration.apply(0.75) - 0.6).abs() < 1e-12);
        assert_eq!(calibration.apply(-1.0), 0.0);
        assert_eq!(calibration.apply(2.0), 1.0);
        assert!((calibration.apply(0.5) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_artifacts_rejected() {
        let mut a = two_feature_artifact();
        a.coefficients.pop();
        assert!(matches!(
            LinearModel::from_artifact(a),
            Err(LoadError::Invalid(_))
        ));

        let mut a = two_feature_artifact();
        a.scaler_std[0] = 0.0;
        assert!(LinearModel::from_artifact(a).is_err());

        let mut a = two_feature_artifact();
        a.version = 2;
        assert!(LinearModel::from_artifact(a).is_err());

        let mut a = two_feature_artifact();
        a.calibration = Some(Calibration {
            x: vec![0.0, 0.0],
            y: vec![0.0, 1.0],
        });
        assert!(LinearModel::from_artifact(a).is_err());

        let mut a = two_feature_artifact();
        a.categories.insert("height".into(), BTreeMap::new());
        assert!(LinearModel::from_artifact(a).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let temp = tempdir().expect("tempdir");
        let err = LinearModel::load(&temp.path().join("nope.json")).expect_err("missing");
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn test_load_garbage_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("model.json");
        std::fs::write(&path, b"\x00\x01 not json").expect("write");
        let err = LinearModel::load(&path).expect_err("garbage");
        assert!(matches!(err, LoadError::Format(_)));
    }

    #[test]
    fn test_load_verifies_digest_sidecar() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("model.json");
        let bytes = serde_json::to_vec(&two_feature_artifact()).expect("serialize");
        std::fs::write(&path, &bytes).expect("write model");

        let sidecar = temp.path().join("model.json.sha256");
        std::fs::write(&sidecar, format!("{}  model.json\n", sha256_hex(&bytes)))
            .expect("write digest");
        assert!(LinearModel::load(&path).is_ok());

        std::fs::write(&sidecar, "00".repeat(32)).expect("write bad digest");
        let err = LinearModel::load(&path).expect_err("digest mismatch");
        assert!(matches!(err, LoadError::DigestMismatch { .. }));
    }

    #[test]
    fn test_shipped_model_scores_reference_patient() {
        let model = LinearModel::load(Path::new("models/scoring_model.json"))
            .expect("shipped model should load");
        let record = PatientRecord::validate(&reference_payload()).expect("valid");
        let r = model.project(&record.features()).expect("project");

        let p1 = model.predict_proba(&r).expect("predict");
        let p2 = model.predict_proba(&r).expect("predict");
        assert!((0.0..=1.0).contains(&p1));
        assert_eq!(p1.to_bits(), p2.to_bits());
    }
}

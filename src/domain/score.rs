//! Score result types.
//!
//! Represents the output of one scoring operation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default decision threshold on the positive-class probability.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Binary risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskClass {
    #[serde(rename = "High Risk")]
    High,
    #[serde(rename = "Low Risk")]
    Low,
}

impl RiskClass {
    /// Classify a probability. Strictly greater than the threshold is high risk,
    /// so a probability equal to the threshold is low risk.
    #[must_use]
    pub fn from_probability(probability: f64, threshold: f64) -> Self {
        if probability > threshold {
            Self::High
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High Risk",
            Self::Low => "Low Risk",
        }
    }

    /// Associated color for display (RGB).
    #[must_use]
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Self::Low => (16, 185, 129), // Emerald (#10B981)
            Self::High => (244, 63, 94), // Rose (#F43F5E)
        }
    }
}

impl fmt::Display for RiskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of scoring one patient record.
///
/// Serialized field names match the public API: `Score`, `classification`,
/// `runtime`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Positive-class probability (0.0 to 1.0)
    #[serde(rename = "Score")]
    pub probability: f64,

    pub classification: RiskClass,

    /// Wall-clock scoring time in seconds, rounded to 2 decimals
    pub runtime: f64,
}

impl ScoreResult {
    /// Build a result, deriving the classification from the threshold.
    #[must_use]
    pub fn new(probability: f64, threshold: f64, elapsed_secs: f64) -> Self {
        Self {
            probability,
            classification: RiskClass::from_probability(probability, threshold),
            runtime: round2(elapsed_secs),
        }
    }

    /// Probability as a percentage rounded to 2 decimals, e.g. `37.12`.
    #[must_use]
    pub fn percent(&self) -> f64 {
        round2(self.probability * 100.0)
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundary_is_low_risk() {
        assert_eq!(RiskClass::from_probability(0.5, 0.5), RiskClass::Low);
        assert_eq!(RiskClass::from_probability(0.500_001, 0.5), RiskClass::High);
        assert_eq!(RiskClass::from_probability(0.0, 0.5), RiskClass::Low);
        assert_eq!(RiskClass::from_probability(1.0, 0.5), RiskClass::High);
    }

    #[test]
    fn test_runtime_rounding() {
        let result = ScoreResult::new(0.25, DEFAULT_THRESHOLD, 0.004_9);
        assert_eq!(result.runtime, 0.0);
        let result = ScoreResult::new(0.25, DEFAULT_THRESHOLD, 1.236);
        assert!((result.runtime - 1.24).abs() < 1e-12);
        assert!((result.percent() - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_serialized_shape() {
        let result = ScoreResult::new(0.75, DEFAULT_THRESHOLD, 0.0);
        let json = serde_json::to_value(result).expect("serialize");
        assert_eq!(json["Score"], 0.75);
        assert_eq!(json["classification"], "High Risk");
        assert_eq!(json["runtime"], 0.0);
    }
}

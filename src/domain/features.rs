//! Model input values and per-feature attributions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single model input: either numeric or a categorical level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Category(String),
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(x) if x.fract() == 0.0 && x.abs() < 1e15 => write!(f, "{}", *x as i64),
            Self::Number(x) => write!(f, "{x}"),
            Self::Category(s) => write!(f, "{s}"),
        }
    }
}

/// Feature values keyed by name, before projection to the model's order.
pub type NamedFeatures = BTreeMap<String, FeatureValue>;

/// Contribution of one feature to a single prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureContribution {
    pub name: String,
    pub value: FeatureValue,
    /// Signed contribution in log-odds; positive pushes toward high risk
    pub contribution: f64,
}

/// Explanation of one prediction.
///
/// `base_value` plus the sum of all contributions equals the model's raw
/// log-odds output for the explained row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribution {
    pub base_value: f64,
    pub contributions: Vec<FeatureContribution>,
}

impl Attribution {
    /// Raw model output reconstructed from the attribution.
    #[must_use]
    pub fn output(&self) -> f64 {
        self.base_value + self.contributions.iter().map(|c| c.contribution).sum::<f64>()
    }

    /// The `n` largest contributions by magnitude, largest first.
    ///
    /// Ties keep model feature order.
    #[must_use]
    pub fn top(&self, n: usize) -> Vec<&FeatureContribution> {
        let mut ranked: Vec<&FeatureContribution> = self.contributions.iter().collect();
        ranked.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));
        ranked.truncate(n);
        ranked
    }

    /// Combined contribution of everything outside the top `n`.
    #[must_use]
    pub fn remainder(&self, n: usize) -> f64 {
        let top: f64 = self.top(n).iter().map(|c| c.contribution).sum();
        self.output() - self.base_value - top
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contribution(name: &str, contribution: f64) -> FeatureContribution {
        FeatureContribution {
            name: name.to_string(),
            value: FeatureValue::Number(0.0),
            contribution,
        }
    }

    #[test]
    fn test_top_ranks_by_magnitude() {
        let attribution = Attribution {
            base_value: -1.0,
            contributions: vec![
                contribution("a", 0.1),
                contribution("b", -0.9),
                contribution("c", 0.5),
                contribution("d", 0.0),
            ],
        };

        let top: Vec<&str> = attribution.top(2).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(top, vec!["b", "c"]);
        assert_eq!(attribution.top(10).len(), 4);
        assert!((attribution.output() - (-1.3)).abs() < 1e-12);
        assert!((attribution.remainder(2) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_display_integral_numbers() {
        assert_eq!(FeatureValue::Number(45.0).to_string(), "45");
        assert_eq!(FeatureValue::Number(428.5).to_string(), "428.5");
        assert_eq!(FeatureValue::Category("No".into()).to_string(), "No");
    }
}

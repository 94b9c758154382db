//! Dataset port: read-only access to stored patient rows.

use std::collections::BTreeMap;

use crate::domain::{FeatureValue, NamedFeatures};

/// Identifier of a patient in the demo dataset.
pub type PatientId = i64;

/// One typed cell of a stored row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl Cell {
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(x) => Some(*x),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Null => None,
        }
    }

    /// Model input for this cell. Nulls have no value.
    #[must_use]
    pub fn to_feature(&self) -> Option<FeatureValue> {
        match self {
            Self::Int(i) => Some(FeatureValue::Number(*i as f64)),
            Self::Float(x) => Some(FeatureValue::Number(*x)),
            Self::Text(s) => Some(FeatureValue::Category(s.clone())),
            Self::Null => None,
        }
    }
}

/// A stored row: column name to cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetRow {
    pub cells: BTreeMap<String, Cell>,
}

impl DatasetRow {
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells.get(column)
    }

    /// Every non-null cell as a named model input.
    #[must_use]
    pub fn features(&self) -> NamedFeatures {
        self.cells
            .iter()
            .filter_map(|(name, cell)| cell.to_feature().map(|v| (name.clone(), v)))
            .collect()
    }
}

/// Read-only source of patient rows.
///
/// All data is loaded up front; lookups never touch the filesystem.
pub trait PatientSource: Send + Sync {
    /// Every patient identifier, in storage order.
    fn patient_ids(&self) -> Vec<PatientId>;

    /// Stored row for a patient.
    fn row(&self, id: PatientId) -> Option<&DatasetRow>;

    /// Number of stored patients.
    fn len(&self) -> usize {
        self.patient_ids().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

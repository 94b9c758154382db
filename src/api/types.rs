use serde::{Deserialize, Serialize};

use crate::domain::{FieldViolation, ValidationError};

// ============================================================================
// Error bodies
// ============================================================================

/// One entry of a 4xx `detail` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub field: String,
    pub constraint: String,
    pub message: String,
}

impl From<&FieldViolation> for ErrorDetail {
    fn from(v: &FieldViolation) -> Self {
        Self {
            field: v.field.to_string(),
            constraint: v.constraint.code().to_string(),
            message: v.to_string(),
        }
    }
}

/// Body of a 400 or 422 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub detail: Vec<ErrorDetail>,
}

impl From<&ValidationError> for ValidationResponse {
    fn from(err: &ValidationError) -> Self {
        Self {
            detail: err.violations.iter().map(ErrorDetail::from).collect(),
        }
    }
}

/// Body of a 500 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerErrorResponse {
    pub detail: String,
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: i64,
    pub model_features: usize,
    pub threshold: f64,
}

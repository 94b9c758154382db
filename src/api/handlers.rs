use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::api::{
    state::AppState,
    types::{ErrorDetail, HealthResponse, ServerErrorResponse, ValidationResponse},
};
use crate::domain::PatientRecord;

/// POST /check_patient/ -- validate, score and time one patient record
pub async fn check_patient(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let raw = match payload {
        Ok(Json(raw)) => raw,
        Err(rejection) => {
            tracing::debug!("Rejected unreadable body: {}", rejection.body_text());
            let body = ValidationResponse {
                detail: vec![ErrorDetail {
                    field: "body".to_string(),
                    constraint: "json".to_string(),
                    message: rejection.body_text(),
                }],
            };
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };

    let record = match PatientRecord::validate(&raw) {
        Ok(record) => record,
        Err(err) => {
            let status = if raw.is_object() {
                StatusCode::UNPROCESSABLE_ENTITY
            } else {
                StatusCode::BAD_REQUEST
            };
            tracing::info!(
                "Rejected patient record with {} violation(s)",
                err.violations.len()
            );
            return (status, Json(ValidationResponse::from(&err))).into_response();
        }
    };

    match state.scoring.score(&record) {
        Ok(result) => {
            tracing::info!(
                "Scored patient record: classification={}, runtime={}s",
                result.classification,
                result.runtime
            );
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(err) => {
            tracing::error!("Inference failed: {}", err);
            let body = ServerErrorResponse {
                detail: err.to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// GET /health -- liveness probe with a model summary
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_seconds: state.uptime_seconds(),
        model_features: state.scoring.model().feature_names().len(),
        threshold: state.scoring.threshold(),
    })
}

use chrono::{DateTime, Utc};

use crate::application::ScoringService;
use crate::ports::Scorer;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    /// Scoring service over the process-wide model
    pub scoring: ScoringService<dyn Scorer>,

    /// Application start time
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(scoring: ScoringService<dyn Scorer>) -> Self {
        Self {
            scoring,
            start_time: Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.start_time).num_seconds()
    }
}

//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases of the application.

mod exploration;
mod scoring;

pub use exploration::{
    ExplorationSession, ExploreError, Insight, AGE_MAX, AGE_MIN, DEFAULT_SAMPLE_SIZE,
    TOP_CONTRIBUTIONS,
};
pub use scoring::ScoringService;

#[cfg(test)]
pub(crate) use scoring::tests::FixedScorer;

//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and the classifier artifact and demo dataset.

mod dataset;
mod scorer;

pub use dataset::{Cell, DatasetRow, PatientId, PatientSource};
pub use scorer::{Explainer, InferenceError, Scorer};

//! # Readmit
//!
//! Patient readmission risk scoring with feature attribution.
//!
//! This crate provides:
//! - A validated `POST /check_patient/` scoring endpoint
//! - A terminal explorer over sampled patients from a demo dataset
//! - Exact per-feature attribution for the shipped logistic model
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core business types (PatientRecord, ScoreResult, Attribution)
//! - `ports`: Trait definitions for the classifier and the dataset
//! - `adapters`: Concrete implementations (JSON model, Parquet, log sanitizing)
//! - `application`: Use cases orchestrating domain and ports
//! - `api`: HTTP front end
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use domain::{PatientRecord, RiskClass, ScoreResult};

/// Result type for Readmit operations
pub type Result<T> = std::result::Result<T, ReadmitError>;

/// Main error type for Readmit
#[derive(Debug, thiserror::Error)]
pub enum ReadmitError {
    #[error("Model could not be loaded: {0}")]
    Load(#[from] adapters::LoadError),

    #[error("Dataset could not be loaded: {0}")]
    Dataset(#[from] adapters::DatasetError),

    #[error("Invalid patient data: {0}")]
    Validation(#[from] domain::ValidationError),

    #[error("Inference failed: {0}")]
    Inference(#[from] ports::InferenceError),

    #[error("Exploration failed: {0}")]
    Explore(#[from] application::ExploreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

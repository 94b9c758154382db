//! TUI module: Terminal User Interface using Ratatui.
//!
//! One screen for exploring sampled patients from the demo dataset:
//! - Patient list
//! - Live readmission probability and age slider
//! - Attribution chart with an optional raw-feature panel

mod app;
mod styles;
mod ui;

pub use app::{App, Session};
pub use styles::MedicalTheme;

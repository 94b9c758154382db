//! Command-line configuration. Every option falls back to a `READMIT_*`
//! environment variable.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::adapters::DEFAULT_ID_COLUMN;
use crate::application::DEFAULT_SAMPLE_SIZE;
use crate::domain::DEFAULT_THRESHOLD;

#[derive(Debug, Parser)]
#[command(name = "readmit")]
#[command(version)]
#[command(about = "Patient readmission risk scoring service and explorer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the scoring API over HTTP
    Serve(ServeArgs),

    /// Explore sampled patients from the demo dataset in the terminal
    Explore(ExploreArgs),
}

/// Options shared by both front ends.
#[derive(Debug, Clone, Args)]
pub struct ModelArgs {
    /// Path to the JSON model artifact
    #[arg(long, env = "READMIT_MODEL_PATH", default_value = "models/scoring_model.json")]
    pub model: PathBuf,

    /// Probability above which a patient is classified as high risk
    #[arg(long, env = "READMIT_THRESHOLD", default_value_t = DEFAULT_THRESHOLD, value_parser = parse_threshold)]
    pub threshold: f64,
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Address to bind
    #[arg(long, env = "READMIT_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to bind
    #[arg(short, long, env = "READMIT_PORT", default_value_t = 8000)]
    pub port: u16,
}

impl ServeArgs {
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Debug, Clone, Args)]
pub struct ExploreArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Path to the Parquet demo dataset
    #[arg(long, env = "READMIT_DATASET_PATH", default_value = "data/diabetes.parquet")]
    pub dataset: PathBuf,

    /// Identifier column of the dataset
    #[arg(long, env = "READMIT_ID_COLUMN", default_value = DEFAULT_ID_COLUMN)]
    pub id_column: String,

    /// Number of candidate patients to sample
    #[arg(long, env = "READMIT_SAMPLE_SIZE", default_value_t = DEFAULT_SAMPLE_SIZE as u64, value_parser = clap::value_parser!(u64).range(1..))]
    pub sample_size: u64,

    /// Seed for reproducible sampling; random when absent
    #[arg(long, env = "READMIT_SEED")]
    pub seed: Option<u64>,
}

fn parse_threshold(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("{raw:?} is not a number"))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("threshold must lie in [0, 1], got {value}"));
    }
    Ok(value)
}

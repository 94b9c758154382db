//! Readmit: patient readmission risk scoring.
//!
//! Main entry point: `readmit serve` runs the HTTP API, `readmit explore`
//! runs the terminal explorer.

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use readmit::adapters::sanitize::SanitizingMakeWriter;
use readmit::adapters::{LinearModel, ParquetDataset};
use readmit::api::{self, AppState};
use readmit::application::{ExplorationSession, ScoringService};
use readmit::config::{Cli, Command, ExploreArgs, ModelArgs, ServeArgs};
use readmit::ports::Scorer;
use readmit::tui::{App, Session};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Writing logs to the terminal corrupts the explorer's alternate screen.
    // Default behavior:
    // - explorer on an interactive TTY: log to a file
    // - otherwise: log to stdout
    let log_mode = std::env::var("READMIT_LOG_MODE").unwrap_or_else(|_| "auto".to_string());
    let exploring = matches!(cli.command, Command::Explore(_));
    let use_file = match log_mode.as_str() {
        "file" => true,
        "stdout" => false,
        // auto
        _ => exploring && std::io::stdout().is_terminal(),
    };

    let (writer, _guard) = if use_file {
        let log_file =
            std::env::var("READMIT_LOG_FILE").unwrap_or_else(|_| "readmit.log".to_string());

        if let Some(parent) = Path::new(&log_file).parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("Failed to open log file {log_file}"))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    match cli.command {
        Command::Serve(args) => serve(args),
        Command::Explore(args) => explore(args),
    }
}

fn load_model(args: &ModelArgs) -> readmit::Result<LinearModel> {
    let model = LinearModel::load(&args.model)?;
    tracing::info!("Classification threshold: {}", args.threshold);
    Ok(model)
}

fn build_session(args: &ExploreArgs) -> readmit::Result<Session> {
    let model = load_model(&args.model)?;
    let dataset = ParquetDataset::load(&args.dataset, &args.id_column)?;
    let scoring = ScoringService::new(Arc::new(model)).with_threshold(args.model.threshold);

    let sample_size = usize::try_from(args.sample_size).unwrap_or(usize::MAX);
    let session = ExplorationSession::new(scoring, Arc::new(dataset), sample_size, args.seed)?;
    Ok(session)
}

fn serve(args: ServeArgs) -> Result<()> {
    tracing::info!("Starting Readmit API...");

    let model: Arc<dyn Scorer> = Arc::new(
        load_model(&args.model)
            .with_context(|| format!("Failed to load model from {:?}", args.model.model))?,
    );
    let state = AppState::new(ScoringService::new(model).with_threshold(args.model.threshold));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime
        .block_on(api::serve(state, args.addr()))
        .with_context(|| format!("API server on {} failed", args.addr()))?;

    tracing::info!("Readmit API shutdown complete.");
    Ok(())
}

fn explore(args: ExploreArgs) -> Result<()> {
    tracing::info!("Starting Readmit explorer...");

    let session = build_session(&args).context("Failed to prepare exploration session")?;
    let mut app = App::new(session);
    app.run()?;

    tracing::info!("Readmit explorer shutdown complete.");
    Ok(())
}

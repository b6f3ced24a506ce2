//! scanlayer - batch OCR and searchable PDF assembly.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

use scanlayer::ocr::tesseract_engine;
use scanlayer::{
    default_config_path, load_config, run_assembly, run_ocr, AssemblyPipelineConfig, Config,
    ConfigError, OcrPipelineConfig, RunSummary,
};

/// Exit status after an operator interrupt.
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser)]
#[command(name = "scanlayer")]
#[command(about = "Batch OCR and searchable PDF assembly for scanned image collections")]
#[command(version)]
struct Cli {
    /// Config file (defaults to <config dir>/scanlayer/config.json)
    #[arg(short, long, global = true, env = "SCANLAYER_CONFIG")]
    config: Option<PathBuf>,

    /// Override the worker count from the config
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    /// Print every error record after the summary
    #[arg(long, global = true)]
    list_errors: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize every image that has no OCR result yet
    Ocr,

    /// Build searchable PDFs from page images and OCR results
    Assemble,

    /// OCR, then assemble
    Run,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "scanlayer=debug"
    } else {
        "scanlayer=info"
    };
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(fmt::layer());

    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        // Worker and pool code logs through `log`.
        let _ = tracing_log::LogTracer::init();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> scanlayer::Result<ExitCode> {
    let config_path = cli
        .config
        .or_else(default_config_path)
        .ok_or_else(|| ConfigError::Validation {
            message: "no config file given and no platform config directory".to_string(),
        })?;
    info!("Using config {}", config_path.display());
    let config = load_config(&config_path)?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        if let Err(e) = ctrlc::set_handler(move || {
            warn!("Interrupt received, finishing in-flight units...");
            cancel.store(true, Ordering::SeqCst);
        }) {
            warn!("Failed to install interrupt handler: {}", e);
        }
    }

    let mut summaries = Vec::new();
    match cli.command {
        Commands::Ocr => summaries.push(ocr_stage(&config, cli.workers, &cancel)?),
        Commands::Assemble => summaries.push(assembly_stage(&config, cli.workers, &cancel)?),
        Commands::Run => {
            let ocr = ocr_stage(&config, cli.workers, &cancel)?;
            let cancelled = ocr.cancelled;
            summaries.push(ocr);
            if !cancelled {
                summaries.push(assembly_stage(&config, cli.workers, &cancel)?);
            }
        }
    }

    for summary in &summaries {
        summary.log();
        if cli.list_errors {
            print_errors(summary);
        }
    }

    if summaries.iter().any(|s| s.cancelled) {
        Ok(ExitCode::from(EXIT_CANCELLED))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn ocr_stage(
    config: &Config,
    workers: Option<usize>,
    cancel: &Arc<AtomicBool>,
) -> scanlayer::Result<RunSummary> {
    let mut pipeline = OcrPipelineConfig::from_config(config)?;
    if let Some(workers) = workers {
        pipeline.settings.workers = workers.max(1);
    }
    run_ocr(&pipeline, tesseract_engine, cancel)
}

fn assembly_stage(
    config: &Config,
    workers: Option<usize>,
    cancel: &Arc<AtomicBool>,
) -> scanlayer::Result<RunSummary> {
    let mut pipeline = AssemblyPipelineConfig::from_config(config)?;
    if let Some(workers) = workers {
        pipeline.settings.workers = workers.max(1);
    }
    run_assembly(&pipeline, cancel)
}

fn print_errors(summary: &RunSummary) {
    if summary.errors.is_empty() {
        return;
    }
    println!("{} errors ({}):", summary.stage, summary.errors.len());
    for record in &summary.errors {
        println!(
            "  {} [{}] {}: {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.kind,
            record.unit,
            record.reason
        );
    }
}

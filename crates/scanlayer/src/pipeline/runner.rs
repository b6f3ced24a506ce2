use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};
use tracing::info_span;

use super::config::{AssemblyPipelineConfig, OcrPipelineConfig, RunSettings};
use super::error::{ErrorLog, ErrorRecord};
use super::progress::{format_duration, CompletionEvent, ProgressTracker, TrackerOptions};
use crate::assembly::AssemblyContextFactory;
use crate::discovery::{Discovered, DocumentScanner, ImageScanner};
use crate::error::Result;
use crate::ocr::{EngineFactory, OcrContextFactory};
use crate::worker::context::{ContextFactory, WorkerContext};
use crate::worker::pool::{PoolOptions, WorkerPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ocr,
    Assembly,
}

impl Stage {
    pub fn noun(self) -> &'static str {
        match self {
            Stage::Ocr => "images",
            Stage::Assembly => "documents",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Ocr => write!(f, "ocr"),
            Stage::Assembly => write!(f, "assembly"),
        }
    }
}

/// Totals for one stage run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stage: Stage,
    pub discovered: usize,
    /// Excluded at discovery because output already existed.
    pub skipped: usize,
    pub processed: usize,
    pub failed: usize,
    /// Pages placed (assembly) or images recognized (OCR).
    pub pages: usize,
    pub errors: Vec<ErrorRecord>,
    pub elapsed: Duration,
    pub cancelled: bool,
    pub error_log: Option<PathBuf>,
}

impl RunSummary {
    fn empty(stage: Stage, skipped: usize, elapsed: Duration) -> Self {
        Self {
            stage,
            discovered: 0,
            skipped,
            processed: 0,
            failed: 0,
            pages: 0,
            errors: Vec::new(),
            elapsed,
            cancelled: false,
            error_log: None,
        }
    }

    pub fn seconds_per_unit(&self) -> Option<f64> {
        (self.processed > 0).then(|| self.elapsed.as_secs_f64() / self.processed as f64)
    }

    pub fn pages_per_second(&self) -> Option<f64> {
        let seconds = self.elapsed.as_secs_f64();
        (self.pages > 0 && seconds > 0.0).then(|| self.pages as f64 / seconds)
    }

    pub fn log(&self) {
        info!(
            "{} run {}: {} processed, {} failed, {} skipped in {}",
            self.stage,
            if self.cancelled { "cancelled" } else { "finished" },
            self.processed,
            self.failed,
            self.skipped,
            format_duration(self.elapsed)
        );
        if let Some(average) = self.seconds_per_unit() {
            info!("Average: {:.3} s per {}", average, self.stage.noun().trim_end_matches('s'));
        }
        if let Some(rate) = self.pages_per_second() {
            info!("Throughput: {:.2} pages/s", rate);
        }
        info!("Total errors: {}", self.errors.len());
        if let Some(path) = &self.error_log {
            if !self.errors.is_empty() {
                info!("Error log: {}", path.display());
            }
        }
    }
}

/// Recognizes every image under the image root that has no result yet.
pub fn run_ocr<F: EngineFactory>(
    config: &OcrPipelineConfig,
    engines: F,
    cancel: &Arc<AtomicBool>,
) -> Result<RunSummary> {
    let _span = info_span!("pipeline", stage = "ocr").entered();
    let started = Instant::now();

    let discovered =
        ImageScanner::new(&config.image_root, &config.output_root, &config.error_root).scan()?;
    let factory = OcrContextFactory::new(engines, config.profile.clone());

    execute(
        Stage::Ocr,
        discovered,
        factory,
        &config.settings,
        &config.error_root,
        cancel,
        started,
    )
}

/// Builds a searchable PDF for every document that has none yet.
pub fn run_assembly(
    config: &AssemblyPipelineConfig,
    cancel: &Arc<AtomicBool>,
) -> Result<RunSummary> {
    let _span = info_span!("pipeline", stage = "assembly").entered();
    let started = Instant::now();

    let discovered = DocumentScanner::new(&config.ocr_root, &config.image_root, &config.output_root)
        .with_enhanced_output(config.options.save_enhanced)
        .scan()?;
    let factory = AssemblyContextFactory::new(config.options.clone());

    execute(
        Stage::Assembly,
        discovered,
        factory,
        &config.settings,
        &config.options.error_root,
        cancel,
        started,
    )
}

fn execute<F: ContextFactory>(
    stage: Stage,
    discovered: Discovered<<F::Context as WorkerContext>::Unit>,
    factory: F,
    settings: &RunSettings,
    error_root: &Path,
    cancel: &Arc<AtomicBool>,
    started: Instant,
) -> Result<RunSummary> {
    let total = discovered.len();
    if total == 0 {
        info!("Nothing to do: all {} {} already processed", discovered.skipped, stage.noun());
        return Ok(RunSummary::empty(stage, discovered.skipped, started.elapsed()));
    }
    if discovered.total_pages > 0 {
        info!("{} {} with {} pages queued", total, stage.noun(), discovered.total_pages);
    }

    let pool = WorkerPool::start(
        Arc::new(factory),
        PoolOptions {
            worker_count: settings.workers.min(total),
            release_every: settings.release_every,
        },
    )?;

    let mut error_log = match ErrorLog::open_in(error_root) {
        Ok(log) => Some(log),
        Err(e) => {
            warn!("Error records will not be persisted: {}", e);
            None
        }
    };

    let tracker = ProgressTracker::spawn(
        total,
        TrackerOptions {
            report_every: settings.report_every,
            noun: stage.noun().to_string(),
        },
    );
    let events = tracker.sender();
    let mut errors = Vec::new();

    let result = pool.run(discovered.units, cancel, |outcome| {
        if let Some(log) = error_log.as_mut() {
            for record in &outcome.errors {
                log.append(record);
            }
        }
        let _ = events.send(CompletionEvent::from(&outcome));
        errors.extend(outcome.errors);
    });

    drop(events);
    let state = tracker.finish(total);
    let report = result?;

    Ok(RunSummary {
        stage,
        discovered: total,
        skipped: discovered.skipped + state.skipped,
        processed: state.processed,
        failed: state.failed,
        pages: state.pages,
        errors,
        elapsed: started.elapsed(),
        cancelled: report.cancelled,
        error_log: error_log.map(|log| log.path().to_path_buf()),
    })
}

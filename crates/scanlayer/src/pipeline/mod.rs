pub mod config;
pub mod error;
pub mod progress;
pub mod runner;

pub use config::{AssemblyPipelineConfig, OcrPipelineConfig, RunSettings};
pub use error::{ErrorLog, ErrorRecord};
pub use progress::{CompletionEvent, Eta, ProgressState, ProgressTracker, TrackerOptions};
pub use runner::{run_assembly, run_ocr, RunSummary, Stage};

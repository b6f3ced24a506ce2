use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub workers: WorkersConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub ocr: Option<OcrConfig>,
    #[serde(default)]
    pub assembly: Option<AssemblyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersConfig {
    /// Explicit worker count. `None` derives it from available parallelism.
    #[serde(default)]
    pub count: Option<usize>,
    /// Cores left free when deriving the worker count.
    #[serde(default = "default_reserved")]
    pub reserved: usize,
}

fn default_reserved() -> usize {
    2
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            count: None,
            reserved: default_reserved(),
        }
    }
}

impl WorkersConfig {
    pub fn resolved_count(&self) -> usize {
        match self.count {
            Some(count) => count.max(1),
            None => num_cpus::get().saturating_sub(self.reserved).max(1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Emit a status line every N completions.
    #[serde(default = "default_report_every")]
    pub report_every: usize,
    /// Broadcast a cache-release directive every N completions.
    #[serde(default = "default_release_every")]
    pub release_every: usize,
}

fn default_report_every() -> usize {
    10
}

fn default_release_every() -> usize {
    100
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            report_every: default_report_every(),
            release_every: default_release_every(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    pub image_root: String,
    pub output_root: String,
    pub error_root: String,
    /// Path to the engine profile (YAML). Built-in defaults when absent.
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub force_cpu: bool,
    /// Overrides the profile's batch size when set.
    #[serde(default)]
    pub batch_size: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyConfig {
    pub ocr_root: String,
    pub image_root: String,
    pub output_root: String,
    /// Defaults to `<output_root>/errors`.
    #[serde(default)]
    pub error_root: Option<String>,
    #[serde(default = "default_y_offset")]
    pub y_offset: f64,
    #[serde(default)]
    pub enhance: bool,
    #[serde(default)]
    pub save_enhanced: bool,
    #[serde(default = "default_true")]
    pub quarantine: bool,
}

fn default_y_offset() -> f64 {
    30.0
}

fn default_true() -> bool {
    true
}

impl AssemblyConfig {
    pub fn error_root(&self) -> PathBuf {
        match &self.error_root {
            Some(root) => PathBuf::from(root),
            None => PathBuf::from(&self.output_root).join("errors"),
        }
    }
}

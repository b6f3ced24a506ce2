//! Declarative OCR engine profile.
//!
//! Loaded once per run and handed to every worker, which builds its own
//! engine instance from it. Stored as YAML:
//!
//! ```yaml
//! pipeline: tesseract
//! device: gpu:0
//! batch_size: 64
//! languages: [chi_sim, eng]
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Compute placement for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Device {
    Cpu,
    Gpu(u32),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Gpu(id) => write!(f, "gpu:{}", id),
        }
    }
}

impl From<Device> for String {
    fn from(device: Device) -> Self {
        device.to_string()
    }
}

impl TryFrom<String> for Device {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let lower = value.trim().to_lowercase();
        if lower == "cpu" {
            return Ok(Device::Cpu);
        }
        if lower == "gpu" {
            return Ok(Device::Gpu(0));
        }
        if let Some(id) = lower.strip_prefix("gpu:") {
            return id
                .parse::<u32>()
                .map(Device::Gpu)
                .map_err(|_| format!("invalid gpu id in device '{}'", value));
        }
        Err(format!("unknown device '{}'", value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineProfile {
    /// Engine pipeline name, e.g. `tesseract`.
    #[serde(default = "default_pipeline")]
    pub pipeline: String,
    #[serde(default = "default_device")]
    pub device: Device,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    /// Engine model/data directory. Engine default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<String>,
}

fn default_pipeline() -> String {
    "tesseract".to_string()
}

fn default_device() -> Device {
    Device::Cpu
}

fn default_batch_size() -> usize {
    64
}

fn default_languages() -> Vec<String> {
    vec!["chi_sim".to_string(), "eng".to_string()]
}

impl Default for EngineProfile {
    fn default() -> Self {
        Self {
            pipeline: default_pipeline(),
            device: default_device(),
            batch_size: default_batch_size(),
            languages: default_languages(),
            data_path: None,
        }
    }
}

impl EngineProfile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let profile: EngineProfile = serde_yaml::from_str(content)?;
        if profile.batch_size == 0 {
            return Err(ConfigError::Validation {
                message: "profile batch_size must be greater than 0".to_string(),
            });
        }
        Ok(profile)
    }

    /// Rewrites the profile for CPU placement.
    pub fn for_cpu(mut self) -> Self {
        self.device = Device::Cpu;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Language selector in the `eng+deu` form.
    pub fn language_string(&self) -> String {
        if self.languages.is_empty() {
            "eng".to_string()
        } else {
            self.languages.join("+")
        }
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

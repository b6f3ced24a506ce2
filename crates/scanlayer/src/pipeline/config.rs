use std::path::PathBuf;

use crate::assembly::AssemblyOptions;
use crate::config::{Config, EngineProfile};
use crate::error::ConfigError;

/// Settings shared by both stages.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub workers: usize,
    pub report_every: usize,
    pub release_every: usize,
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            workers: config.workers.resolved_count(),
            report_every: config.progress.report_every,
            release_every: config.progress.release_every,
        }
    }
}

pub struct OcrPipelineConfig {
    pub image_root: PathBuf,
    pub output_root: PathBuf,
    pub error_root: PathBuf,
    pub profile: EngineProfile,
    pub settings: RunSettings,
}

impl OcrPipelineConfig {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let ocr = config.ocr.as_ref().ok_or(ConfigError::MissingSection("ocr"))?;

        let mut profile = match &ocr.profile {
            Some(path) => EngineProfile::load(path)?,
            None => EngineProfile::default(),
        };
        if ocr.force_cpu {
            profile = profile.for_cpu();
        }
        if let Some(batch_size) = ocr.batch_size {
            profile = profile.with_batch_size(batch_size);
        }

        Ok(Self {
            image_root: PathBuf::from(&ocr.image_root),
            output_root: PathBuf::from(&ocr.output_root),
            error_root: PathBuf::from(&ocr.error_root),
            profile,
            settings: RunSettings::from_config(config),
        })
    }
}

pub struct AssemblyPipelineConfig {
    pub ocr_root: PathBuf,
    pub image_root: PathBuf,
    pub output_root: PathBuf,
    pub options: AssemblyOptions,
    pub settings: RunSettings,
}

impl AssemblyPipelineConfig {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let assembly = config
            .assembly
            .as_ref()
            .ok_or(ConfigError::MissingSection("assembly"))?;

        Ok(Self {
            ocr_root: PathBuf::from(&assembly.ocr_root),
            image_root: PathBuf::from(&assembly.image_root),
            output_root: PathBuf::from(&assembly.output_root),
            options: AssemblyOptions {
                y_offset: assembly.y_offset,
                enhance: assembly.enhance,
                save_enhanced: assembly.save_enhanced,
                quarantine: assembly.quarantine,
                error_root: assembly.error_root(),
            },
            settings: RunSettings::from_config(config),
        })
    }
}

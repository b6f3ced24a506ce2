use std::path::{Path, PathBuf};

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

/// `<config_dir>/scanlayer/config.json`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("scanlayer").join("config.json"))
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.workers.count == Some(0) {
        return Err(ConfigError::Validation {
            message: "workers.count must be greater than 0".to_string(),
        });
    }

    if config.progress.report_every == 0 || config.progress.release_every == 0 {
        return Err(ConfigError::Validation {
            message: "progress cadences must be greater than 0".to_string(),
        });
    }

    if let Some(ocr) = &config.ocr {
        if ocr.batch_size == Some(0) {
            return Err(ConfigError::Validation {
                message: "ocr.batch_size must be greater than 0".to_string(),
            });
        }
    }

    if let Some(assembly) = &config.assembly {
        if assembly.save_enhanced && !assembly.enhance {
            return Err(ConfigError::Validation {
                message: "assembly.save_enhanced requires assembly.enhance".to_string(),
            });
        }
    }

    Ok(())
}

//! Builder for writing config files programmatically.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};

/// Builds the JSON text of a config file. Only options that were set are
/// written, so loader defaults stay in effect for the rest.
pub struct ConfigBuilder {
    workers: Option<usize>,
    report_every: Option<usize>,
    ocr: Option<Map<String, Value>>,
    assembly: Option<Map<String, Value>>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            workers: None,
            report_every: None,
            ocr: None,
            assembly: None,
        }
    }

    pub fn workers(mut self, count: usize) -> Self {
        self.workers = Some(count);
        self
    }

    pub fn report_every(mut self, every: usize) -> Self {
        self.report_every = Some(every);
        self
    }

    pub fn ocr(mut self, image_root: &Path, output_root: &Path, error_root: &Path) -> Self {
        let mut section = Map::new();
        section.insert("image_root".into(), path_value(image_root));
        section.insert("output_root".into(), path_value(output_root));
        section.insert("error_root".into(), path_value(error_root));
        self.ocr = Some(section);
        self
    }

    pub fn ocr_profile(mut self, profile: &Path) -> Self {
        if let Some(section) = self.ocr.as_mut() {
            section.insert("profile".into(), path_value(profile));
        }
        self
    }

    pub fn force_cpu(mut self) -> Self {
        if let Some(section) = self.ocr.as_mut() {
            section.insert("force_cpu".into(), Value::Bool(true));
        }
        self
    }

    pub fn assembly(mut self, ocr_root: &Path, image_root: &Path, output_root: &Path) -> Self {
        let mut section = Map::new();
        section.insert("ocr_root".into(), path_value(ocr_root));
        section.insert("image_root".into(), path_value(image_root));
        section.insert("output_root".into(), path_value(output_root));
        self.assembly = Some(section);
        self
    }

    pub fn assembly_option(mut self, key: &str, value: Value) -> Self {
        if let Some(section) = self.assembly.as_mut() {
            section.insert(key.to_string(), value);
        }
        self
    }

    pub fn build(self) -> String {
        let mut root = Map::new();
        root.insert("version".into(), json!("1.0"));
        if let Some(count) = self.workers {
            root.insert("workers".into(), json!({ "count": count }));
        }
        if let Some(every) = self.report_every {
            root.insert("progress".into(), json!({ "report_every": every }));
        }
        if let Some(ocr) = self.ocr {
            root.insert("ocr".into(), Value::Object(ocr));
        }
        if let Some(assembly) = self.assembly {
            root.insert("assembly".into(), Value::Object(assembly));
        }
        serde_json::to_string_pretty(&Value::Object(root)).expect("Failed to serialize config")
    }

    /// Writes the config to `<dir>/config.json` and returns its path.
    pub fn write_to(self, dir: &Path) -> PathBuf {
        let path = dir.join("config.json");
        std::fs::write(&path, self.build()).expect("Failed to write config");
        path
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn path_value(path: &Path) -> Value {
    Value::String(path.to_string_lossy().to_string())
}

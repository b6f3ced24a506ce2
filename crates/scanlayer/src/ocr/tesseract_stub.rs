//! Placeholder engine when the `tesseract` feature is disabled.

use std::path::Path;

use super::result::PageResult;
use super::OcrEngine;
use crate::config::EngineProfile;
use crate::error::EngineError;

pub const PIPELINE_NAME: &str = "tesseract";

pub struct TesseractEngine;

impl TesseractEngine {
    pub fn new(_profile: &EngineProfile) -> Result<Self, EngineError> {
        Err(EngineError(
            "Tesseract support not compiled in (enable the 'tesseract' feature)".to_string(),
        ))
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&mut self, _image_path: &Path) -> Result<PageResult, EngineError> {
        Err(EngineError("Tesseract support not compiled in".to_string()))
    }
}

pub fn tesseract_engine(
    profile: &EngineProfile,
    _worker_id: usize,
) -> Result<TesseractEngine, String> {
    TesseractEngine::new(profile).map_err(|e| e.to_string())
}

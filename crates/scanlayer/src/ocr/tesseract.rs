//! Tesseract engine via `leptess`.

use std::io::Cursor;
use std::path::Path;

use leptess::LepTess;
use log::{debug, warn};

use super::result::PageResult;
use super::tsv::parse_tsv;
use super::OcrEngine;
use crate::config::{Device, EngineProfile};
use crate::error::EngineError;

pub const PIPELINE_NAME: &str = "tesseract";

pub struct TesseractEngine {
    data_path: Option<String>,
    languages: String,
    inner: LepTess,
}

impl TesseractEngine {
    pub fn new(profile: &EngineProfile) -> Result<Self, EngineError> {
        if profile.pipeline != PIPELINE_NAME {
            return Err(EngineError(format!(
                "unsupported pipeline '{}'",
                profile.pipeline
            )));
        }
        if let Device::Gpu(id) = profile.device {
            debug!("Tesseract runs on CPU; ignoring device gpu:{}", id);
        }

        let languages = profile.language_string();
        let inner = Self::init(profile.data_path.as_deref(), &languages)?;
        Ok(Self {
            data_path: profile.data_path.clone(),
            languages,
            inner,
        })
    }

    fn init(data_path: Option<&str>, languages: &str) -> Result<LepTess, EngineError> {
        LepTess::new(data_path, languages)
            .map_err(|e| EngineError(format!("Failed to initialize Tesseract: {}", e)))
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&mut self, image_path: &Path) -> Result<PageResult, EngineError> {
        let img = image::open(image_path)
            .map_err(|e| EngineError(format!("Failed to load image: {}", e)))?;

        // Leptonica's decoders vary by build; PNG is always available.
        let mut png_data = Vec::new();
        img.write_to(&mut Cursor::new(&mut png_data), image::ImageFormat::Png)
            .map_err(|e| EngineError(format!("Failed to convert image: {}", e)))?;

        self.inner
            .set_image_from_mem(&png_data)
            .map_err(|e| EngineError(format!("Failed to set image for OCR: {}", e)))?;
        let tsv = self
            .inner
            .get_tsv_text(0)
            .map_err(|e| EngineError(format!("OCR failed: {}", e)))?;

        Ok(parse_tsv(&tsv))
    }

    /// Tesseract keeps adaptive state between pages; a fresh instance drops it.
    fn release_cache(&mut self) {
        match Self::init(self.data_path.as_deref(), &self.languages) {
            Ok(fresh) => self.inner = fresh,
            Err(e) => warn!("Keeping current Tesseract instance: {}", e),
        }
    }
}

/// Engine factory for worker contexts.
pub fn tesseract_engine(
    profile: &EngineProfile,
    _worker_id: usize,
) -> Result<TesseractEngine, String> {
    TesseractEngine::new(profile).map_err(|e| e.to_string())
}

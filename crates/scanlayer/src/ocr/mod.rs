//! OCR stage: one image in, one `<base>_result.json` out.
//!
//! The Tesseract engine is compiled with the "tesseract" feature (on by
//! default). Without it a stub engine is provided that fails at worker
//! start-up, so the pool reports an init error instead of running.

pub mod result;
pub mod task;
pub mod tsv;

#[cfg(feature = "tesseract")]
pub mod tesseract;

#[cfg(not(feature = "tesseract"))]
pub mod tesseract_stub;

use std::path::Path;

use crate::config::EngineProfile;
use crate::error::EngineError;

pub use result::{PageResult, Point, Polygon};
pub use task::{OcrContext, OcrContextFactory};

#[cfg(feature = "tesseract")]
pub use tesseract::{tesseract_engine, TesseractEngine};

#[cfg(not(feature = "tesseract"))]
pub use tesseract_stub::{tesseract_engine, TesseractEngine};

/// A text recognizer owned by a single worker.
pub trait OcrEngine {
    fn recognize(&mut self, image_path: &Path) -> Result<PageResult, EngineError>;

    /// Drop internal caches. Called between units, never mid-recognition.
    fn release_cache(&mut self) {}
}

/// Builds one engine per worker from the shared profile.
pub trait EngineFactory: Send + Sync + 'static {
    type Engine: OcrEngine;

    fn create(&self, profile: &EngineProfile, worker_id: usize) -> Result<Self::Engine, String>;
}

impl<F, E> EngineFactory for F
where
    F: Fn(&EngineProfile, usize) -> Result<E, String> + Send + Sync + 'static,
    E: OcrEngine,
{
    type Engine = E;

    fn create(&self, profile: &EngineProfile, worker_id: usize) -> Result<E, String> {
        self(profile, worker_id)
    }
}

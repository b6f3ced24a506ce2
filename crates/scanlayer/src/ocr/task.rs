use std::path::Path;

use log::{debug, warn};
use tracing::info_span;

use super::{EngineFactory, OcrEngine};
use crate::config::EngineProfile;
use crate::error::UnitError;
use crate::sanitize::redact_path;
use crate::storage::{Quarantine, QuarantineMode};
use crate::worker::context::{ContextFactory, WorkerContext};
use crate::worker::job::{OcrUnit, UnitOutcome, WorkUnit};

/// One worker's OCR state: its own engine instance, reused for every image.
pub struct OcrContext<E: OcrEngine> {
    worker_id: usize,
    engine: E,
}

impl<E: OcrEngine> OcrContext<E> {
    pub fn new(worker_id: usize, engine: E) -> Self {
        Self { worker_id, engine }
    }

    fn recognize_and_persist(&mut self, unit: &OcrUnit, result_path: &Path) -> Result<(), UnitError> {
        validate_image(&unit.image_path)?;

        let mut result = self.engine.recognize(&unit.image_path)?;
        result.input_path = Some(unit.image_path.display().to_string());

        result.save(result_path)?;
        debug!(
            "Worker {} wrote {} regions to {}",
            self.worker_id,
            result.len(),
            result_path.display()
        );
        Ok(())
    }
}

/// Full structural decode; header sniffing misses truncated files.
fn validate_image(path: &Path) -> Result<(), UnitError> {
    image::open(path).map(|_| ()).map_err(|e| UnitError::Validation {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

impl<E: OcrEngine> WorkerContext for OcrContext<E> {
    type Unit = OcrUnit;

    fn process(&mut self, unit: &OcrUnit) -> UnitOutcome {
        let _span = info_span!("ocr.unit",
            worker = self.worker_id,
            file = %redact_path(&unit.image_path),
        )
        .entered();

        let unit_id = unit.id();
        let result_path = unit.result_path();

        // Another run may have finished this image since discovery.
        if result_path.exists() {
            debug!("Result appeared since discovery: {}", result_path.display());
            return UnitOutcome::skipped(unit_id);
        }

        match self.recognize_and_persist(unit, &result_path) {
            Ok(()) => UnitOutcome::completed(unit_id, 1),
            Err(e) => {
                warn!("OCR failed for {}: {}", unit_id, e);
                Quarantine::new(&unit.source_root, &unit.error_dir, QuarantineMode::Copy)
                    .isolate(&unit.image_path);
                UnitOutcome::failed(unit_id, &e)
            }
        }
    }

    fn release_cache(&mut self) {
        self.engine.release_cache();
    }
}

/// Builds an [`OcrContext`] per worker from one shared engine profile.
pub struct OcrContextFactory<F: EngineFactory> {
    engines: F,
    profile: EngineProfile,
}

impl<F: EngineFactory> OcrContextFactory<F> {
    pub fn new(engines: F, profile: EngineProfile) -> Self {
        Self { engines, profile }
    }

    pub fn profile(&self) -> &EngineProfile {
        &self.profile
    }
}

impl<F: EngineFactory> ContextFactory for OcrContextFactory<F> {
    type Context = OcrContext<F::Engine>;

    fn build(&self, worker_id: usize) -> Result<Self::Context, String> {
        let engine = self.engines.create(&self.profile, worker_id)?;
        Ok(OcrContext::new(worker_id, engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, ErrorKind};
    use crate::ocr::PageResult;
    use crate::worker::job::UnitStatus;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct FixedEngine {
        fail: bool,
        released: usize,
    }

    impl OcrEngine for FixedEngine {
        fn recognize(&mut self, _image_path: &Path) -> Result<PageResult, EngineError> {
            if self.fail {
                return Err(EngineError("model exploded".to_string()));
            }
            Ok(PageResult::new(
                vec![vec![[1.0, 1.0], [9.0, 1.0], [9.0, 5.0], [1.0, 5.0]]],
                vec!["text".to_string()],
            ))
        }

        fn release_cache(&mut self) {
            self.released += 1;
        }
    }

    struct Tree {
        temp: TempDir,
    }

    impl Tree {
        fn new() -> Self {
            Self {
                temp: TempDir::new().unwrap(),
            }
        }

        fn root(&self, name: &str) -> PathBuf {
            self.temp.path().join(name)
        }

        fn unit(&self, relative: &str) -> OcrUnit {
            let image_path = self.root("images").join(relative);
            let relative_dir = Path::new(relative).parent().unwrap();
            OcrUnit {
                output_dir: self.root("ocr").join(relative_dir),
                error_dir: self.root("errors"),
                source_root: self.root("images"),
                image_path,
            }
        }

        fn write_png(&self, relative: &str) {
            let path = self.root("images").join(relative);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            image::RgbImage::from_pixel(8, 8, image::Rgb([255, 255, 255]))
                .save(&path)
                .unwrap();
        }
    }

    fn context(fail: bool) -> OcrContext<FixedEngine> {
        OcrContext::new(
            0,
            FixedEngine {
                fail,
                released: 0,
            },
        )
    }

    #[test]
    fn test_process_writes_result() {
        let tree = Tree::new();
        tree.write_png("doc/page_0001.png");
        let unit = tree.unit("doc/page_0001.png");

        let outcome = context(false).process(&unit);

        assert_eq!(outcome.status, UnitStatus::Completed);
        let saved = PageResult::load(&unit.result_path()).unwrap();
        assert_eq!(saved.rec_text, vec!["text"]);
        assert_eq!(
            saved.input_path.as_deref(),
            Some(unit.image_path.to_str().unwrap())
        );
    }

    #[test]
    fn test_process_skips_existing_result() {
        let tree = Tree::new();
        tree.write_png("doc/page_0001.png");
        let unit = tree.unit("doc/page_0001.png");
        std::fs::create_dir_all(&unit.output_dir).unwrap();
        std::fs::write(unit.result_path(), "{}").unwrap();

        let outcome = context(true).process(&unit);

        assert_eq!(outcome.status, UnitStatus::Skipped);
        assert_eq!(std::fs::read_to_string(unit.result_path()).unwrap(), "{}");
    }

    #[test]
    fn test_corrupt_image_is_validation_error_and_quarantined() {
        let tree = Tree::new();
        let unit = tree.unit("doc/broken.jpg");
        std::fs::create_dir_all(unit.image_path.parent().unwrap()).unwrap();
        std::fs::write(&unit.image_path, b"\xff\xd8 truncated").unwrap();

        let outcome = context(false).process(&unit);

        assert!(outcome.is_failure());
        assert_eq!(outcome.errors[0].kind, ErrorKind::Validation);
        assert!(tree.root("errors/doc/broken.jpg").exists());
        // Copy mode keeps the original.
        assert!(unit.image_path.exists());
        assert!(!unit.result_path().exists());
    }

    #[test]
    fn test_engine_failure_is_recorded() {
        let tree = Tree::new();
        tree.write_png("doc/page_0001.png");
        let unit = tree.unit("doc/page_0001.png");

        let outcome = context(true).process(&unit);

        assert!(outcome.is_failure());
        assert_eq!(outcome.errors[0].kind, ErrorKind::Engine);
        assert_eq!(outcome.errors[0].unit, "doc/page_0001.png");
        assert!(tree.root("errors/doc/page_0001.png").exists());
    }

    #[test]
    fn test_release_cache_reaches_engine() {
        let mut ctx = context(false);
        ctx.release_cache();
        ctx.release_cache();
        assert_eq!(ctx.engine.released, 2);
    }

    #[test]
    fn test_factory_builds_from_closure() {
        let factory = OcrContextFactory::new(
            |profile: &EngineProfile, _worker_id: usize| {
                if profile.batch_size == 0 {
                    Err("bad profile".to_string())
                } else {
                    Ok(FixedEngine {
                        fail: false,
                        released: 0,
                    })
                }
            },
            EngineProfile::default(),
        );

        assert!(factory.build(3).is_ok());
        assert_eq!(factory.build(3).unwrap().worker_id, 3);
    }
}

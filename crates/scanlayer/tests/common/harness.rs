//! Test harness for isolated pipeline runs.
//!
//! Every harness owns a temp directory with the standard layout:
//! `images/<doc>/<page>`, `ocr/<doc>/<page>_result.json`, `out/` and
//! `errors/`. Page images are generated with the `image` crate.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tempfile::TempDir;

use scanlayer::assembly::AssemblyOptions;
use scanlayer::config::EngineProfile;
use scanlayer::error::EngineError;
use scanlayer::pipeline::{AssemblyPipelineConfig, OcrPipelineConfig, RunSettings};
use scanlayer::{OcrEngine, PageResult};

/// Recognizes one region whose text is the image's file stem. Images whose
/// name contains `fail_on` produce an engine error.
pub struct FakeEngine {
    pub fail_on: Option<String>,
}

impl OcrEngine for FakeEngine {
    fn recognize(&mut self, image_path: &Path) -> Result<PageResult, EngineError> {
        let stem = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        if let Some(marker) = &self.fail_on {
            if stem.contains(marker.as_str()) {
                return Err(EngineError(format!("cannot read {}", stem)));
            }
        }
        Ok(PageResult::new(
            vec![vec![[2.0, 2.0], [30.0, 2.0], [30.0, 12.0], [2.0, 12.0]]],
            vec![stem],
        )
        .with_scores(vec![0.99]))
    }
}

pub fn fake_engine(_profile: &EngineProfile, _worker_id: usize) -> Result<FakeEngine, String> {
    Ok(FakeEngine { fail_on: None })
}

pub struct TestHarness {
    temp_dir: TempDir,
    pub image_root: PathBuf,
    pub ocr_root: PathBuf,
    pub output_root: PathBuf,
    pub error_root: PathBuf,
    pub workers: usize,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        let image_root = base.join("images");
        let ocr_root = base.join("ocr");
        let output_root = base.join("out");
        let error_root = base.join("errors");
        for dir in [&image_root, &ocr_root, &output_root] {
            std::fs::create_dir_all(dir).expect("Failed to create directory");
        }

        Self {
            temp_dir,
            image_root,
            ocr_root,
            output_root,
            error_root,
            workers: 2,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes a solid PNG page of the given size.
    pub fn write_png(&self, doc: &str, name: &str, width: u32, height: u32) -> PathBuf {
        let path = self.image_root.join(doc).join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbImage::from_pixel(width, height, image::Rgb([235, 235, 235]))
            .save(&path)
            .expect("Failed to write png");
        path
    }

    pub fn write_jpeg(&self, doc: &str, name: &str, width: u32, height: u32) -> PathBuf {
        let path = self.image_root.join(doc).join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbImage::from_pixel(width, height, image::Rgb([200, 210, 220]))
            .save_with_format(&path, image::ImageFormat::Jpeg)
            .expect("Failed to write jpeg");
        path
    }

    pub fn write_raw(&self, doc: &str, name: &str, content: &[u8]) -> PathBuf {
        let path = self.image_root.join(doc).join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    /// One region per text, stacked vertically.
    pub fn write_result(&self, doc: &str, stem: &str, texts: &[&str]) -> PathBuf {
        let path = self.ocr_root.join(doc).join(format!("{}_result.json", stem));
        let polygons = (0..texts.len())
            .map(|i| {
                let y = 12.0 * i as f64;
                vec![[1.0, y], [40.0, y], [40.0, y + 10.0], [1.0, y + 10.0]]
            })
            .collect();
        PageResult::new(polygons, texts.iter().map(|t| t.to_string()).collect())
            .save(&path)
            .expect("Failed to write result");
        path
    }

    pub fn result_path(&self, doc: &str, stem: &str) -> PathBuf {
        self.ocr_root.join(doc).join(format!("{}_result.json", stem))
    }

    pub fn pdf_path(&self, doc: &str) -> PathBuf {
        self.output_root.join(format!("{}_searchable.pdf", doc))
    }

    fn settings(&self) -> RunSettings {
        RunSettings {
            workers: self.workers,
            report_every: 2,
            release_every: 3,
        }
    }

    pub fn ocr_config(&self) -> OcrPipelineConfig {
        OcrPipelineConfig {
            image_root: self.image_root.clone(),
            output_root: self.ocr_root.clone(),
            error_root: self.error_root.clone(),
            profile: EngineProfile::default(),
            settings: self.settings(),
        }
    }

    pub fn assembly_config(&self) -> AssemblyPipelineConfig {
        AssemblyPipelineConfig {
            ocr_root: self.ocr_root.clone(),
            image_root: self.image_root.clone(),
            output_root: self.output_root.clone(),
            options: AssemblyOptions::new(&self.error_root),
            settings: self.settings(),
        }
    }

    pub fn no_cancel() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }
}

/// MediaBox widths of every page, in page order.
pub fn pdf_page_widths(path: &Path) -> Vec<i64> {
    let doc = lopdf::Document::load_mem(&std::fs::read(path).expect("Failed to read pdf"))
        .expect("Failed to parse pdf");
    doc.get_pages()
        .values()
        .map(|page_id| {
            let page = doc.get_object(*page_id).unwrap().as_dict().unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            media_box[2].as_i64().unwrap()
        })
        .collect()
}

use std::path::{Path, PathBuf};

use crate::error::UnitError;
use crate::pipeline::error::ErrorRecord;
use crate::sanitize::relative_label;

/// Suffix of per-image OCR result files.
pub const RESULT_SUFFIX: &str = "_result.json";

/// One indivisible item of work, consumed exactly once by a worker.
pub trait WorkUnit: Send + 'static {
    /// Stable identifier used in logs and error records.
    fn id(&self) -> String;
}

/// OCR one image into `<output_dir>/<base>_result.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrUnit {
    pub image_path: PathBuf,
    pub output_dir: PathBuf,
    pub error_dir: PathBuf,
    /// Root the image was discovered under; quarantine mirrors paths relative to it.
    pub source_root: PathBuf,
}

impl OcrUnit {
    pub fn base_name(&self) -> String {
        self.image_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string())
    }

    pub fn result_path(&self) -> PathBuf {
        result_path_for(&self.output_dir, &self.image_path)
    }
}

impl WorkUnit for OcrUnit {
    fn id(&self) -> String {
        relative_label(&self.image_path, &self.source_root)
    }
}

/// `<output_dir>/<image stem>_result.json`.
pub fn result_path_for(output_dir: &Path, image_path: &Path) -> PathBuf {
    let stem = image_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());
    output_dir.join(format!("{}{}", stem, RESULT_SUFFIX))
}

/// Assemble one document directory into one searchable PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUnit {
    pub document_id: String,
    pub json_dir: PathBuf,
    pub image_dir: PathBuf,
    pub output_pdf: PathBuf,
}

impl WorkUnit for DocumentUnit {
    fn id(&self) -> String {
        self.document_id.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Completed,
    Failed,
    /// Output appeared after discovery; nothing was done.
    Skipped,
}

/// What a worker reports back for one unit.
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub unit_id: String,
    pub worker_id: usize,
    pub status: UnitStatus,
    /// Pages written (assembly) or images recognized (OCR).
    pub pages: usize,
    /// Every error recorded while processing, including per-page ones of
    /// otherwise completed documents.
    pub errors: Vec<ErrorRecord>,
}

impl UnitOutcome {
    pub fn completed(unit_id: impl Into<String>, pages: usize) -> Self {
        Self {
            unit_id: unit_id.into(),
            worker_id: 0,
            status: UnitStatus::Completed,
            pages,
            errors: Vec::new(),
        }
    }

    pub fn skipped(unit_id: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            worker_id: 0,
            status: UnitStatus::Skipped,
            pages: 0,
            errors: Vec::new(),
        }
    }

    pub fn failed(unit_id: impl Into<String>, error: &UnitError) -> Self {
        let unit_id = unit_id.into();
        let record = ErrorRecord::from_error(&unit_id, error);
        Self {
            unit_id,
            worker_id: 0,
            status: UnitStatus::Failed,
            pages: 0,
            errors: vec![record],
        }
    }

    /// Failure explained by records gathered while processing.
    pub fn failed_with(unit_id: impl Into<String>, errors: Vec<ErrorRecord>) -> Self {
        Self {
            unit_id: unit_id.into(),
            worker_id: 0,
            status: UnitStatus::Failed,
            pages: 0,
            errors,
        }
    }

    pub fn with_errors(mut self, errors: Vec<ErrorRecord>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn is_failure(&self) -> bool {
        self.status == UnitStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn unit() -> OcrUnit {
        OcrUnit {
            image_path: PathBuf::from("/images/doc_a/page_0001.jpg"),
            output_dir: PathBuf::from("/ocr/doc_a"),
            error_dir: PathBuf::from("/errors"),
            source_root: PathBuf::from("/images"),
        }
    }

    #[test]
    fn test_ocr_unit_result_path() {
        assert_eq!(
            unit().result_path(),
            PathBuf::from("/ocr/doc_a/page_0001_result.json")
        );
        assert_eq!(unit().base_name(), "page_0001");
    }

    #[test]
    fn test_ocr_unit_id_is_relative() {
        assert_eq!(unit().id(), "doc_a/page_0001.jpg");
    }

    #[test]
    fn test_outcome_failed_carries_record() {
        let outcome = UnitOutcome::failed("doc_a/page_0001.jpg", &UnitError::Engine("oom".into()));
        assert!(outcome.is_failure());
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].kind, ErrorKind::Engine);
        assert_eq!(outcome.errors[0].unit, "doc_a/page_0001.jpg");
    }

    #[test]
    fn test_outcome_completed_with_page_errors() {
        let record = ErrorRecord::from_error("doc_b", &UnitError::Resolution("page_2.png".into()));
        let outcome = UnitOutcome::completed("doc_b", 2).with_errors(vec![record]);
        assert!(!outcome.is_failure());
        assert_eq!(outcome.pages, 2);
        assert_eq!(outcome.errors.len(), 1);
    }
}

//! Assembly stage: page images plus OCR results become one searchable PDF
//! per document.

pub mod enhance;
pub mod layout;
pub mod order;
pub mod pdf;
pub mod resolve;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use tracing::info_span;

use crate::error::UnitError;
use crate::ocr::PageResult;
use crate::pipeline::error::ErrorRecord;
use crate::sanitize::redact_path;
use crate::storage::{Quarantine, QuarantineMode};
use crate::worker::context::{ContextFactory, WorkerContext};
use crate::worker::job::{DocumentUnit, UnitOutcome};

pub use layout::{fit_font_size, place_text, TextPlacement};
pub use order::{ordered_pages, sort_page_names, PageKey};
pub use pdf::{PageImage, PdfWriter};
pub use resolve::{Resolution, ResultIndex};

#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    /// Downward shift applied to region coordinates, in pixels.
    pub y_offset: f64,
    pub enhance: bool,
    /// Keep enhanced pages on disk next to the originals.
    pub save_enhanced: bool,
    /// Move the artifacts of failed pages into the error area.
    pub quarantine: bool,
    pub error_root: PathBuf,
}

impl AssemblyOptions {
    pub fn new<P: AsRef<Path>>(error_root: P) -> Self {
        Self {
            y_offset: 30.0,
            enhance: false,
            save_enhanced: false,
            quarantine: true,
            error_root: error_root.as_ref().to_path_buf(),
        }
    }
}

/// What happened to one page.
#[derive(Debug)]
pub enum PageOutcome {
    Placed { regions: usize },
    Skipped(UnitError),
}

impl PageOutcome {
    pub fn is_placed(&self) -> bool {
        matches!(self, PageOutcome::Placed { .. })
    }
}

/// Files touched while attempting one page.
#[derive(Debug, Clone)]
struct PageArtifacts {
    image: PathBuf,
    result: Option<PathBuf>,
    enhanced: Option<PathBuf>,
}

impl PageArtifacts {
    fn new(image: &Path) -> Self {
        Self {
            image: image.to_path_buf(),
            result: None,
            enhanced: None,
        }
    }

    fn paths(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.image.as_path())
            .chain(self.result.as_deref())
            .chain(self.enhanced.as_deref())
    }
}

#[derive(Debug)]
pub struct PageReport {
    pub name: String,
    pub outcome: PageOutcome,
}

/// Result of assembling one document.
#[derive(Debug)]
pub struct DocumentReport {
    pub pages: Vec<PageReport>,
    /// Set when the document itself could not be produced.
    pub failure: Option<UnitError>,
    pub quarantined: Vec<PathBuf>,
}

impl DocumentReport {
    pub fn placed(&self) -> usize {
        self.pages.iter().filter(|p| p.outcome.is_placed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.pages.len() - self.placed()
    }
}

pub struct AssemblyContext {
    worker_id: usize,
    options: Arc<AssemblyOptions>,
}

impl AssemblyContext {
    pub fn new(worker_id: usize, options: Arc<AssemblyOptions>) -> Self {
        Self { worker_id, options }
    }

    /// Builds the document page by page. Page failures are recorded and
    /// skipped; the file is written only if at least one page was placed.
    pub fn assemble(&self, unit: &DocumentUnit) -> DocumentReport {
        let mut report = DocumentReport {
            pages: Vec::new(),
            failure: None,
            quarantined: Vec::new(),
        };

        let pages = match ordered_pages(&unit.image_dir) {
            Ok(pages) if !pages.is_empty() => pages,
            Ok(_) => {
                report.failure = Some(UnitError::Validation {
                    path: unit.image_dir.clone(),
                    reason: "no page images".to_string(),
                });
                return report;
            }
            Err(e) => {
                report.failure = Some(UnitError::Validation {
                    path: unit.image_dir.clone(),
                    reason: e.to_string(),
                });
                return report;
            }
        };

        let index = ResultIndex::load(&unit.json_dir).unwrap_or_else(|e| {
            warn!("Cannot list results in {}: {}", unit.json_dir.display(), e);
            ResultIndex::from_stems(&unit.json_dir, Vec::new())
        });

        let mut writer = PdfWriter::new();
        let mut failed_artifacts = Vec::new();

        for page in &pages {
            let name = page
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let _span = info_span!("assembly.page", page = %redact_path(page)).entered();

            let mut artifacts = PageArtifacts::new(page);
            let outcome = match self.place_page(&mut writer, &index, unit, &mut artifacts) {
                Ok(regions) => PageOutcome::Placed { regions },
                Err(e) => {
                    warn!("Skipping page {} of {}: {}", name, unit.document_id, e);
                    failed_artifacts.push(artifacts);
                    PageOutcome::Skipped(e)
                }
            };
            report.pages.push(PageReport { name, outcome });
        }

        if writer.page_count() == 0 {
            warn!("No pages placed for {}, nothing written", unit.document_id);
        } else if let Err(e) = writer.save(&unit.output_pdf) {
            report.failure = Some(e.into());
        } else {
            info!(
                "Wrote {} ({} pages, {} skipped)",
                unit.output_pdf.display(),
                report.placed(),
                report.skipped()
            );
        }

        if self.options.quarantine && !failed_artifacts.is_empty() {
            let quarantine = Quarantine::new(
                &unit.image_dir,
                &self.options.error_root,
                QuarantineMode::Move,
            );
            for artifacts in &failed_artifacts {
                for path in artifacts.paths().filter(|p| p.exists()) {
                    if let Some(moved) = quarantine.isolate_into(path, &unit.document_id) {
                        report.quarantined.push(moved);
                    }
                }
            }
        }

        report
    }

    fn place_page(
        &self,
        writer: &mut PdfWriter,
        index: &ResultIndex,
        unit: &DocumentUnit,
        artifacts: &mut PageArtifacts,
    ) -> Result<usize, UnitError> {
        let page = artifacts.image.clone();
        let base = page
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let resolved = index.resolve(&base).ok_or_else(|| {
            UnitError::Resolution(
                page.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or(base.clone()),
            )
        })?;
        debug!("{} -> {} ({:?})", base, resolved.path.display(), resolved.via);
        artifacts.result = Some(resolved.path.clone());

        let result = PageResult::load(&resolved.path)?;

        let validation = |reason: String| UnitError::Validation {
            path: page.clone(),
            reason,
        };
        let bytes = std::fs::read(&page).map_err(|e| validation(e.to_string()))?;
        let decoded = image::load_from_memory(&bytes).map_err(|e| validation(e.to_string()))?;

        let background = if self.options.enhance {
            let gray = enhance::enhance(&decoded);
            if self.options.save_enhanced {
                let target = enhance::enhanced_path(&unit.image_dir, &page);
                enhance::save_png(&gray, &target)?;
                artifacts.enhanced = Some(target);
            }
            PageImage::from_dynamic(&image::DynamicImage::ImageLuma8(gray))
        } else {
            PageImage::from_encoded(bytes, &decoded)
        };

        let page_height = background.height as f64;
        let texts: Vec<TextPlacement> = result
            .regions()
            .filter_map(|(polygon, text)| {
                place_text(polygon, text, page_height, self.options.y_offset)
            })
            .collect();
        let regions = texts.len();

        writer.add_page(background, &texts);
        Ok(regions)
    }
}

impl WorkerContext for AssemblyContext {
    type Unit = DocumentUnit;

    fn process(&mut self, unit: &DocumentUnit) -> UnitOutcome {
        let _span = info_span!("assembly.document",
            worker = self.worker_id,
            document = %unit.document_id,
        )
        .entered();

        if unit.output_pdf.exists() {
            debug!("Output appeared since discovery: {}", unit.output_pdf.display());
            return UnitOutcome::skipped(&unit.document_id);
        }

        let report = self.assemble(unit);
        let mut errors: Vec<ErrorRecord> = report
            .pages
            .iter()
            .filter_map(|page| match &page.outcome {
                PageOutcome::Skipped(e) => Some(ErrorRecord::from_error(
                    &format!("{}/{}", unit.document_id, page.name),
                    e,
                )),
                PageOutcome::Placed { .. } => None,
            })
            .collect();

        if let Some(failure) = &report.failure {
            warn!("Document {} failed: {}", unit.document_id, failure);
            errors.push(ErrorRecord::from_error(&unit.document_id, failure));
            return UnitOutcome::failed_with(&unit.document_id, errors);
        }
        if report.placed() == 0 {
            return UnitOutcome::failed_with(&unit.document_id, errors);
        }
        UnitOutcome::completed(&unit.document_id, report.placed()).with_errors(errors)
    }
}

pub struct AssemblyContextFactory {
    options: Arc<AssemblyOptions>,
}

impl AssemblyContextFactory {
    pub fn new(options: AssemblyOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }
}

impl ContextFactory for AssemblyContextFactory {
    type Context = AssemblyContext;

    fn build(&self, worker_id: usize) -> Result<AssemblyContext, String> {
        Ok(AssemblyContext::new(worker_id, Arc::clone(&self.options)))
    }
}

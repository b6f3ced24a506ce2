use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::{check_root, has_extension, Discovered, PAGE_EXTENSIONS};
use crate::error::DiscoveryError;
use crate::worker::job::DocumentUnit;

/// `<document_id>_searchable.pdf`, or `_searchable_enhanced.pdf` when the
/// enhanced page images are kept.
pub fn output_pdf_name(document_id: &str, enhanced: bool) -> String {
    if enhanced {
        format!("{}_searchable_enhanced.pdf", document_id)
    } else {
        format!("{}_searchable.pdf", document_id)
    }
}

/// Scans the OCR root for document directories with matching image folders.
pub struct DocumentScanner {
    ocr_root: PathBuf,
    image_root: PathBuf,
    output_root: PathBuf,
    enhanced_output: bool,
}

impl DocumentScanner {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>>(
        ocr_root: P,
        image_root: Q,
        output_root: R,
    ) -> Self {
        Self {
            ocr_root: ocr_root.as_ref().to_path_buf(),
            image_root: image_root.as_ref().to_path_buf(),
            output_root: output_root.as_ref().to_path_buf(),
            enhanced_output: false,
        }
    }

    pub fn with_enhanced_output(mut self, enhanced: bool) -> Self {
        self.enhanced_output = enhanced;
        self
    }

    pub fn scan(&self) -> Result<Discovered<DocumentUnit>, DiscoveryError> {
        check_root(&self.ocr_root)?;

        let mut directories = Vec::new();
        let entries = fs::read_dir(&self.ocr_root).map_err(|e| DiscoveryError::ReadDir {
            path: self.ocr_root.clone(),
            source: e,
        })?;
        for entry in entries {
            match entry {
                Ok(entry) if entry.path().is_dir() => {
                    directories.push(entry.file_name().to_string_lossy().to_string())
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable entry in {}: {}", self.ocr_root.display(), e),
            }
        }
        directories.sort();

        let mut units = Vec::new();
        let mut skipped = 0;
        let mut total_pages = 0;

        for document_id in directories {
            let image_dir = self.image_root.join(&document_id);
            if !image_dir.is_dir() {
                info!(
                    "No image directory for document {}, ignoring",
                    document_id
                );
                continue;
            }

            let output_pdf = self
                .output_root
                .join(output_pdf_name(&document_id, self.enhanced_output));
            if output_pdf.exists() {
                debug!("Output exists, skipping: {}", output_pdf.display());
                skipped += 1;
                continue;
            }

            total_pages += count_pages(&image_dir);
            units.push(DocumentUnit {
                json_dir: self.ocr_root.join(&document_id),
                image_dir,
                output_pdf,
                document_id,
            });
        }

        info!(
            "Found {} documents ({} pages) in {} ({} already assembled)",
            units.len(),
            total_pages,
            self.ocr_root.display(),
            skipped
        );
        Ok(Discovered {
            units,
            skipped,
            total_pages,
        })
    }
}

fn count_pages(image_dir: &Path) -> usize {
    match fs::read_dir(image_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file() && has_extension(&e.path(), PAGE_EXTENSIONS))
            .count(),
        Err(e) => {
            warn!("Failed to count pages in {}: {}", image_dir.display(), e);
            0
        }
    }
}

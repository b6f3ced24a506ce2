use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use super::{check_root, has_extension, Discovered, OCR_EXTENSIONS};
use crate::error::DiscoveryError;
use crate::worker::job::{result_path_for, OcrUnit};

/// Recursive scan of an image tree for OCR work.
pub struct ImageScanner {
    image_root: PathBuf,
    output_root: PathBuf,
    error_root: PathBuf,
}

impl ImageScanner {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>>(
        image_root: P,
        output_root: Q,
        error_root: R,
    ) -> Self {
        Self {
            image_root: image_root.as_ref().to_path_buf(),
            output_root: output_root.as_ref().to_path_buf(),
            error_root: error_root.as_ref().to_path_buf(),
        }
    }

    pub fn image_root(&self) -> &Path {
        &self.image_root
    }

    /// Output directory mirroring the image's directory under the OCR root.
    pub fn output_dir_for(&self, image_path: &Path) -> PathBuf {
        let relative_dir = image_path
            .parent()
            .and_then(|parent| parent.strip_prefix(&self.image_root).ok())
            .unwrap_or_else(|| Path::new(""));
        self.output_root.join(relative_dir)
    }

    pub fn scan(&self) -> Result<Discovered<OcrUnit>, DiscoveryError> {
        check_root(&self.image_root)?;

        let mut units = Vec::new();
        let mut skipped = 0;
        // Result path -> first image claiming it.
        let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();

        for entry in WalkDir::new(&self.image_root)
            .min_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(DiscoveryError::ScanFailed {
                        path: self.image_root.clone(),
                        source: e,
                    })
                }
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !has_extension(entry.path(), OCR_EXTENSIONS) {
                continue;
            }

            let image_path = entry.path().to_path_buf();
            let output_dir = self.output_dir_for(&image_path);
            let result_path = result_path_for(&output_dir, &image_path);
            if result_path.exists() {
                debug!("Result exists, skipping: {}", image_path.display());
                skipped += 1;
                continue;
            }
            if let Some(first) = claimed.get(&result_path) {
                warn!(
                    "Skipping {}: shares its result file {} with {}",
                    image_path.display(),
                    result_path.display(),
                    first.display()
                );
                skipped += 1;
                continue;
            }
            claimed.insert(result_path, image_path.clone());

            units.push(OcrUnit {
                image_path,
                output_dir,
                error_dir: self.error_root.clone(),
                source_root: self.image_root.clone(),
            });
        }

        info!(
            "Scanned {} images in {} ({} already processed)",
            units.len(),
            self.image_root.display(),
            skipped
        );
        Ok(Discovered {
            units,
            skipped,
            total_pages: 0,
        })
    }
}

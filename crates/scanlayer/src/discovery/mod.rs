pub mod documents;
pub mod images;

use std::path::Path;

use crate::error::DiscoveryError;

pub use documents::{output_pdf_name, DocumentScanner};
pub use images::ImageScanner;

/// Extensions eligible for OCR.
pub const OCR_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

/// Extensions treated as document pages during assembly.
pub const PAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Work units found under a root, minus the ones whose output already exists.
#[derive(Debug, Clone)]
pub struct Discovered<U> {
    pub units: Vec<U>,
    /// Units excluded because their output artifact exists.
    pub skipped: usize,
    /// Page images across the discovered units. Zero for OCR.
    pub total_pages: usize,
}

impl<U> Discovered<U> {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            extensions.iter().any(|candidate| *candidate == ext)
        })
        .unwrap_or(false)
}

pub(crate) fn check_root(root: &Path) -> Result<(), DiscoveryError> {
    if !root.exists() {
        return Err(DiscoveryError::MissingRoot(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(DiscoveryError::NotADirectory(root.to_path_buf()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_has_extension_case_insensitive() {
        assert!(has_extension(Path::new("a/PAGE_1.JPG"), OCR_EXTENSIONS));
        assert!(has_extension(Path::new("scan.tiff"), OCR_EXTENSIONS));
        assert!(!has_extension(Path::new("notes.txt"), OCR_EXTENSIONS));
        assert!(!has_extension(Path::new("noext"), OCR_EXTENSIONS));
        assert!(!has_extension(Path::new("scan.bmp"), PAGE_EXTENSIONS));
    }

    #[test]
    fn test_check_root() {
        let temp_dir = TempDir::new().unwrap();
        assert!(check_root(temp_dir.path()).is_ok());

        let missing = temp_dir.path().join("missing");
        assert!(matches!(
            check_root(&missing),
            Err(DiscoveryError::MissingRoot(_))
        ));

        let file = temp_dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(
            check_root(&file),
            Err(DiscoveryError::NotADirectory(_))
        ));
    }
}

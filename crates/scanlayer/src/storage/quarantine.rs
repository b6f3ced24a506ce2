use std::path::{Path, PathBuf};

use log::{error, info};

use super::filesystem::{copy_file, ensure_directory, move_file};
use crate::error::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuarantineMode {
    /// Leave the original in place (OCR stage).
    Copy,
    /// Relocate the original (assembly stage).
    Move,
}

/// Best-effort relocation of failing inputs into an error area that mirrors
/// the source layout.
#[derive(Debug, Clone)]
pub struct Quarantine {
    source_root: PathBuf,
    error_root: PathBuf,
    mode: QuarantineMode,
}

impl Quarantine {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        source_root: P,
        error_root: Q,
        mode: QuarantineMode,
    ) -> Self {
        Self {
            source_root: source_root.as_ref().to_path_buf(),
            error_root: error_root.as_ref().to_path_buf(),
            mode,
        }
    }

    pub fn error_root(&self) -> &Path {
        &self.error_root
    }

    pub fn mode(&self) -> QuarantineMode {
        self.mode
    }

    /// `<error_root>/<input relative to source_root>`. Inputs outside the
    /// source root keep only their file name.
    pub fn destination_for(&self, input: &Path) -> PathBuf {
        match input.strip_prefix(&self.source_root) {
            Ok(relative) if !relative.as_os_str().is_empty() => self.error_root.join(relative),
            _ => self.error_root.join(input.file_name().unwrap_or(input.as_os_str())),
        }
    }

    /// Quarantines `input` at its mirrored location. Failures are logged and
    /// reported as `None`; they never propagate.
    pub fn isolate(&self, input: &Path) -> Option<PathBuf> {
        let destination = self.destination_for(input);
        self.relocate(input, &destination)
    }

    /// Quarantines `input` into `<error_root>/<group>/<file name>`.
    pub fn isolate_into(&self, input: &Path, group: &str) -> Option<PathBuf> {
        let name = input.file_name()?;
        let destination = self.error_root.join(group).join(name);
        self.relocate(input, &destination)
    }

    fn relocate(&self, input: &Path, destination: &Path) -> Option<PathBuf> {
        match self.try_relocate(input, destination) {
            Ok(()) => {
                info!(
                    "Quarantined {} -> {}",
                    input.display(),
                    destination.display()
                );
                Some(destination.to_path_buf())
            }
            Err(e) => {
                error!("Failed to quarantine {}: {}", input.display(), e);
                None
            }
        }
    }

    fn try_relocate(&self, input: &Path, destination: &Path) -> Result<(), StorageError> {
        if let Some(parent) = destination.parent() {
            ensure_directory(parent)?;
        }
        match self.mode {
            QuarantineMode::Copy => copy_file(input, destination),
            QuarantineMode::Move => move_file(input, destination),
        }
    }
}

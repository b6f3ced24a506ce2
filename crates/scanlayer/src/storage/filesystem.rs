use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Move a file from `src` to `dst`. Uses `rename` first (fast, atomic on same
/// filesystem). Falls back to copy + delete when rename fails, which handles
/// cross-device moves.
pub fn move_file(src: &Path, dst: &Path) -> Result<(), StorageError> {
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    std::fs::copy(src, dst).map_err(|e| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    std::fs::remove_file(src).map_err(|e| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

pub fn copy_file(src: &Path, dst: &Path) -> Result<(), StorageError> {
    std::fs::copy(src, dst).map_err(|e| StorageError::CopyFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

pub fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

/// Sibling temp path in the same directory, so the final rename never
/// crosses a filesystem boundary.
fn temp_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("output");
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()))
}

/// Writes `target` through a temp file and rename. Readers either see the
/// previous state or the complete file, never a partial write.
pub fn write_atomic<F>(target: &Path, write: F) -> Result<(), StorageError>
where
    F: FnOnce(&mut std::fs::File) -> std::io::Result<()>,
{
    if let Some(parent) = target.parent() {
        ensure_directory(parent)?;
    }

    let temp = temp_path_for(target);
    let result = std::fs::File::create(&temp)
        .and_then(|mut file| {
            write(&mut file)?;
            file.flush()?;
            file.sync_all()
        })
        .and_then(|_| std::fs::rename(&temp, target));

    if let Err(e) = result {
        let _ = std::fs::remove_file(&temp);
        return Err(StorageError::WriteFile {
            path: target.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}

pub fn write_bytes_atomic(target: &Path, content: &[u8]) -> Result<(), StorageError> {
    write_atomic(target, |file| file.write_all(content))
}

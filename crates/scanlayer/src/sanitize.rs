//! Path helpers for log lines and tracing span fields.
//!
//! Spans carry file names only; error records carry paths relative to the
//! source root, so logs from different machines line up.

use std::path::Path;

/// Returns only the file name component of a path.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// `path` relative to `root` with `/` separators, or the full path when it
/// lies outside the root.
pub fn relative_label(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) if !relative.as_os_str().is_empty() => relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        _ => path.display().to_string(),
    }
}

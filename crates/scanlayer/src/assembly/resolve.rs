//! Pairs page images with their OCR result files.
//!
//! Resolution runs a fixed chain: exact stem, then numeric `page_<N>` token,
//! then longest common prefix. Names carrying a page token never reach the
//! prefix step. That step is a heuristic and can pair the wrong files when
//! names only share a prefix.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::worker::job::RESULT_SUFFIX;

static RE_PAGE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)page_(\d+)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    ExactStem,
    PageNumber,
    LongestPrefix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub path: PathBuf,
    pub via: Resolution,
}

/// Result stems of one document directory (`<stem>_result.json`).
#[derive(Debug, Clone)]
pub struct ResultIndex {
    json_dir: PathBuf,
    /// Sorted, so every tie-break below is lexicographic.
    stems: Vec<String>,
}

fn page_number(name: &str) -> Option<u64> {
    RE_PAGE_TOKEN
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

impl ResultIndex {
    pub fn load(json_dir: &Path) -> std::io::Result<Self> {
        let mut stems = Vec::new();
        for entry in fs::read_dir(json_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(stem) = name.strip_suffix(RESULT_SUFFIX) {
                if entry.path().is_file() {
                    stems.push(stem.to_string());
                }
            }
        }
        Ok(Self::from_stems(json_dir, stems))
    }

    pub fn from_stems(json_dir: &Path, mut stems: Vec<String>) -> Self {
        stems.sort();
        stems.dedup();
        Self {
            json_dir: json_dir.to_path_buf(),
            stems,
        }
    }

    pub fn len(&self) -> usize {
        self.stems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stems.is_empty()
    }

    fn path_for(&self, stem: &str) -> PathBuf {
        self.json_dir.join(format!("{}{}", stem, RESULT_SUFFIX))
    }

    /// Resolves the result for a page image's base name (no extension).
    pub fn resolve(&self, image_base: &str) -> Option<Resolved> {
        let found = match self.exact(image_base) {
            Some(stem) => Some((stem, Resolution::ExactStem)),
            None => match page_number(image_base) {
                Some(wanted) => self
                    .by_page_number(wanted)
                    .map(|stem| (stem, Resolution::PageNumber)),
                None => self
                    .by_prefix(image_base)
                    .map(|stem| (stem, Resolution::LongestPrefix)),
            },
        };
        found.map(|(stem, via)| Resolved {
            path: self.path_for(stem),
            via,
        })
    }

    fn exact(&self, image_base: &str) -> Option<&str> {
        self.stems
            .binary_search_by(|stem| stem.as_str().cmp(image_base))
            .ok()
            .map(|i| self.stems[i].as_str())
    }

    fn by_page_number(&self, wanted: u64) -> Option<&str> {
        self.stems
            .iter()
            .find(|stem| page_number(stem) == Some(wanted))
            .map(String::as_str)
    }

    fn by_prefix(&self, image_base: &str) -> Option<&str> {
        self.stems
            .iter()
            .filter(|stem| stem.starts_with(image_base) || image_base.starts_with(stem.as_str()))
            // `max_by_key` keeps the last maximum; iterate reversed so the
            // lowest stem wins ties.
            .rev()
            .max_by_key(|stem| stem.len())
            .map(String::as_str)
    }
}

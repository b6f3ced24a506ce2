//! Deterministic page order within a document.
//!
//! Front matter sorts first (`bok`, `leg`, `fow`, `!`), then numbered pages
//! by their leading integer, then covers, then everything else. Ties use
//! natural order and finally the raw file name, so the result never depends
//! on directory enumeration order.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use crate::discovery::{has_extension, PAGE_EXTENSIONS};

/// `(prefix, priority)`; checked in order against the lowercase name.
const PREFIX_PRIORITIES: &[(&str, u8)] = &[("bok", 0), ("leg", 1), ("fow", 2), ("!", 3)];
const DIGIT_PRIORITY: u8 = 4;
const COVER_PRIORITY: u8 = 5;
const OTHER_PRIORITY: u8 = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Chunk {
    /// Digit run with leading zeros stripped.
    Number(String),
    Text(String),
}

impl Ord for Chunk {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Chunk::Number(a), Chunk::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Chunk::Number(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Number(_)) => Ordering::Greater,
            (Chunk::Text(a), Chunk::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Chunk {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn natural_chunks(name: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut in_digits = false;

    let mut flush = |current: &mut String, digits: bool| {
        if current.is_empty() {
            return;
        }
        let taken = std::mem::take(current);
        chunks.push(if digits {
            let trimmed = taken.trim_start_matches('0');
            Chunk::Number(if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() })
        } else {
            Chunk::Text(taken)
        });
    };

    for c in name.chars() {
        let digit = c.is_ascii_digit();
        if digit != in_digits {
            flush(&mut current, in_digits);
            in_digits = digit;
        }
        current.push(c);
    }
    flush(&mut current, in_digits);
    chunks
}

/// Sort key for one page file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PageKey {
    priority: u8,
    leading_number: u64,
    natural: Vec<Chunk>,
    raw: String,
}

impl PageKey {
    pub fn new(name: &str) -> Self {
        let lower = name.to_lowercase();
        let mut leading_number = 0;

        let priority = if let Some(&(_, priority)) = PREFIX_PRIORITIES
            .iter()
            .find(|(prefix, _)| lower.starts_with(prefix))
        {
            priority
        } else if lower.starts_with(|c: char| c.is_ascii_digit()) {
            let digits: String = lower.chars().take_while(|c| c.is_ascii_digit()).collect();
            leading_number = digits.parse().unwrap_or(u64::MAX);
            DIGIT_PRIORITY
        } else if lower.starts_with("cov") {
            COVER_PRIORITY
        } else {
            OTHER_PRIORITY
        };

        Self {
            priority,
            leading_number,
            natural: natural_chunks(&lower),
            raw: name.to_string(),
        }
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }
}

/// Sorts page file names in place.
pub fn sort_page_names(names: &mut [String]) {
    names.sort_by_cached_key(|name| PageKey::new(name));
}

/// Page images of `image_dir` in page order.
pub fn ordered_pages(image_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(image_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && has_extension(&path, PAGE_EXTENSIONS) {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    sort_page_names(&mut names);
    Ok(names.into_iter().map(|name| image_dir.join(name)).collect())
}

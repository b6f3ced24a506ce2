//! Groups Tesseract TSV word boxes into line regions.

use std::collections::BTreeMap;

use super::result::PageResult;

/// TSV `level` of a single word.
const WORD_LEVEL: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
struct Word {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
    confidence: f64,
    text: String,
}

#[derive(Debug, Default)]
struct Line {
    words: Vec<Word>,
}

impl Line {
    fn text(&self) -> String {
        let mut text = String::new();
        for word in &self.words {
            if let (Some(prev), Some(next)) = (text.chars().last(), word.text.chars().next()) {
                if !(is_wide(prev) && is_wide(next)) {
                    text.push(' ');
                }
            }
            text.push_str(&word.text);
        }
        text
    }

    fn polygon(&self) -> Vec<[f64; 2]> {
        let left = self.words.iter().map(|w| w.left).fold(f64::MAX, f64::min);
        let top = self.words.iter().map(|w| w.top).fold(f64::MAX, f64::min);
        let right = self.words.iter().map(|w| w.right).fold(f64::MIN, f64::max);
        let bottom = self.words.iter().map(|w| w.bottom).fold(f64::MIN, f64::max);
        vec![[left, top], [right, top], [right, bottom], [left, bottom]]
    }

    fn score(&self) -> f64 {
        let sum: f64 = self.words.iter().map(|w| w.confidence).sum();
        sum / self.words.len() as f64 / 100.0
    }
}

/// Ideographs and other full-width scripts are written without separators.
fn is_wide(c: char) -> bool {
    c as u32 >= 0x2E80
}

/// Parses `get_tsv_text` output. Each text line becomes one 4-point polygon
/// and one text entry, in reading order.
pub fn parse_tsv(tsv: &str) -> PageResult {
    let mut lines: BTreeMap<(u32, u32, u32, u32), Line> = BTreeMap::new();

    for row in tsv.lines() {
        let columns: Vec<&str> = row.split('\t').collect();
        if columns.len() < 12 {
            continue;
        }
        let level = match columns[0].parse::<u32>() {
            Ok(level) => level,
            // Header row.
            Err(_) => continue,
        };
        if level != WORD_LEVEL {
            continue;
        }

        let text = columns[11..].join("\t").trim().to_string();
        let confidence = columns[10].parse::<f64>().unwrap_or(-1.0);
        if text.is_empty() || confidence < 0.0 {
            continue;
        }

        let number = |i: usize| columns[i].parse::<u32>().unwrap_or(0);
        let coordinate = |i: usize| columns[i].parse::<f64>().unwrap_or(0.0);
        let key = (number(1), number(2), number(3), number(4));
        let (left, top) = (coordinate(6), coordinate(7));

        lines.entry(key).or_default().words.push(Word {
            left,
            top,
            right: left + coordinate(8),
            bottom: top + coordinate(9),
            confidence,
            text,
        });
    }

    let mut result = PageResult::default();
    for line in lines.values().filter(|line| !line.words.is_empty()) {
        result.dt_polys.push(line.polygon());
        result.rec_text.push(line.text());
        result.rec_score.push(line.score());
    }
    result
}

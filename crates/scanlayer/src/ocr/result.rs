//! Per-image OCR result file (`<base>_result.json`).

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;

use crate::error::{StorageError, UnitError};
use crate::storage::write_atomic;

pub type Point = [f64; 2];

/// Detected text region, corner points in image pixel coordinates.
pub type Polygon = Vec<Point>;

/// Minimum corners of a usable region.
pub const MIN_POLYGON_POINTS: usize = 4;

/// Field order is the on-disk key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_path: Option<String>,
    pub dt_polys: Vec<Polygon>,
    pub rec_text: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rec_score: Vec<f64>,
}

/// As read from disk, before structural checks.
#[derive(Debug, Deserialize)]
struct RawPageResult {
    #[serde(default)]
    input_path: Option<String>,
    #[serde(default)]
    dt_polys: Option<Vec<Vec<Vec<f64>>>>,
    #[serde(default)]
    rec_text: Option<Vec<String>>,
    #[serde(default)]
    rec_score: Option<Vec<f64>>,
}

impl PageResult {
    pub fn new(dt_polys: Vec<Polygon>, rec_text: Vec<String>) -> Self {
        Self {
            input_path: None,
            dt_polys,
            rec_text,
            rec_score: Vec::new(),
        }
    }

    pub fn with_scores(mut self, rec_score: Vec<f64>) -> Self {
        self.rec_score = rec_score;
        self
    }

    pub fn len(&self) -> usize {
        self.rec_text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rec_text.is_empty()
    }

    /// Regions paired with their text, in detection order.
    pub fn regions(&self) -> impl Iterator<Item = (&Polygon, &str)> {
        self.dt_polys
            .iter()
            .zip(self.rec_text.iter().map(String::as_str))
    }

    /// Loads and structurally validates a result file. Any defect is a
    /// `DataIntegrity` error for the page that needs it.
    pub fn load(path: &Path) -> Result<Self, UnitError> {
        let integrity = |reason: String| UnitError::DataIntegrity {
            path: path.to_path_buf(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| integrity(e.to_string()))?;
        let raw: RawPageResult =
            serde_json::from_str(&content).map_err(|e| integrity(e.to_string()))?;

        let dt_polys = raw
            .dt_polys
            .ok_or_else(|| integrity("missing dt_polys".to_string()))?;
        let rec_text = raw
            .rec_text
            .ok_or_else(|| integrity("missing rec_text".to_string()))?;

        if dt_polys.len() != rec_text.len() {
            return Err(integrity(format!(
                "{} polygons but {} texts",
                dt_polys.len(),
                rec_text.len()
            )));
        }

        let dt_polys = dt_polys
            .into_iter()
            .enumerate()
            .map(|(i, polygon)| {
                to_polygon(polygon).map_err(|reason| integrity(format!("polygon {}: {}", i, reason)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            input_path: raw.input_path,
            dt_polys,
            rec_text,
            rec_score: raw.rec_score.unwrap_or_default(),
        })
    }

    /// Writes the result with 4-space indentation through temp + rename.
    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        write_atomic(path, |file| {
            let mut serializer = serde_json::Serializer::with_formatter(
                &mut *file,
                PrettyFormatter::with_indent(b"    "),
            );
            self.serialize(&mut serializer)
                .map_err(std::io::Error::from)?;
            file.write_all(b"\n")
        })
    }
}

fn to_polygon(points: Vec<Vec<f64>>) -> Result<Polygon, String> {
    if points.len() < MIN_POLYGON_POINTS {
        return Err(format!(
            "{} points, at least {} required",
            points.len(),
            MIN_POLYGON_POINTS
        ));
    }
    points
        .into_iter()
        .map(|point| match point.as_slice() {
            [x, y, ..] => Ok([*x, *y]),
            _ => Err("point without x and y".to_string()),
        })
        .collect()
}

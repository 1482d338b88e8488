//! Per-document feature normalization.
//!
//! Absolute font sizes and page geometry vary wildly between sources, so
//! every statistic here is computed from one document's rows only. The
//! output column order in [`FEATURE_COLUMNS`] is the contract with the
//! heading classifier.

use std::collections::HashMap;

use serde::Serialize;

use crate::features::FeatureRow;
use crate::Error;

/// Column names of the classifier matrix, in order.
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "Font Ratio",
    "Font Size Rank",
    "Text Length",
    "Capitalization Ratio",
    "Position Y",
    "Is Bold",
    "Is Italic",
    "Starts with Numbering",
    "Font Size Count",
    "Is Unique Font Size",
];

pub const FEATURE_COUNT: usize = 10;

/// Value imputed for the gap of the first group on each page.
pub const MISSING_GAP: f64 = 2.0;

/// A feature row with its per-document normalized values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub row: FeatureRow,
    pub font_ratio: f64,
    pub font_size_rank: usize,
    pub font_size_scaled: f64,
    pub text_length_scaled: f64,
    pub capitalization_scaled: f64,
    pub position_y_scaled: f64,
    pub numbering_depth_scaled: f64,
    pub font_size_count_scaled: f64,
    pub is_unique_font_size: bool,
    pub gap_scaled: f64,
}

impl NormalizedRow {
    /// Matrix row in [`FEATURE_COLUMNS`] order.
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.font_ratio,
            self.font_size_rank as f64,
            self.text_length_scaled,
            self.capitalization_scaled,
            self.position_y_scaled,
            flag(self.row.is_bold),
            flag(self.row.is_italic),
            flag(self.row.starts_with_numbering),
            self.font_size_count_scaled,
            flag(self.is_unique_font_size),
        ]
    }
}

/// The numeric matrix handed to the classifier for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// All normalized rows of one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedDocument {
    pub document: String,
    pub rows: Vec<NormalizedRow>,
}

impl NormalizedDocument {
    pub fn matrix(&self) -> FeatureMatrix {
        FeatureMatrix {
            columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: self.rows.iter().map(|r| r.features().to_vec()).collect(),
        }
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Exact-equality key for a font size. `+0.0` and `-0.0` share a key.
fn size_key(size: f32) -> u32 {
    (size + 0.0).to_bits()
}

/// Min-max scale into `[0, 1]`.
///
/// Fewer than two values or a zero range scale to 0 for every value, which
/// also covers the zero-variance case.
pub fn min_max(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    if values.len() < 2 || !range.is_finite() || range <= 0.0 {
        return vec![0.0; values.len()];
    }

    values.iter().map(|v| (v - min) / range).collect()
}

/// Rank distinct font sizes, largest first, starting at 1.
pub fn font_size_ranks(rows: &[FeatureRow]) -> HashMap<u32, usize> {
    let mut sizes: Vec<f32> = rows.iter().map(|r| r.font_size).collect();
    sizes.sort_by(|a, b| b.total_cmp(a));
    sizes.dedup_by(|a, b| size_key(*a) == size_key(*b));

    sizes
        .into_iter()
        .enumerate()
        .map(|(i, size)| (size_key(size), i + 1))
        .collect()
}

/// The most frequent font size; ties go to the smallest size.
pub fn modal_font_size(rows: &[FeatureRow]) -> Option<f32> {
    let counts = font_size_counts(rows);
    rows.iter()
        .map(|r| r.font_size)
        .max_by(|a, b| {
            counts[&size_key(*a)]
                .cmp(&counts[&size_key(*b)])
                .then(b.total_cmp(a))
        })
}

fn font_size_counts(rows: &[FeatureRow]) -> HashMap<u32, usize> {
    let mut counts: HashMap<u32, usize> = HashMap::new();
    for row in rows {
        *counts.entry(size_key(row.font_size)).or_insert(0) += 1;
    }
    counts
}

fn scaled<F: Fn(&FeatureRow) -> f64>(rows: &[FeatureRow], f: F) -> Vec<f64> {
    min_max(&rows.iter().map(f).collect::<Vec<_>>())
}

/// Normalize the feature rows of one document.
pub fn normalize_document(
    document: &str,
    rows: Vec<FeatureRow>,
) -> Result<NormalizedDocument, Error> {
    let body_size =
        modal_font_size(&rows).ok_or_else(|| Error::EmptyDocument(document.to_string()))?;

    let ranks = font_size_ranks(&rows);
    let counts = font_size_counts(&rows);

    let font_size = scaled(&rows, |r| r.font_size as f64);
    let text_length = scaled(&rows, |r| r.text_length as f64);
    let capitalization = scaled(&rows, |r| r.capitalization_ratio);
    let position_y = scaled(&rows, |r| r.y as f64);
    let numbering_depth = scaled(&rows, |r| r.numbering_depth as f64);
    let font_count = scaled(&rows, |r| counts[&size_key(r.font_size)] as f64);
    let gap = scaled(&rows, |r| r.gap.map(f64::from).unwrap_or(MISSING_GAP));

    let normalized = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let key = size_key(row.font_size);
            let font_ratio = if body_size > 0.0 {
                row.font_size as f64 / body_size as f64
            } else {
                1.0
            };
            NormalizedRow {
                font_ratio,
                font_size_rank: ranks[&key],
                font_size_scaled: font_size[i],
                text_length_scaled: text_length[i],
                capitalization_scaled: capitalization[i],
                position_y_scaled: position_y[i],
                numbering_depth_scaled: numbering_depth[i],
                font_size_count_scaled: font_count[i],
                is_unique_font_size: counts[&key] == 1,
                gap_scaled: gap[i],
                row,
            }
        })
        .collect();

    Ok(NormalizedDocument {
        document: document.to_string(),
        rows: normalized,
    })
}

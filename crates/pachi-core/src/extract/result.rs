//! Extraction result and debug payload.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::Direction;

/// Values recovered from one OCR document.
///
/// A field missing from `extracted_values` could not be determined; that is
/// an ordinary outcome, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Resolved, in-range values by field id.
    pub extracted_values: BTreeMap<String, u64>,

    /// Diagnostics for failed or surprising extractions.
    pub debug: ExtractionDebug,
}

impl ExtractionResult {
    /// Result with no values, for blank input.
    pub fn empty(strategy: &str) -> Self {
        Self {
            extracted_values: BTreeMap::new(),
            debug: ExtractionDebug {
                strategy: strategy.to_string(),
                ..ExtractionDebug::default()
            },
        }
    }

    pub fn get(&self, field: &str) -> Option<u64> {
        self.extracted_values.get(field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.extracted_values.is_empty()
    }
}

/// Debug metadata attached to every result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionDebug {
    /// Strategy that produced the result.
    pub strategy: String,

    /// OCR tokens handed in.
    pub token_count: usize,

    /// Numeric candidates observed.
    pub number_count: usize,

    /// Normalized text, cut to the configured limit.
    pub normalized_text: String,

    /// True if `normalized_text` was cut.
    #[serde(default)]
    pub text_truncated: bool,

    /// Keyword to byte offset in the normalized text; `None` when absent.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub anchors: BTreeMap<String, Option<usize>>,

    /// One entry per keyword window evaluated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub windows: Vec<WindowDebug>,

    /// Values removed by the range check.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<DroppedValue>,

    /// Grid geometry, for the positional strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridDebug>,

    /// Field to the strategy that resolved it, for chained extraction.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, String>,
}

/// Outcome of one keyword window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowDebug {
    pub keyword: String,
    pub direction: Direction,
    pub window_size: usize,
    /// Tokens found on the window's side, capped at `window_size`.
    pub available: usize,
    pub resolved: bool,
    pub fields: Vec<String>,
}

/// A value outside its configured range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedValue {
    pub field: String,
    pub value: u64,
    pub min: u64,
    pub max: u64,
}

/// Grid geometry used by the positional strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridDebug {
    pub image_width: f32,
    pub image_height: f32,
    pub cell_width: f32,
    pub cell_height: f32,
    /// Tokens with a bounding polygon.
    pub detection_count: usize,
    /// Winning number per occupied cell, in row-major order.
    pub cells: Vec<CellDebug>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellDebug {
    pub row: i64,
    pub col: i64,
    pub value: u64,
    pub text: String,
}

/// Cut `text` to at most `limit` characters on a char boundary.
pub(crate) fn truncate_chars(text: &str, limit: usize) -> (String, bool) {
    match text.char_indices().nth(limit) {
        Some((end, _)) => (text[..end].to_string(), true),
        None => (text.to_string(), false),
    }
}

//! Positional extraction: numbers assigned to grid cells by geometry.
//!
//! The display is a fixed table of counters. The image extent is split into
//! `cols` columns and `rows + margin_rows` row-units; the first half row-unit
//! (by default) is header space above row 0.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::result::{truncate_chars, CellDebug, ExtractionDebug, ExtractionResult, GridDebug};
use super::target::TargetPattern;
use super::validate::apply_ranges;
use super::Extractor;
use crate::config::{FieldTable, GridConfig, PachiConfig};
use crate::error::ConfigError;
use crate::ocr::OcrDocument;
use crate::text::{normalize, scan_numbers, DigitLabels};

/// Cell geometry derived from the image extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub image_width: f32,
    pub image_height: f32,
    pub cell_width: f32,
    pub cell_height: f32,
    pub top_offset: f32,
}

impl GridLayout {
    /// Layout for an image of the given extent. `None` if the extent is
    /// degenerate.
    pub fn new(image_width: f32, image_height: f32, grid: &GridConfig) -> Option<Self> {
        if !(image_width > 0.0 && image_height > 0.0) || grid.cols == 0 {
            return None;
        }

        let cell_width = image_width / grid.cols as f32;
        let cell_height = image_height / (grid.rows + grid.margin_rows) as f32;

        Some(Self {
            image_width,
            image_height,
            cell_width,
            cell_height,
            top_offset: cell_height * grid.top_margin_cells,
        })
    }

    /// Explicit cell size, for layouts measured elsewhere.
    pub fn with_cells(cell_width: f32, cell_height: f32, top_margin_cells: f32) -> Self {
        Self {
            image_width: 0.0,
            image_height: 0.0,
            cell_width,
            cell_height,
            top_offset: cell_height * top_margin_cells,
        }
    }

    /// `(row, col)` of a point; rows above the grid come out negative.
    pub fn cell_of(&self, x: f32, y: f32) -> (i64, i64) {
        let col = (x / self.cell_width).floor() as i64;
        let row = ((y - self.top_offset) / self.cell_height).floor() as i64;
        (row, col)
    }
}

#[derive(Debug, Clone)]
struct CellHit {
    value: u64,
    text: String,
}

/// Extracts fields from the position of numbers on the display.
#[derive(Debug, Clone)]
pub struct GridExtractor {
    table: FieldTable,
    grid: GridConfig,
    target: Option<TargetPattern>,
    labels: DigitLabels,
    debug_text_limit: usize,
}

impl GridExtractor {
    pub const NAME: &'static str = "grid";

    /// Create an extractor from a validated configuration.
    pub fn new(config: &PachiConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let target = config
            .fields
            .target
            .as_ref()
            .map(TargetPattern::new)
            .transpose()?;

        Ok(Self {
            labels: DigitLabels::new(config.fields.labels()),
            table: config.fields.clone(),
            grid: config.grid.clone(),
            target,
            debug_text_limit: config.extraction.debug_text_limit,
        })
    }

    /// Highest number per cell. OCR often splits one reading into partial
    /// detections; the largest is the most complete.
    fn collect_cells(&self, document: &OcrDocument, layout: &GridLayout) -> BTreeMap<(i64, i64), CellHit> {
        let mut cells: BTreeMap<(i64, i64), CellHit> = BTreeMap::new();

        for token in &document.tokens {
            let Some((x, y)) = token.bounding_box.as_ref().and_then(|b| b.center()) else {
                continue;
            };

            let normalized = normalize(&token.text);
            let Some(number) = scan_numbers(&normalized, &self.labels).iter().next().cloned() else {
                continue;
            };

            let cell = layout.cell_of(x, y);
            debug!(
                "Token '{}' at ({:.1}, {:.1}) -> cell {:?}",
                token.text, x, y, cell
            );

            match cells.get(&cell) {
                Some(existing) if existing.value >= number.value => {}
                _ => {
                    cells.insert(
                        cell,
                        CellHit {
                            value: number.value,
                            text: token.text.clone(),
                        },
                    );
                }
            }
        }

        cells
    }
}

impl Extractor for GridExtractor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn extract(&self, document: &OcrDocument) -> ExtractionResult {
        if document.is_blank() {
            let mut result = ExtractionResult::empty(Self::NAME);
            result.debug.token_count = document.tokens.len();
            return result;
        }

        let normalized = normalize(&document.full_text());
        let (normalized_text, text_truncated) = truncate_chars(&normalized, self.debug_text_limit);

        let mut debug_info = ExtractionDebug {
            strategy: Self::NAME.to_string(),
            token_count: document.tokens.len(),
            normalized_text,
            text_truncated,
            ..ExtractionDebug::default()
        };

        let mut values = BTreeMap::new();

        if let Some(target) = &self.target {
            if let Some(value) = target.find(&normalized) {
                values.insert(target.field().to_string(), value);
            }
        }

        let layout = document
            .image_extent()
            .and_then(|(width, height)| GridLayout::new(width, height, &self.grid));

        match layout {
            Some(layout) => {
                let cells = self.collect_cells(document, &layout);
                debug_info.number_count = cells.len();

                for (field, cell) in self.table.grid_cells() {
                    let key = (cell.row as i64, cell.col as i64);
                    if let Some(hit) = cells.get(&key) {
                        values.entry(field.to_string()).or_insert(hit.value);
                    }
                }

                debug_info.grid = Some(GridDebug {
                    image_width: layout.image_width,
                    image_height: layout.image_height,
                    cell_width: layout.cell_width,
                    cell_height: layout.cell_height,
                    detection_count: document
                        .tokens
                        .iter()
                        .filter(|t| t.bounding_box.as_ref().is_some_and(|b| !b.is_empty()))
                        .count(),
                    cells: cells
                        .into_iter()
                        .map(|((row, col), hit)| CellDebug {
                            row,
                            col,
                            value: hit.value,
                            text: hit.text,
                        })
                        .collect(),
                });
            }
            None => debug!("No token geometry, grid assignment skipped"),
        }

        debug_info.dropped = apply_ranges(&mut values, &self.table);

        info!(
            "Grid extraction resolved {} fields from {} tokens",
            values.len(),
            document.tokens.len()
        );

        ExtractionResult {
            extracted_values: values,
            debug: debug_info,
        }
    }
}

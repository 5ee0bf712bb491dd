//! Field extraction from OCR documents.

pub mod anchor;
mod grid;
mod keyword;
mod result;
mod target;
mod validate;

pub use anchor::{locate, locate_anchors, KeywordAnchor};
pub use grid::{GridExtractor, GridLayout};
pub use keyword::KeywordExtractor;
pub use result::{CellDebug, DroppedValue, ExtractionDebug, ExtractionResult, GridDebug, WindowDebug};
pub use target::TargetPattern;
pub use validate::apply_ranges;

use tracing::{debug, info};

use crate::config::{PachiConfig, StrategyKind};
use crate::error::ConfigError;
use crate::ocr::OcrDocument;

/// A strategy that turns an OCR document into field values.
///
/// Extraction never fails: fields that cannot be determined are simply
/// absent from the result.
pub trait Extractor: Send + Sync {
    /// Strategy name recorded in the debug payload.
    fn name(&self) -> &str;

    /// Extract fields from a document.
    fn extract(&self, document: &OcrDocument) -> ExtractionResult;

    /// Extract fields from plain text.
    fn extract_text(&self, text: &str) -> ExtractionResult {
        self.extract(&OcrDocument::from_text(text))
    }
}

/// Runs several strategies; a field resolved by an earlier member wins.
pub struct ExtractorChain {
    members: Vec<Box<dyn Extractor>>,
}

impl ExtractorChain {
    pub fn new(members: Vec<Box<dyn Extractor>>) -> Self {
        Self { members }
    }

    /// Append a strategy at the lowest priority.
    pub fn with(mut self, member: Box<dyn Extractor>) -> Self {
        self.members.push(member);
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn label(&self) -> String {
        let names: Vec<&str> = self.members.iter().map(|m| m.name()).collect();
        format!("chain({})", names.join(","))
    }
}

impl Extractor for ExtractorChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn extract(&self, document: &OcrDocument) -> ExtractionResult {
        let mut merged = ExtractionResult::empty(&self.label());
        merged.debug.token_count = document.tokens.len();

        for member in &self.members {
            let result = member.extract(document);
            let name = member.name().to_string();
            debug!(
                "Strategy {} resolved {} fields",
                name,
                result.extracted_values.len()
            );

            for (field, value) in result.extracted_values {
                if !merged.extracted_values.contains_key(&field) {
                    merged.debug.sources.insert(field.clone(), name.clone());
                    merged.extracted_values.insert(field, value);
                }
            }

            let debug_info = result.debug;
            merged.debug.number_count = merged.debug.number_count.max(debug_info.number_count);
            if merged.debug.normalized_text.is_empty() {
                merged.debug.normalized_text = debug_info.normalized_text;
                merged.debug.text_truncated = debug_info.text_truncated;
            }
            for (keyword, offset) in debug_info.anchors {
                merged.debug.anchors.entry(keyword).or_insert(offset);
            }
            merged.debug.windows.extend(debug_info.windows);
            merged.debug.dropped.extend(debug_info.dropped);
            if merged.debug.grid.is_none() {
                merged.debug.grid = debug_info.grid;
            }
        }

        // A value one member dropped may have been supplied by another.
        merged
            .debug
            .dropped
            .retain(|d| !merged.extracted_values.contains_key(&d.field));

        info!(
            "Chained extraction resolved {} fields",
            merged.extracted_values.len()
        );

        merged
    }
}

/// Build the extractor for a strategy.
pub fn build_extractor(
    config: &PachiConfig,
    kind: StrategyKind,
) -> Result<Box<dyn Extractor>, ConfigError> {
    match kind {
        StrategyKind::Keyword => Ok(Box::new(KeywordExtractor::new(config)?)),
        StrategyKind::Grid => Ok(Box::new(GridExtractor::new(config)?)),
        StrategyKind::Chain => {
            let mut chain = ExtractorChain::new(Vec::new());
            for member in &config.extraction.chain {
                if *member == StrategyKind::Chain {
                    return Err(ConfigError::NestedChain(member.to_string()));
                }
                chain = chain.with(build_extractor(config, *member)?);
            }
            Ok(Box::new(chain))
        }
    }
}

/// Build the extractor named by `config.extraction.strategy`.
pub fn extractor_from_config(config: &PachiConfig) -> Result<Box<dyn Extractor>, ConfigError> {
    build_extractor(config, config.extraction.strategy)
}

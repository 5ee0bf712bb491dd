//! Core library for pachinko data-display OCR.
//!
//! This crate provides:
//! - Text normalization and numeric token scanning for Japanese OCR output
//! - Field extraction anchored on display labels, or by grid position
//! - Range validation with a debug trail for every dropped value
//! - Daily history totals (today through six days ago) and win/start odds

pub mod aggregate;
pub mod config;
pub mod error;
pub mod extract;
pub mod ocr;
pub mod text;

pub use aggregate::{
    parse_daily_history, summarize_pair, AggregateSource, DailyTotal, DayCount, HistoryParser,
    PairSummary,
};
pub use config::{
    AggregationConfig, AnchorRule, Direction, ExtractionConfig, FieldRange, FieldSpec, FieldTable,
    GridCell, GridConfig, Occurrence, PachiConfig, StrategyKind, TargetRule,
};
pub use error::{ConfigError, PachiError, Result};
pub use extract::{
    build_extractor, extractor_from_config, ExtractionDebug, ExtractionResult, Extractor,
    ExtractorChain, GridExtractor, KeywordExtractor,
};
pub use ocr::{OcrDocument, Polygon, Token, Vertex};

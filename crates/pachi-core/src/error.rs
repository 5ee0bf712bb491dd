//! Error types for the pachi-core library.
//!
//! Extraction itself degrades to partial or empty results and never returns
//! these; they surface only while loading configuration or decoding OCR
//! payloads.

use thiserror::Error;

/// Main error type for the pachi library.
#[derive(Error, Debug)]
pub enum PachiError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// OCR payload could not be understood.
    #[error("OCR input error: {0}")]
    Ocr(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors found while validating a field table or grid layout.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A window needs at least one token.
    #[error("window for {field} anchored at '{keyword}' has zero size")]
    EmptyWindow { field: String, keyword: String },

    /// Window offset does not fit in the window.
    #[error("offset {offset} of {field} is outside window of size {window_size}")]
    OffsetOutOfWindow {
        field: String,
        offset: usize,
        window_size: usize,
    },

    /// Two fields claim the same slot of one window.
    #[error("fields {first} and {second} share offset {offset} of window '{keyword}'")]
    DuplicateOffset {
        keyword: String,
        offset: usize,
        first: String,
        second: String,
    },

    /// Range minimum is above its maximum.
    #[error("range for {field} is inverted: {min} > {max}")]
    InvertedRange { field: String, min: u64, max: u64 },

    /// A grid cell lies outside the configured grid.
    #[error("grid cell ({row}, {col}) of {field} is outside a {rows}x{cols} grid")]
    CellOutOfGrid {
        field: String,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// Grid has no rows or columns.
    #[error("grid must have at least one row and one column")]
    EmptyGrid,

    /// Anchor keyword is empty.
    #[error("empty keyword for {0}")]
    EmptyKeyword(String),

    /// A chain lists another chain among its members.
    #[error("strategy chain cannot contain '{0}'")]
    NestedChain(String),

    /// Label could not be turned into a pattern.
    #[error("invalid label pattern '{label}': {reason}")]
    Pattern { label: String, reason: String },
}

/// Result type for the pachi library.
pub type Result<T> = std::result::Result<T, PachiError>;

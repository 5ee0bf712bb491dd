//! Text preparation: normalization and numeric token scanning.
//!
//! Every offset used by the keyword extractor refers to the normalized
//! string, so [`normalize`] must run before [`scan_numbers`] and before any
//! keyword lookup.

mod normalize;
mod scanner;

pub use normalize::{is_dash, normalize, DASH_CHARS};
pub use scanner::{scan_numbers, DigitLabels, NumericSequence, NumericToken};

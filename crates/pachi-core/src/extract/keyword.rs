//! Keyword-anchored extraction over the flattened text.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::anchor::locate;
use super::result::{truncate_chars, ExtractionDebug, ExtractionResult, WindowDebug};
use super::target::TargetPattern;
use super::validate::apply_ranges;
use super::Extractor;
use crate::config::{Direction, FieldTable, PachiConfig, WindowGroup};
use crate::error::ConfigError;
use crate::ocr::OcrDocument;
use crate::text::{normalize, scan_numbers, DigitLabels, NumericSequence, NumericToken};

/// Extracts fields from numbers found next to known labels.
///
/// Geometry is ignored; only the text matters. Each window is cut from the
/// full numeric sequence, so one printed value may serve two windows.
#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    table: FieldTable,
    windows: Vec<WindowGroup>,
    target: Option<TargetPattern>,
    labels: DigitLabels,
    debug_text_limit: usize,
}

impl KeywordExtractor {
    pub const NAME: &'static str = "keyword";

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
            windows: config.fields.windows(),
            labels: DigitLabels::new(config.fields.labels()),
            table: config.fields.clone(),
            target,
            debug_text_limit: config.extraction.debug_text_limit,
        })
    }

    /// Extract from already normalized text.
    fn extract_normalized(&self, normalized: &str, token_count: usize) -> ExtractionResult {
        let numbers = scan_numbers(normalized, &self.labels);
        let (normalized_text, text_truncated) = truncate_chars(normalized, self.debug_text_limit);

        let mut debug_info = ExtractionDebug {
            strategy: Self::NAME.to_string(),
            token_count,
            number_count: numbers.len(),
            normalized_text,
            text_truncated,
            ..ExtractionDebug::default()
        };

        let mut values = BTreeMap::new();

        if let Some(target) = &self.target {
            match target.find(normalized) {
                Some(value) => {
                    values.insert(target.field().to_string(), value);
                }
                None => debug!("Target label for {} not found", target.field()),
            }
        }

        for group in &self.windows {
            let outcome = resolve_window(normalized, &numbers, group);

            debug_info
                .anchors
                .insert(group.key.keyword.clone(), outcome.anchor);
            debug_info.windows.push(WindowDebug {
                keyword: group.key.keyword.clone(),
                direction: group.key.direction,
                window_size: group.key.window_size,
                available: outcome.tokens.len(),
                resolved: outcome.resolved,
                fields: group.slots.iter().map(|(_, field)| field.clone()).collect(),
            });

            if !outcome.resolved {
                continue;
            }

            for (offset, field) in &group.slots {
                values
                    .entry(field.clone())
                    .or_insert(outcome.tokens[*offset].value);
            }
        }

        debug_info.dropped = apply_ranges(&mut values, &self.table);

        info!(
            "Keyword extraction resolved {} fields from {} numbers",
            values.len(),
            numbers.len()
        );

        ExtractionResult {
            extracted_values: values,
            debug: debug_info,
        }
    }
}

struct WindowOutcome<'a> {
    anchor: Option<usize>,
    tokens: &'a [NumericToken],
    resolved: bool,
}

/// Cut one window out of the numeric sequence. A window holding fewer
/// tokens than its size is unresolved as a whole.
fn resolve_window<'a>(
    text: &str,
    numbers: &'a NumericSequence,
    group: &WindowGroup,
) -> WindowOutcome<'a> {
    let key = &group.key;
    let anchor = locate(text, &key.keyword, key.occurrence);

    let (Some(start), Some(end)) = (anchor.offset, anchor.end()) else {
        debug!("Anchor '{}' not found, skipping its window", key.keyword);
        return WindowOutcome {
            anchor: None,
            tokens: &[],
            resolved: false,
        };
    };

    let tokens = match key.direction {
        Direction::Before => numbers.before(start, key.window_size),
        Direction::After => {
            let point = if key.skip_suffix {
                suffix_end(text, numbers, end).unwrap_or(end)
            } else {
                end
            };
            numbers.after(point, key.window_size)
        }
    };

    let resolved = tokens.len() == key.window_size;
    if !resolved {
        debug!(
            "Window at '{}' needs {} numbers, found {}",
            key.keyword,
            key.window_size,
            tokens.len()
        );
    }

    WindowOutcome {
        anchor: Some(start),
        tokens,
        resolved,
    }
}

/// End of a number separated from the label only by spaces.
fn suffix_end(text: &str, numbers: &NumericSequence, label_end: usize) -> Option<usize> {
    let next = numbers.after(label_end, 1).first()?;
    let gap = text.get(label_end..next.source_index)?;
    gap.trim().is_empty().then_some(next.end_index)
}

impl Extractor for KeywordExtractor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn extract(&self, document: &OcrDocument) -> ExtractionResult {
        let text = document.full_text();
        info!("Keyword extraction over {} characters of text", text.len());

        let normalized = normalize(&text);
        if normalized.is_empty() {
            let mut result = ExtractionResult::empty(Self::NAME);
            result.debug.token_count = document.tokens.len();
            return result;
        }

        self.extract_normalized(&normalized, document.tokens.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnchorRule, FieldSpec, Occurrence};
    use pretty_assertions::assert_eq;

    fn extractor(table: FieldTable) -> KeywordExtractor {
        let config = PachiConfig {
            fields: table,
            ..PachiConfig::default()
        };
        KeywordExtractor::new(&config).unwrap()
    }

    fn window_table(keyword: &str, direction: Direction, fields: &[&str]) -> FieldTable {
        fields
            .iter()
            .enumerate()
            .fold(FieldTable::empty(), |table, (offset, field)| {
                table.with_field(
                    field,
                    FieldSpec::default().with_anchor(AnchorRule::new(
                        keyword,
                        direction,
                        offset,
                        fields.len(),
                    )),
                )
            })
    }

    fn values(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_target_and_first_window() {
        let extractor = KeywordExtractor::new(&PachiConfig::default()).unwrap();
        let result = extractor.extract_text("対象ゲーム数 120 打込 5 2穴 10 リプレイ 3 リプ 2 羽根拾 8");

        assert_eq!(
            result.extracted_values,
            values(&[("A", 5), ("B", 10), ("C", 3), ("D", 2), ("X", 120)])
        );
        assert_eq!(result.debug.strategy, "keyword");
        assert_eq!(result.debug.number_count, 6);

        // The 羽根拾 window only sees one number.
        let short = result
            .debug
            .windows
            .iter()
            .find(|w| w.keyword == "羽根拾")
            .unwrap();
        assert!(!short.resolved);
        assert_eq!(short.available, 1);
    }

    #[test]
    fn test_multiline_ocr_text() {
        let extractor = KeywordExtractor::new(&PachiConfig::default()).unwrap();
        let text = "データ\n対象ゲーム数\n120\n打込 5\n2穴 10\nリプレイ －\nリプ→V 2\n\
                    羽根拾 8\nV入賞 1\nSP 4\nSP→V ―\n拾い→蹴り 6\n当大 1\n当中 0\n当小 3\n2穴二回目 2";
        let result = extractor.extract_text(text);

        assert_eq!(
            result.extracted_values,
            values(&[
                ("A", 5),
                ("B", 10),
                ("C", 0),
                ("D", 2),
                ("E", 8),
                ("F", 1),
                ("G", 4),
                ("H", 0),
                ("I", 6),
                ("J", 1),
                ("K", 0),
                ("L", 3),
                ("M", 2),
                ("X", 120),
            ])
        );
        assert!(result.debug.windows.iter().all(|w| w.resolved));
    }

    #[test]
    fn test_value_glued_to_next_label() {
        let extractor = KeywordExtractor::new(&PachiConfig::default()).unwrap();
        let result = extractor.extract_text(
            "対象ゲーム数 120 打込 5 2穴 10リプレイ 3 リプ→V 2 羽根拾 8 V入賞 1",
        );

        assert_eq!(
            result.extracted_values,
            values(&[("A", 5), ("B", 10), ("C", 3), ("D", 2), ("X", 120)])
        );
    }

    #[test]
    fn test_value_glued_to_digit_label() {
        let extractor = KeywordExtractor::new(&PachiConfig::default()).unwrap();
        let result = extractor.extract_text("対象ゲーム数 120 打込 52穴 10 リプレイ 3 リプ→V 2");

        assert_eq!(result.get("A"), Some(5));
        assert_eq!(result.get("B"), Some(10));
    }

    #[test]
    fn test_short_window_resolves_nothing() {
        let table = window_table("K", Direction::Before, &["A", "B", "C", "D"]);
        let result = extractor(table).extract_text("7 8 9 K 1 2 3 4");

        assert!(result.is_empty());
        assert_eq!(result.debug.windows[0].available, 3);
        assert!(!result.debug.windows[0].resolved);
    }

    #[test]
    fn test_before_window_takes_nearest() {
        let table = window_table("K", Direction::Before, &["A", "B"]);
        let result = extractor(table).extract_text("1 2 3 K 4");
        assert_eq!(result.extracted_values, values(&[("A", 2), ("B", 3)]));
    }

    #[test]
    fn test_windows_may_share_tokens() {
        let table = window_table("KA", Direction::Before, &["A", "B"])
            .with_field(
                "C",
                FieldSpec::default().with_anchor(AnchorRule::new("KB", Direction::Before, 0, 3)),
            )
            .with_field(
                "D",
                FieldSpec::default().with_anchor(AnchorRule::new("KB", Direction::Before, 2, 3)),
            );
        let result = extractor(table).extract_text("1 2 3 KA KB");

        assert_eq!(
            result.extracted_values,
            values(&[("A", 2), ("B", 3), ("C", 1), ("D", 3)])
        );
    }

    #[test]
    fn test_after_window_without_suffix_skip() {
        let table = FieldTable::empty()
            .with_field(
                "E",
                FieldSpec::default().with_anchor(
                    AnchorRule::new("羽根拾", Direction::After, 0, 2).with_skip_suffix(false),
                ),
            )
            .with_field(
                "F",
                FieldSpec::default().with_anchor(
                    AnchorRule::new("羽根拾", Direction::After, 1, 2).with_skip_suffix(false),
                ),
            );
        let result = extractor(table).extract_text("羽根拾 8 V入賞 1");
        assert_eq!(result.extracted_values, values(&[("E", 8), ("F", 1)]));
    }

    #[test]
    fn test_suffix_skip_needs_adjacent_number() {
        let table = window_table("総数", Direction::After, &["A"]);
        let extractor = extractor(table);

        assert_eq!(extractor.extract_text("総数 50 打込 5").get("A"), Some(5));
        // No number right behind the label: nothing to skip.
        assert_eq!(extractor.extract_text("総数 打込 5").get("A"), Some(5));
    }

    #[test]
    fn test_last_occurrence_policy() {
        let table = FieldTable::empty().with_field(
            "A",
            FieldSpec::default().with_anchor(
                AnchorRule::new("K", Direction::Before, 0, 1).with_occurrence(Occurrence::Last),
            ),
        );
        let result = extractor(table).extract_text("1 K 2 K");
        assert_eq!(result.get("A"), Some(2));
    }

    #[test]
    fn test_missing_anchor_is_not_an_error() {
        let table = window_table("K", Direction::After, &["A"]);
        let result = extractor(table).extract_text("1 2 3");

        assert!(result.is_empty());
        assert_eq!(result.debug.anchors.get("K"), Some(&None));
        assert_eq!(result.debug.number_count, 3);
    }

    #[test]
    fn test_out_of_range_values_dropped() {
        let extractor = KeywordExtractor::new(&PachiConfig::default()).unwrap();
        let result = extractor.extract_text("対象ゲーム数 120 打込 20240101 2穴 1 リプレイ 2 リプ 3");

        assert_eq!(result.get("A"), None);
        assert_eq!(result.get("B"), Some(1));
        assert_eq!(result.debug.dropped.len(), 1);
        assert_eq!(result.debug.dropped[0].field, "A");
    }

    #[test]
    fn test_values_always_within_ranges() {
        let config = PachiConfig::default();
        let extractor = KeywordExtractor::new(&config).unwrap();
        let samples = [
            "対象ゲーム数 0 打込 99999 2穴 1 リプレイ 2 リプ 3",
            "対象ゲーム数 120000 羽根拾 1 2 3 10000",
            "2穴二回目 123456789",
            "拾い→蹴り － － 9999 10000",
        ];

        for text in samples {
            let result = extractor.extract_text(text);
            for (field, value) in &result.extracted_values {
                if let Some(range) = config.fields.range(field) {
                    assert!(range.contains(*value), "{}={} in {:?}", field, value, text);
                }
            }
        }
    }

    #[test]
    fn test_empty_input() {
        let extractor = KeywordExtractor::new(&PachiConfig::default()).unwrap();

        for text in ["", "   \n\t"] {
            let result = extractor.extract_text(text);
            assert!(result.is_empty());
            assert_eq!(result.debug.number_count, 0);
            assert_eq!(result.debug.token_count, 0);
        }
    }

    #[test]
    fn test_debug_text_is_truncated() {
        let mut config = PachiConfig::default();
        config.extraction.debug_text_limit = 6;
        let extractor = KeywordExtractor::new(&config).unwrap();

        let result = extractor.extract_text("対象ゲーム数 120");
        assert_eq!(result.debug.normalized_text, "対象ゲーム数");
        assert!(result.debug.text_truncated);
    }
}

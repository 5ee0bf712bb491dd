//! Numeric token scanner.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::trace;

use super::normalize;

lazy_static! {
    /// Digit runs, or a single dash (read as zero).
    static ref NUMERIC_RUN: Regex = Regex::new(
        r"[0-9]+|[\-\x{FF0D}\x{2010}-\x{2015}\x{2212}\x{2500}\x{FE63}]"
    ).unwrap();

    /// Day labels of history screens (`3日前`).
    static ref DAY_LABEL: Regex = Regex::new(r"^[0-9]+日前").unwrap();
}

/// A numeric candidate found in the normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumericToken {
    /// Parsed value; a dash reads as 0.
    pub value: u64,
    /// Byte offset of the first character in the normalized text.
    pub source_index: usize,
    /// Byte offset just past the last character.
    pub end_index: usize,
    /// Matched text.
    pub text: String,
}

/// Labels whose printed text starts with digits (`2穴`, `2穴二回目`).
///
/// Digits that begin one of these labels are not values. Day labels
/// (`3日前`) are always recognized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigitLabels {
    labels: Vec<String>,
}

impl DigitLabels {
    /// Keep the labels that start with a digit once normalized.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut labels: Vec<String> = labels
            .into_iter()
            .map(|l| normalize(l.as_ref()))
            .filter(|l| l.starts_with(|c: char| c.is_ascii_digit()))
            .collect();
        labels.sort();
        labels.dedup();
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Where the value part of a digit run ends: the run start if the whole
    /// run begins a label, the start of a label glued to its tail
    /// (`52穴` reads as 5), or the run end.
    fn value_end(&self, text: &str, start: usize, end: usize) -> usize {
        if DAY_LABEL.is_match(&text[start..]) {
            return start;
        }
        (start..end)
            .find(|&split| self.labels.iter().any(|l| text[split..].starts_with(l.as_str())))
            .unwrap_or(end)
    }
}

/// Scan text left to right for numeric tokens.
///
/// Digit runs are taken whole unless digits at their start or tail begin
/// one of `labels`; those digits belong to the label and are skipped. Runs
/// too long for `u64` are skipped too.
pub fn scan_numbers(text: &str, labels: &DigitLabels) -> NumericSequence {
    let mut tokens = Vec::new();

    for m in NUMERIC_RUN.find_iter(text) {
        let matched = m.as_str();
        let is_dash = !matched.starts_with(|c: char| c.is_ascii_digit());

        let end = if is_dash {
            m.end()
        } else {
            labels.value_end(text, m.start(), m.end())
        };
        if end == m.start() {
            trace!("Skipping label digits '{}' at {}", matched, m.start());
            continue;
        }
        let matched = &text[m.start()..end];

        let value = if is_dash {
            0
        } else {
            match matched.parse::<u64>() {
                Ok(value) => value,
                Err(_) => {
                    trace!("Skipping oversized number at {}", m.start());
                    continue;
                }
            }
        };

        tokens.push(NumericToken {
            value,
            source_index: m.start(),
            end_index: end,
            text: matched.to_string(),
        });
    }

    NumericSequence { tokens }
}

/// Document-ordered numeric tokens of one text.
///
/// Read-only once scanned; any number of windows can be cut from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumericSequence {
    tokens: Vec<NumericToken>,
}

impl NumericSequence {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NumericToken> {
        self.tokens.iter()
    }

    pub fn as_slice(&self) -> &[NumericToken] {
        &self.tokens
    }

    /// Token starting exactly at `offset`, if any.
    pub fn starting_at(&self, offset: usize) -> Option<&NumericToken> {
        self.tokens.iter().find(|t| t.source_index == offset)
    }

    /// Up to `count` tokens strictly before `offset`, nearest last.
    pub fn before(&self, offset: usize, count: usize) -> &[NumericToken] {
        let end = self.tokens.partition_point(|t| t.source_index < offset);
        &self.tokens[end.saturating_sub(count)..end]
    }

    /// Up to `count` tokens at or after `offset`, nearest first.
    pub fn after(&self, offset: usize, count: usize) -> &[NumericToken] {
        let start = self.tokens.partition_point(|t| t.source_index < offset);
        let end = (start + count).min(self.tokens.len());
        &self.tokens[start..end]
    }
}

impl<'a> IntoIterator for &'a NumericSequence {
    type Item = &'a NumericToken;
    type IntoIter = std::slice::Iter<'a, NumericToken>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::normalize;

    fn display_labels() -> DigitLabels {
        DigitLabels::new(["対象ゲーム数", "打込", "2穴", "2穴二回目", "リプレイ"])
    }

    fn values(seq: &NumericSequence) -> Vec<u64> {
        seq.iter().map(|t| t.value).collect()
    }

    #[test]
    fn test_scan_in_document_order() {
        let seq = scan_numbers("対象ゲーム数 120 打込 5 2穴 10 リプレイ 3", &display_labels());
        assert_eq!(values(&seq), vec![120, 5, 10, 3]);

        let offsets: Vec<usize> = seq.iter().map(|t| t.source_index).collect();
        let mut sorted = offsets.clone();
        sorted.sort_unstable();
        assert_eq!(offsets, sorted);
    }

    #[test]
    fn test_only_digit_labels_are_kept() {
        let labels = display_labels();
        assert_eq!(labels.len(), 2);
        assert!(DigitLabels::default().is_empty());
        assert_eq!(DigitLabels::new(["２穴"]), DigitLabels::new(["2穴"]));
    }

    #[test]
    fn test_label_digits_are_skipped() {
        let seq = scan_numbers("2穴 7 3日前 0 2穴二回目 4", &display_labels());
        assert_eq!(values(&seq), vec![7, 0, 4]);
    }

    #[test]
    fn test_value_glued_to_label_is_kept() {
        let seq = scan_numbers("2穴 10リプレイ 3 5回", &display_labels());
        assert_eq!(values(&seq), vec![10, 3, 5]);
        assert_eq!(seq.as_slice()[0].text, "10");
    }

    #[test]
    fn test_value_glued_before_digit_label() {
        let text = "打込 52穴 10";
        let seq = scan_numbers(text, &display_labels());
        assert_eq!(values(&seq), vec![5, 10]);

        let first = &seq.as_slice()[0];
        assert_eq!(&text[first.source_index..first.end_index], "5");
    }

    #[test]
    fn test_without_labels_runs_are_whole() {
        let seq = scan_numbers("2穴 7 12回 3日前 8", &DigitLabels::default());
        assert_eq!(values(&seq), vec![2, 7, 12, 8]);
    }

    #[test]
    fn test_digits_before_latin_are_kept() {
        let seq = scan_numbers("120G 打込5", &display_labels());
        assert_eq!(values(&seq), vec![120, 5]);
    }

    #[test]
    fn test_dash_reads_as_zero() {
        let labels = DigitLabels::default();
        let seq = scan_numbers("SP — 4", &labels);
        assert_eq!(values(&seq), vec![0, 4]);
        assert_eq!(seq.as_slice()[0].text, "—");

        let normalized = normalize("3日前－");
        let seq = scan_numbers(&normalized, &labels);
        assert_eq!(values(&seq), vec![0]);
        assert_eq!(&normalized[seq.as_slice()[0].source_index..], "0");
    }

    #[test]
    fn test_oversized_number_skipped() {
        let seq = scan_numbers("99999999999999999999999 5", &DigitLabels::default());
        assert_eq!(values(&seq), vec![5]);
    }

    #[test]
    fn test_windows() {
        let text = "1 2 K 3 4 5";
        let seq = scan_numbers(text, &DigitLabels::default());
        let anchor = text.find('K').unwrap();

        let before: Vec<u64> = seq.before(anchor, 4).iter().map(|t| t.value).collect();
        assert_eq!(before, vec![1, 2]);

        let before: Vec<u64> = seq.before(anchor, 1).iter().map(|t| t.value).collect();
        assert_eq!(before, vec![2]);

        let after: Vec<u64> = seq.after(anchor, 2).iter().map(|t| t.value).collect();
        assert_eq!(after, vec![3, 4]);

        // The same sequence serves any number of windows.
        assert_eq!(seq.after(0, 10).len(), 5);
        assert_eq!(seq.len(), 5);
    }

    #[test]
    fn test_empty() {
        let seq = scan_numbers("", &DigitLabels::default());
        assert!(seq.is_empty());
        assert!(seq.before(10, 3).is_empty());
        assert!(seq.after(0, 3).is_empty());
    }
}

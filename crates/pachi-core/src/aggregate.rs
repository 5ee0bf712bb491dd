//! Rolling daily history totals.
//!
//! History screens list one count per day: today, then "1日前" through
//! "6日前". A screen is summed line by line when the day labels are legible,
//! and degrades to summing every plausible number when none are.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AggregationConfig;
use crate::error::ConfigError;
use crate::text::{normalize, scan_numbers, DigitLabels};

/// How a total was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateSource {
    /// Summed from recognized day lines.
    Lines,
    /// No day line was recognized; every plausible number was summed.
    Fallback,
}

impl AggregateSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, AggregateSource::Fallback)
    }
}

/// Count for one day of the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCount {
    pub label: String,
    pub value: u64,
}

/// Total of one history screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTotal {
    pub total: u64,
    /// Days in canonical order, today first. Empty for a fallback total.
    pub details: Vec<DayCount>,
    pub source: AggregateSource,
}

/// Wins and starts from a pair of history screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSummary {
    pub wins: DailyTotal,
    pub starts: DailyTotal,
    pub total_wins: u64,
    pub total_starts: u64,
    /// Starts per win; `None` when there were no wins.
    pub starts_per_win: Option<f64>,
    /// Which input (0 or 1) was read as the wins screen.
    pub wins_input: usize,
}

impl PairSummary {
    /// Odds as displayed on the floor, e.g. `1/123.4`.
    pub fn odds_text(&self) -> String {
        match self.starts_per_win {
            Some(ratio) => format!("1/{:.1}", ratio),
            None => "計算不能".to_string(),
        }
    }
}

/// Day position in the canonical order; today is 0.
type DayIndex = u32;

/// Parser for daily history screens.
#[derive(Debug, Clone)]
pub struct HistoryParser {
    line: Regex,
    today_labels: Vec<String>,
    today_canonical: String,
    max_days_ago: u32,
    fallback_upper_bound: u64,
}

impl HistoryParser {
    /// Build a parser for the configured day labels.
    pub fn new(config: &AggregationConfig) -> Result<Self, ConfigError> {
        let mut alternatives: Vec<String> = config
            .today_labels
            .iter()
            .filter(|l| !l.is_empty())
            .map(|l| regex::escape(l))
            .collect();
        alternatives.push("[0-9]+日前".to_string());

        let pattern = format!(r"({})\s*([0-9]+)", alternatives.join("|"));
        let line = Regex::new(&pattern).map_err(|e| ConfigError::Pattern {
            label: pattern.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            line,
            today_labels: config.today_labels.clone(),
            today_canonical: config.today_canonical.clone(),
            max_days_ago: config.max_days_ago,
            fallback_upper_bound: config.fallback_upper_bound,
        })
    }

    fn day_index(&self, label: &str) -> Option<DayIndex> {
        if self.today_labels.iter().any(|l| l == label) {
            return Some(0);
        }

        let days = label.strip_suffix("日前")?.parse::<u32>().ok()?;
        (1..=self.max_days_ago).contains(&days).then_some(days)
    }

    fn day_label(&self, index: DayIndex) -> String {
        if index == 0 {
            self.today_canonical.clone()
        } else {
            format!("{}日前", index)
        }
    }

    /// Sum one history screen.
    pub fn parse(&self, text: &str) -> DailyTotal {
        let mut days: BTreeMap<DayIndex, u64> = BTreeMap::new();

        for line in text.lines() {
            let line = normalize(line);
            for caps in self.line.captures_iter(&line) {
                let Some(index) = self.day_index(&caps[1]) else {
                    debug!("Ignoring day label '{}'", &caps[1]);
                    continue;
                };
                let Ok(value) = caps[2].parse::<u64>() else {
                    continue;
                };

                if days.contains_key(&index) {
                    debug!("Duplicate entry for '{}' ignored", &caps[1]);
                } else {
                    days.insert(index, value);
                }
            }
        }

        if days.is_empty() {
            return self.fallback(text);
        }

        // A total past u64 can only come from misread digits.
        let Some(total) = days.values().try_fold(0u64, |sum, &v| sum.checked_add(v)) else {
            warn!("Day counts overflow, treating the screen as unreadable");
            return self.fallback(text);
        };

        let details: Vec<DayCount> = days
            .into_iter()
            .map(|(index, value)| DayCount {
                label: self.day_label(index),
                value,
            })
            .collect();

        info!("Daily history: {} days, total {}", details.len(), total);

        DailyTotal {
            total,
            details,
            source: AggregateSource::Lines,
        }
    }

    /// Sum every number strictly between 0 and the plausibility bound.
    ///
    /// Digits glued to a unit (`5回`) still count; only day labels are
    /// skipped.
    fn fallback(&self, text: &str) -> DailyTotal {
        let normalized = normalize(text);
        let total = scan_numbers(&normalized, &DigitLabels::default())
            .iter()
            .map(|t| t.value)
            .filter(|&v| v > 0 && v < self.fallback_upper_bound)
            .fold(0u64, u64::saturating_add);

        warn!("No day lines recognized, fallback total {}", total);

        DailyTotal {
            total,
            details: Vec::new(),
            source: AggregateSource::Fallback,
        }
    }

    /// True if the text is from the jackpot (wins) screen.
    pub fn is_wins_screen(text: &str, config: &AggregationConfig) -> bool {
        config
            .jackpot_keywords
            .iter()
            .any(|k| !k.is_empty() && text.contains(k.as_str()))
    }
}

/// Sum one history screen with the given settings.
pub fn parse_daily_history(text: &str, config: &AggregationConfig) -> Result<DailyTotal, ConfigError> {
    Ok(HistoryParser::new(config)?.parse(text))
}

/// Sum two history screens and relate wins to starts.
///
/// The screen mentioning a jackpot keyword holds wins; if the first does
/// not, the second is taken as the wins screen.
pub fn summarize_pair(
    first: &str,
    second: &str,
    config: &AggregationConfig,
) -> Result<PairSummary, ConfigError> {
    let parser = HistoryParser::new(config)?;

    let wins_input = if HistoryParser::is_wins_screen(first, config) { 0 } else { 1 };
    let (wins_text, starts_text) = if wins_input == 0 {
        (first, second)
    } else {
        (second, first)
    };

    let wins = parser.parse(wins_text);
    let starts = parser.parse(starts_text);

    let starts_per_win = (wins.total > 0).then(|| starts.total as f64 / wins.total as f64);

    Ok(PairSummary {
        total_wins: wins.total,
        total_starts: starts.total,
        wins,
        starts,
        starts_per_win,
        wins_input,
    })
}

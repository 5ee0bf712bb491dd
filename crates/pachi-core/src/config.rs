//! Configuration structures for field extraction.
//!
//! Everything that changes between display layouts lives here: which
//! keywords anchor which fields, which grid cell a field occupies, and the
//! plausible range of each value. The table is loaded once and shared by
//! every extractor.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration for the pachi pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PachiConfig {
    /// Strategy selection and debug output.
    pub extraction: ExtractionConfig,

    /// Field rules and ranges.
    pub fields: FieldTable,

    /// Grid geometry for the positional strategy.
    pub grid: GridConfig,

    /// Daily history aggregation.
    pub aggregation: AggregationConfig,
}

impl PachiConfig {
    /// Load configuration from a JSON file and validate it.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check the field table against itself and against the grid.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.grid.validate()?;
        self.fields.validate(&self.grid)
    }
}

/// Which extractor implementation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Keyword-anchored windows over the normalized text.
    Keyword,
    /// Grid cells over token geometry.
    Grid,
    /// Several strategies in order, earlier ones winning per field.
    Chain,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Keyword => "keyword",
            StrategyKind::Grid => "grid",
            StrategyKind::Chain => "chain",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Strategy used when the caller does not pick one.
    pub strategy: StrategyKind,

    /// Members of the chain strategy, in priority order.
    pub chain: Vec<StrategyKind>,

    /// Characters of normalized text kept in the debug payload.
    pub debug_text_limit: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Keyword,
            chain: vec![StrategyKind::Keyword, StrategyKind::Grid],
            debug_text_limit: 200,
        }
    }
}

/// Which side of the anchor a window is cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Before,
    After,
}

/// Which occurrence of a keyword anchors the window.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Occurrence {
    #[default]
    First,
    Last,
}

fn default_true() -> bool {
    true
}

/// Anchor-relative rule for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRule {
    /// Literal label searched in the normalized text.
    pub keyword: String,
    /// Side of the anchor the window is taken from.
    pub direction: Direction,
    /// 0-based position of this field inside the window.
    pub offset: usize,
    /// Number of tokens the window must hold.
    pub window_size: usize,
    #[serde(default)]
    pub occurrence: Occurrence,
    /// For `after` windows, skip a number printed right behind the label.
    #[serde(default = "default_true")]
    pub skip_suffix: bool,
}

impl AnchorRule {
    pub fn new(keyword: &str, direction: Direction, offset: usize, window_size: usize) -> Self {
        Self {
            keyword: keyword.to_string(),
            direction,
            offset,
            window_size,
            occurrence: Occurrence::First,
            skip_suffix: true,
        }
    }

    pub fn with_skip_suffix(mut self, skip: bool) -> Self {
        self.skip_suffix = skip;
        self
    }

    pub fn with_occurrence(mut self, occurrence: Occurrence) -> Self {
        self.occurrence = occurrence;
        self
    }

    fn window_key(&self) -> WindowKey {
        WindowKey {
            keyword: self.keyword.clone(),
            direction: self.direction,
            window_size: self.window_size,
            occurrence: self.occurrence,
            skip_suffix: self.skip_suffix,
        }
    }
}

/// Row and column of a grid cell, 0-based, below the top margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
}

impl GridCell {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Inclusive range of plausible values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRange {
    pub min: u64,
    pub max: u64,
}

impl FieldRange {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: u64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Rules for one field. A field may carry rules for several strategies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSpec {
    /// Human-readable label as printed on the display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridCell>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<AnchorRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<FieldRange>,
}

impl FieldSpec {
    pub fn labeled(label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
            ..Self::default()
        }
    }

    pub fn with_grid(mut self, row: usize, col: usize) -> Self {
        self.grid = Some(GridCell::new(row, col));
        self
    }

    pub fn with_anchor(mut self, rule: AnchorRule) -> Self {
        self.anchor = Some(rule);
        self
    }

    pub fn with_range(mut self, min: u64, max: u64) -> Self {
        self.range = Some(FieldRange::new(min, max));
        self
    }
}

/// The one field read as "label immediately followed by its value".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRule {
    pub field: String,
    pub label: String,
}

/// Identity of a window: every field sharing it is resolved together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowKey {
    pub keyword: String,
    pub direction: Direction,
    pub window_size: usize,
    pub occurrence: Occurrence,
    pub skip_suffix: bool,
}

/// A window with the fields mapped onto its positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowGroup {
    pub key: WindowKey,
    /// `(offset, field_id)`, sorted by offset.
    pub slots: Vec<(usize, String)>,
}

/// Declarative field table shared by all strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldTable {
    /// Label+number rule, applied by every strategy.
    pub target: Option<TargetRule>,

    /// Field id to rules.
    pub fields: BTreeMap<String, FieldSpec>,
}

impl FieldTable {
    /// Empty table, no target rule.
    pub fn empty() -> Self {
        Self {
            target: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_target(mut self, field: &str, label: &str) -> Self {
        self.target = Some(TargetRule {
            field: field.to_string(),
            label: label.to_string(),
        });
        self
    }

    pub fn with_field(mut self, id: &str, spec: FieldSpec) -> Self {
        self.fields.insert(id.to_string(), spec);
        self
    }

    /// Configured range of a field.
    pub fn range(&self, field: &str) -> Option<FieldRange> {
        self.fields.get(field).and_then(|spec| spec.range)
    }

    /// Fields with a grid cell, as `(field_id, cell)`.
    pub fn grid_cells(&self) -> impl Iterator<Item = (&str, GridCell)> {
        self.fields
            .iter()
            .filter_map(|(id, spec)| spec.grid.map(|cell| (id.as_str(), cell)))
    }

    /// Anchor rules grouped into windows, in the order their keywords first
    /// appear in the table.
    pub fn windows(&self) -> Vec<WindowGroup> {
        let mut groups: Vec<WindowGroup> = Vec::new();

        for (id, spec) in &self.fields {
            let Some(rule) = &spec.anchor else {
                continue;
            };
            let key = rule.window_key();
            match groups.iter_mut().find(|g| g.key == key) {
                Some(group) => group.slots.push((rule.offset, id.clone())),
                None => groups.push(WindowGroup {
                    key,
                    slots: vec![(rule.offset, id.clone())],
                }),
            }
        }

        for group in &mut groups {
            group.slots.sort();
        }
        groups
    }

    /// Distinct anchor keywords with the fields that depend on them.
    pub fn keywords(&self) -> Vec<(String, Vec<String>)> {
        let mut keywords: Vec<(String, Vec<String>)> = Vec::new();
        for group in self.windows() {
            let fields = group.slots.iter().map(|(_, id)| id.clone());
            match keywords.iter_mut().find(|(k, _)| *k == group.key.keyword) {
                Some((_, existing)) => existing.extend(fields),
                None => keywords.push((group.key.keyword.clone(), fields.collect())),
            }
        }
        keywords
    }

    /// Every label printed on the display: target label, field labels and
    /// anchor keywords.
    pub fn labels(&self) -> Vec<&str> {
        let target = self.target.iter().map(|t| t.label.as_str());
        let fields = self.fields.values().flat_map(|spec| {
            spec.label
                .as_deref()
                .into_iter()
                .chain(spec.anchor.as_ref().map(|rule| rule.keyword.as_str()))
        });
        target.chain(fields).collect()
    }

    /// Check every rule for internal consistency.
    pub fn validate(&self, grid: &GridConfig) -> std::result::Result<(), ConfigError> {
        if let Some(target) = &self.target {
            if target.label.trim().is_empty() {
                return Err(ConfigError::EmptyKeyword(target.field.clone()));
            }
        }

        for (id, spec) in &self.fields {
            if let Some(range) = spec.range {
                if range.min > range.max {
                    return Err(ConfigError::InvertedRange {
                        field: id.clone(),
                        min: range.min,
                        max: range.max,
                    });
                }
            }

            if let Some(cell) = spec.grid {
                if cell.row >= grid.rows || cell.col >= grid.cols {
                    return Err(ConfigError::CellOutOfGrid {
                        field: id.clone(),
                        row: cell.row,
                        col: cell.col,
                        rows: grid.rows,
                        cols: grid.cols,
                    });
                }
            }

            if let Some(rule) = &spec.anchor {
                if rule.keyword.is_empty() {
                    return Err(ConfigError::EmptyKeyword(id.clone()));
                }
                if rule.window_size == 0 {
                    return Err(ConfigError::EmptyWindow {
                        field: id.clone(),
                        keyword: rule.keyword.clone(),
                    });
                }
                if rule.offset >= rule.window_size {
                    return Err(ConfigError::OffsetOutOfWindow {
                        field: id.clone(),
                        offset: rule.offset,
                        window_size: rule.window_size,
                    });
                }
            }
        }

        for group in self.windows() {
            for pair in group.slots.windows(2) {
                if pair[0].0 == pair[1].0 {
                    return Err(ConfigError::DuplicateOffset {
                        keyword: group.key.keyword.clone(),
                        offset: pair[0].0,
                        first: pair[0].1.clone(),
                        second: pair[1].1.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

impl Default for FieldTable {
    /// Layout of the data display the tool was built for: the total game
    /// count (X) and thirteen counters A-M in a 5x4 grid.
    fn default() -> Self {
        use Direction::After;

        const COUNT_MAX: u64 = 9_999;

        let first_row = |keyword: &str, offset| AnchorRule::new(keyword, After, offset, 4);
        let labeled_row =
            |keyword: &str, offset| AnchorRule::new(keyword, After, offset, 4).with_skip_suffix(false);

        FieldTable::empty()
            .with_target("X", "対象ゲーム数")
            .with_field("X", FieldSpec::labeled("対象ゲーム数").with_range(1, 99_999))
            .with_field(
                "A",
                FieldSpec::labeled("打込")
                    .with_grid(1, 0)
                    .with_anchor(first_row("対象ゲーム数", 0))
                    .with_range(0, COUNT_MAX),
            )
            .with_field(
                "B",
                FieldSpec::labeled("2穴")
                    .with_grid(1, 1)
                    .with_anchor(first_row("対象ゲーム数", 1))
                    .with_range(0, COUNT_MAX),
            )
            .with_field(
                "C",
                FieldSpec::labeled("リプレイ")
                    .with_grid(1, 2)
                    .with_anchor(first_row("対象ゲーム数", 2))
                    .with_range(0, COUNT_MAX),
            )
            .with_field(
                "D",
                FieldSpec::labeled("リプ→V")
                    .with_grid(1, 3)
                    .with_anchor(first_row("対象ゲーム数", 3))
                    .with_range(0, COUNT_MAX),
            )
            .with_field(
                "E",
                FieldSpec::labeled("羽根拾")
                    .with_grid(2, 0)
                    .with_anchor(labeled_row("羽根拾", 0))
                    .with_range(0, COUNT_MAX),
            )
            .with_field(
                "F",
                FieldSpec::labeled("V入賞")
                    .with_grid(2, 1)
                    .with_anchor(labeled_row("羽根拾", 1))
                    .with_range(0, COUNT_MAX),
            )
            .with_field(
                "G",
                FieldSpec::labeled("SP")
                    .with_grid(2, 2)
                    .with_anchor(labeled_row("羽根拾", 2))
                    .with_range(0, COUNT_MAX),
            )
            .with_field(
                "H",
                FieldSpec::labeled("SP→V")
                    .with_grid(2, 3)
                    .with_anchor(labeled_row("羽根拾", 3))
                    .with_range(0, COUNT_MAX),
            )
            .with_field(
                "I",
                FieldSpec::labeled("拾い→蹴り")
                    .with_grid(3, 0)
                    .with_anchor(labeled_row("拾い→蹴り", 0))
                    .with_range(0, COUNT_MAX),
            )
            .with_field(
                "J",
                FieldSpec::labeled("当大")
                    .with_grid(3, 1)
                    .with_anchor(labeled_row("拾い→蹴り", 1))
                    .with_range(0, COUNT_MAX),
            )
            .with_field(
                "K",
                FieldSpec::labeled("当中")
                    .with_grid(3, 2)
                    .with_anchor(labeled_row("拾い→蹴り", 2))
                    .with_range(0, COUNT_MAX),
            )
            .with_field(
                "L",
                FieldSpec::labeled("当小")
                    .with_grid(3, 3)
                    .with_anchor(labeled_row("拾い→蹴り", 3))
                    .with_range(0, COUNT_MAX),
            )
            .with_field(
                "M",
                FieldSpec::labeled("2穴二回目")
                    .with_grid(4, 0)
                    .with_anchor(AnchorRule::new("2穴二回目", After, 0, 1).with_skip_suffix(false))
                    .with_range(0, COUNT_MAX),
            )
    }
}

/// Grid geometry for the positional strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Number of value rows.
    pub rows: usize,

    /// Number of columns.
    pub cols: usize,

    /// Row-units of blank margin added to the vertical extent.
    pub margin_rows: usize,

    /// Header offset, in cells, subtracted from y before dividing.
    pub top_margin_cells: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: 5,
            cols: 4,
            margin_rows: 2,
            top_margin_cells: 0.5,
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ConfigError::EmptyGrid);
        }
        Ok(())
    }
}

/// Daily history aggregation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Spellings of "today" on the display.
    pub today_labels: Vec<String>,

    /// Label used for today in the output.
    pub today_canonical: String,

    /// Oldest day shown ("N日前").
    pub max_days_ago: u32,

    /// Fallback keeps numbers strictly between 0 and this bound.
    pub fallback_upper_bound: u64,

    /// Words that mark the jackpot (wins) history image.
    pub jackpot_keywords: Vec<String>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            today_labels: vec!["本日".to_string(), "今日".to_string()],
            today_canonical: "今日".to_string(),
            max_days_ago: 6,
            fallback_upper_bound: 5000,
            jackpot_keywords: vec!["大当り".to_string(), "大当".to_string()],
        }
    }
}

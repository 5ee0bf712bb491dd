//! Label immediately followed by its value (`対象ゲーム数 120`).

use regex::Regex;

use crate::config::TargetRule;
use crate::error::ConfigError;

/// Compiled `<label>\s*(\d+)` pattern for the target field.
#[derive(Debug, Clone)]
pub struct TargetPattern {
    field: String,
    pattern: Regex,
}

impl TargetPattern {
    pub fn new(rule: &TargetRule) -> Result<Self, ConfigError> {
        let source = format!(r"{}\s*([0-9]+)", regex::escape(&rule.label));
        let pattern = Regex::new(&source).map_err(|e| ConfigError::Pattern {
            label: rule.label.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            field: rule.field.clone(),
            pattern,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// First value printed right after the label in normalized text.
    pub fn find(&self, text: &str) -> Option<u64> {
        self.pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

//! Range validation of resolved values.

use std::collections::BTreeMap;

use tracing::debug;

use super::result::DroppedValue;
use crate::config::FieldTable;

/// Remove every value outside its field's configured range.
///
/// Values are dropped, never clamped. Fields without a range pass through.
pub fn apply_ranges(values: &mut BTreeMap<String, u64>, table: &FieldTable) -> Vec<DroppedValue> {
    let mut dropped = Vec::new();

    values.retain(|field, value| match table.range(field) {
        Some(range) if !range.contains(*value) => {
            debug!(
                "Dropping {}={} outside [{}, {}]",
                field, value, range.min, range.max
            );
            dropped.push(DroppedValue {
                field: field.clone(),
                value: *value,
                min: range.min,
                max: range.max,
            });
            false
        }
        _ => true,
    });

    dropped
}

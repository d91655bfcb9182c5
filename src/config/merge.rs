//! Configuration merge logic
//!
//! Layers merge left to right with:
//! - Nested tables: deep-merge by key
//! - Arrays: REPLACE (last wins)
//! - Scalars: override (last wins)
//! - Absent fields: never override

use serde_json::{Map, Value};

/// A configuration layer that can absorb a higher-precedence layer.
pub trait Merge {
    /// Merge `overlay` into `self`; values present in `overlay` win.
    fn merge(&mut self, overlay: Self);
}

/// Merge `sources` into `target` in order and return the result.
///
/// Later sources take precedence over earlier ones at every leaf.
pub fn deep_merge<T, I>(mut target: T, sources: I) -> T
where
    T: Merge,
    I: IntoIterator<Item = T>,
{
    for source in sources {
        target.merge(source);
    }
    target
}

/// Overwrite a scalar slot when the overlay carries a value.
///
/// Arrays go through here too, so they are replaced wholesale.
pub fn merge_scalar<T>(slot: &mut Option<T>, overlay: Option<T>) {
    if overlay.is_some() {
        *slot = overlay;
    }
}

/// Merge a nested table, creating it when the target lacks one.
pub fn merge_nested<T: Merge>(slot: &mut Option<T>, overlay: Option<T>) {
    match (slot.as_mut(), overlay) {
        (Some(base), Some(overlay)) => base.merge(overlay),
        (None, Some(overlay)) => *slot = Some(overlay),
        (_, None) => {}
    }
}

/// Deep merge two JSON values.
///
/// Merge semantics:
/// - Objects: deep-merge by key (recursive)
/// - Arrays: REPLACE (second wins entirely)
/// - Scalars: override (second wins)
/// - Null: override (null can override any value)
pub fn deep_merge_value(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            merge_map(&mut base_map, overlay_map);
            Value::Object(base_map)
        }

        // Arrays: REPLACE (no concatenation)
        (Value::Array(_), overlay @ Value::Array(_)) => overlay,

        (_, overlay) => overlay,
    }
}

fn merge_map(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, overlay_value) in overlay {
        let merged = match base.remove(&key) {
            Some(base_value) => deep_merge_value(base_value, overlay_value),
            None => overlay_value,
        };
        base.insert(key, merged);
    }
}

impl Merge for Map<String, Value> {
    fn merge(&mut self, overlay: Self) {
        merge_map(self, overlay);
    }
}

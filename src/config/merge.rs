//! Merge functionality for class configurations.
//!
//! Two kinds of merging live here:
//! - [`deep_merge`]: field-by-field merging of YAML files across configuration
//!   tiers (defaults, project, user). Arrays are replaced entirely.
//! - [`merge_nodes`]: merging a child class onto its resolved parent. Plain keys
//!   overwrite shallowly, operator keys mutate inherited arrays, and the `view`
//!   section is merged on its own with the same rules.

use super::field_op::{ConfigNode, FieldOp, VIEW_KEY};
use crate::logging::{DiagnosticKind, DiagnosticLog};
use serde_json::{Map, Value};

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base
/// - Arrays, strings, numbers, booleans are replaced entirely
/// - If overlay is null, the base value is preserved (null means "not specified")
///
/// # Example
/// ```
/// use serde_json::json;
/// use notegen::config::deep_merge;
///
/// let base = json!({
///     "daily": { "include_default_templates": true, "view": { "tags": ["journal"] } }
/// });
/// let overlay = json!({
///     "daily": { "view": { "tags": ["reference"] } }
/// });
/// let result = deep_merge(base, overlay);
/// assert_eq!(result["daily"]["include_default_templates"], true);
/// assert_eq!(result["daily"]["view"]["tags"], json!(["reference"]));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        // Both are objects: merge recursively
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            // Merged in place so keys keep the position the base gave them
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => {
                        let base_value = std::mem::take(slot);
                        *slot = deep_merge(base_value, overlay_value);
                    }
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
            Value::Object(base_map)
        }
        // Overlay is null: preserve base (null means "not specified")
        (base, Value::Null) => base,
        // Any other case: overlay replaces base entirely
        (_, overlay) => overlay,
    }
}

/// Merge multiple values in order, with later values taking precedence.
///
/// Equivalent to folding `deep_merge` over the list.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}

/// Merge a parsed child class onto its resolved parent.
///
/// 1. Start from a copy of `parent`.
/// 2. Every plain key of `current` overwrites the same key.
/// 3. Each operator of `current` is applied to the merged field it names.
/// 4. If `current` has a `view` section it is merged the same way onto the
///    parent's `view` (or onto an empty object).
///
/// Neither input is modified. Operators aimed at a field that is present but
/// not an array are skipped and reported as [`DiagnosticKind::MergeTypeMismatch`].
pub fn merge_nodes(
    parent: &Map<String, Value>,
    current: &ConfigNode,
    type_name: &str,
    diagnostics: &DiagnosticLog,
) -> Map<String, Value> {
    let mut merged = parent.clone();
    for (key, value) in &current.fields {
        merged.insert(key.clone(), value.clone());
    }

    for op in &current.ops {
        apply_op(&mut merged, op, type_name, diagnostics);
    }

    if let Some(ref view) = current.view {
        let parent_view = match merged.get(VIEW_KEY) {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        let merged_view = merge_nodes(&parent_view, view, type_name, diagnostics);
        merged.insert(VIEW_KEY.to_string(), Value::Object(merged_view));
    }

    merged
}

fn apply_op(
    merged: &mut Map<String, Value>,
    op: &FieldOp,
    type_name: &str,
    diagnostics: &DiagnosticLog,
) {
    let field = op.field();

    match merged.get(field) {
        Some(Value::Array(_)) => {}
        None | Some(Value::Null) => {
            // Only appending can conjure the field; there is nothing to replace or delete.
            if let FieldOp::Add { values, .. } = op {
                merged.insert(field.to_string(), Value::Array(values.clone()));
            }
            return;
        }
        Some(other) => {
            diagnostics.warning(
                DiagnosticKind::MergeTypeMismatch,
                type_name,
                format!(
                    "_{}_{} skipped: {} is {}, not an array",
                    field,
                    op.kind().as_str(),
                    field,
                    short_type(other)
                ),
            );
            return;
        }
    }

    let Some(Value::Array(target)) = merged.get_mut(field) else {
        return;
    };

    match op {
        FieldOp::Add { values, .. } => target.extend(values.iter().cloned()),
        FieldOp::Replace { mapping, .. } => {
            for (old, new) in mapping {
                if let Some(index) = target.iter().position(|item| item == old) {
                    target[index] = new.clone();
                }
            }
        }
        FieldOp::Delete { values, .. } => {
            for value in values {
                if let Some(index) = target.iter().position(|item| item == value) {
                    target.remove(index);
                }
            }
        }
    }
}

fn short_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

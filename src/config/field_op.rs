//! Operator-suffixed keys, parsed once into typed field operations.
//!
//! A raw class object may contain keys like `_tags_add`, `_tags_replace` or
//! `_ignore_fields_delete`. They are instructions against the inherited value
//! of the named field rather than fields of their own. [`ConfigNode::from_map`]
//! splits a raw object into its plain fields and an ordered list of
//! [`FieldOp`]s, so merging never has to look at key spelling again.
//! Operators, and the pairs of a `_replace` mapping, apply in the order they
//! were written.

use crate::logging::{DiagnosticKind, DiagnosticLog};
use regex_lite::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Key naming the parent class.
pub const EXTENDS_KEY: &str = "_extends";
/// Nested section merged independently of the top-level object.
pub const VIEW_KEY: &str = "view";

// Field names may contain underscores; the trailing token decides the operation.
static OPERATOR_KEY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^_([^_]+(?:_[^_]+)*)_(add|replace|delete)$").ok());

/// Which operation an operator key names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Add,
    Replace,
    Delete,
}

impl OpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Add => "add",
            OpKind::Replace => "replace",
            OpKind::Delete => "delete",
        }
    }
}

/// Split an operator key into `(field, kind)`. Plain keys return `None`.
pub fn parse_operator_key(key: &str) -> Option<(String, OpKind)> {
    let caps = OPERATOR_KEY.as_ref()?.captures(key)?;
    let field = caps.get(1)?.as_str().to_string();
    let kind = match caps.get(2)?.as_str() {
        "add" => OpKind::Add,
        "replace" => OpKind::Replace,
        "delete" => OpKind::Delete,
        _ => return None,
    };
    Some((field, kind))
}

/// A mutation of an inherited array field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Append every value, in order.
    Add { field: String, values: Vec<Value> },
    /// Overwrite the slot holding each old value with its new value.
    Replace {
        field: String,
        mapping: Vec<(Value, Value)>,
    },
    /// Remove the first occurrence of each value.
    Delete { field: String, values: Vec<Value> },
}

impl FieldOp {
    /// Build an operation from an operator key and its raw value.
    ///
    /// Returns `Err` with a reason when the value has the wrong shape
    /// (`_add`/`_delete` need an array, `_replace` needs an object).
    pub fn from_parts(field: String, kind: OpKind, value: &Value) -> Result<Self, String> {
        match (kind, value) {
            (OpKind::Add, Value::Array(values)) => Ok(FieldOp::Add {
                field,
                values: values.clone(),
            }),
            (OpKind::Delete, Value::Array(values)) => Ok(FieldOp::Delete {
                field,
                values: values.clone(),
            }),
            (OpKind::Replace, Value::Object(map)) => Ok(FieldOp::Replace {
                field,
                mapping: map
                    .iter()
                    .map(|(old, new)| (Value::String(old.clone()), new.clone()))
                    .collect(),
            }),
            (OpKind::Replace, other) => Err(format!(
                "_{}_replace expects a mapping of old to new values, got {}",
                field,
                kind_name(other)
            )),
            (kind, other) => Err(format!(
                "_{}_{} expects an array, got {}",
                field,
                kind.as_str(),
                kind_name(other)
            )),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            FieldOp::Add { field, .. }
            | FieldOp::Replace { field, .. }
            | FieldOp::Delete { field, .. } => field,
        }
    }

    pub fn kind(&self) -> OpKind {
        match self {
            FieldOp::Add { .. } => OpKind::Add,
            FieldOp::Replace { .. } => OpKind::Replace,
            FieldOp::Delete { .. } => OpKind::Delete,
        }
    }
}

/// One raw class object (or its `view` section) after parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigNode {
    /// Plain fields, operator keys and `_extends`/`view` removed.
    pub fields: Map<String, Value>,
    /// Operator keys, in source order.
    pub ops: Vec<FieldOp>,
    /// Parent class, top-level nodes only.
    pub extends: Option<String>,
    /// Parsed `view` section, top-level nodes only.
    pub view: Option<Box<ConfigNode>>,
}

impl ConfigNode {
    /// Parse a top-level class object.
    pub fn from_map(map: Map<String, Value>, type_name: &str, diagnostics: &DiagnosticLog) -> Self {
        Self::parse(map, type_name, diagnostics, true)
    }

    fn parse(
        map: Map<String, Value>,
        type_name: &str,
        diagnostics: &DiagnosticLog,
        top_level: bool,
    ) -> Self {
        let mut node = ConfigNode::default();

        for (key, value) in map {
            if top_level && key == EXTENDS_KEY {
                match value {
                    Value::String(parent) if !parent.is_empty() => node.extends = Some(parent),
                    Value::Null => {}
                    Value::String(_) => {}
                    other => diagnostics.warning(
                        DiagnosticKind::MalformedOperator,
                        type_name,
                        format!("_extends must name a class, got {}", other),
                    ),
                }
                continue;
            }

            if top_level && key == VIEW_KEY {
                match value {
                    Value::Object(view) => {
                        node.view = Some(Box::new(Self::parse(view, type_name, diagnostics, false)));
                        continue;
                    }
                    // A non-object view is an ordinary field that overrides the parent's.
                    other => {
                        node.fields.insert(key, other);
                        continue;
                    }
                }
            }

            match parse_operator_key(&key) {
                Some((field, kind)) => match FieldOp::from_parts(field, kind, &value) {
                    Ok(op) => node.ops.push(op),
                    Err(reason) => {
                        diagnostics.warning(DiagnosticKind::MalformedOperator, type_name, reason)
                    }
                },
                None => {
                    node.fields.insert(key, value);
                }
            }
        }

        node
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

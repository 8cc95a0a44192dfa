//! Deferred `${name}` templates inside class configuration strings.
//!
//! Configuration values such as `"[[${'INCLUDE_TEMPLATE_DIR'}/${type}]]"` are
//! only meaningful once the class name is known. A template is compiled into
//! alternating literal fragments and placeholder names, then rendered against
//! a set of bindings. Quoting the name (`${'name'}` or `${"name"}`) is optional;
//! mismatched quotes are not a placeholder and stay literal text.

use crate::logging::{DiagnosticKind, DiagnosticLog};
use regex_lite::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Binding name carrying the class being resolved.
pub const TYPE_BINDING: &str = "type";

static PLACEHOLDER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"\$\{\s*(?:'([^'{}]*)'|"([^"{}]*)"|([A-Za-z_][A-Za-z0-9_.\-]*))\s*\}"#).ok()
});

/// Named values available to templates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: BTreeMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Copy of these bindings with `type` set to `type_name`.
    pub fn for_type(&self, type_name: &str) -> Self {
        self.clone().with(TYPE_BINDING, type_name)
    }
}

/// A parsed template: `fragments.len() == names.len() + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    fragments: Vec<String>,
    names: Vec<String>,
}

/// Parse `source` into a reusable template.
pub fn compile(source: &str) -> CompiledTemplate {
    let mut fragments = Vec::new();
    let mut names = Vec::new();
    let mut last = 0;

    for caps in PLACEHOLDER.iter().flat_map(|re| re.captures_iter(source)) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let Some(name) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) else {
            continue;
        };
        fragments.push(source[last..whole.start()].to_string());
        names.push(name.as_str().to_string());
        last = whole.end();
    }
    fragments.push(source[last..].to_string());

    CompiledTemplate { fragments, names }
}

impl CompiledTemplate {
    /// Placeholder names in order of appearance.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// True when the source had no placeholders.
    pub fn is_literal(&self) -> bool {
        self.names.is_empty()
    }

    /// Substitute and concatenate. Unbound names render as empty text.
    pub fn render(&self, bindings: &Bindings) -> String {
        self.render_checked(bindings).0
    }

    /// Like [`render`](Self::render), also returning the names that had no binding.
    pub fn render_checked(&self, bindings: &Bindings) -> (String, Vec<String>) {
        let mut out = String::with_capacity(self.fragments.iter().map(String::len).sum());
        let mut missing = Vec::new();

        out.push_str(&self.fragments[0]);
        for (name, fragment) in self.names.iter().zip(&self.fragments[1..]) {
            match bindings.get(name) {
                Some(value) => out.push_str(&value_text(value)),
                None => missing.push(name.clone()),
            }
            out.push_str(fragment);
        }

        (out, missing)
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Compile and render, in place, every string under `value` that contains `$`.
///
/// Walks nested arrays and objects. Strings without `$` are left alone, so a
/// value that has already been rendered is never processed twice.
pub fn interpolate_value(
    value: &mut Value,
    bindings: &Bindings,
    type_name: &str,
    diagnostics: &DiagnosticLog,
) {
    match value {
        Value::String(s) if s.contains('$') => {
            let (rendered, missing) = compile(s).render_checked(bindings);
            for name in missing {
                diagnostics.warning(
                    DiagnosticKind::MissingTemplateBinding,
                    type_name,
                    format!("no binding for ${{{}}} in {:?}", name, s),
                );
            }
            *s = rendered;
        }
        Value::Array(items) => {
            for item in items {
                interpolate_value(item, bindings, type_name, diagnostics);
            }
        }
        Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                interpolate_value(item, bindings, type_name, diagnostics);
            }
        }
        _ => {}
    }
}

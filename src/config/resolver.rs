//! Class inheritance resolution.
//!
//! A class names at most one parent through `_extends`. Resolving a class
//! walks the chain leaf-to-root, then merges root-to-leaf: every raw class
//! object has its `${...}` templates rendered against its own name first,
//! is parsed into a [`ConfigNode`], and is merged onto its fully resolved
//! parent. The result remembers the topmost ancestor, which selects the
//! options variant downstream.

use super::field_op::{ConfigNode, EXTENDS_KEY, VIEW_KEY};
use super::merge::merge_nodes;
use super::template::{Bindings, interpolate_value};
use super::types::AppConfig;
use crate::error::{EngineError, EngineResult};
use crate::logging::{DiagnosticKind, DiagnosticLog};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Key stamped on resolved output with the requested class name.
pub const TYPE_KEY: &str = "_type";

/// The raw class table: class name to raw configuration object.
///
/// Top-level keys starting with `_` are not classes. They are kept so YAML
/// anchors can live there, but are never resolved or listed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTypeTable {
    classes: Map<String, Value>,
}

impl RawTypeTable {
    /// Validate a parsed table. `null` is an empty table and a `null` class
    /// is an empty class; anything else must be an object.
    pub fn from_value(value: Value) -> EngineResult<Self> {
        let map = match value {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                return Err(EngineError::invalid_table(&format!(
                    "expected a mapping of classes, got {}",
                    other
                )));
            }
        };

        let mut classes = Map::new();
        for (name, raw) in map {
            if name.starts_with('_') {
                classes.insert(name, raw);
                continue;
            }
            match raw {
                Value::Object(_) => {
                    classes.insert(name, raw);
                }
                Value::Null => {
                    classes.insert(name, Value::Object(Map::new()));
                }
                other => {
                    return Err(EngineError::invalid_table(&format!(
                        "class '{}' must be a mapping, got {}",
                        name, other
                    ))
                    .with_type(name));
                }
            }
        }

        Ok(Self { classes })
    }

    pub fn from_yaml_str(source: &str) -> EngineResult<Self> {
        let value: Value = serde_yaml::from_str(source).map_err(EngineError::invalid_config)?;
        Self::from_value(value)
    }

    /// Raw object of a class, if the table defines it.
    pub fn get(&self, type_name: &str) -> Option<&Map<String, Value>> {
        if type_name.starts_with('_') {
            return None;
        }
        self.classes.get(type_name).and_then(Value::as_object)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.get(type_name).is_some()
    }

    /// Class names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        let mut names: Vec<&str> = self
            .classes
            .keys()
            .map(String::as_str)
            .filter(|name| !name.starts_with('_'))
            .collect();
        names.sort_unstable();
        names.into_iter()
    }

    pub fn len(&self) -> usize {
        self.names().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Immediate parent as written in the raw table.
    pub fn parent_of(&self, type_name: &str) -> Option<&str> {
        match self.get(type_name)?.get(EXTENDS_KEY)? {
            Value::String(parent) if !parent.is_empty() => Some(parent),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.classes.clone())
    }
}

/// A class after inheritance, templates and operators have all been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTypeConfig {
    type_name: String,
    parent: Option<String>,
    root: Option<String>,
    fields: Map<String, Value>,
}

impl ResolvedTypeConfig {
    /// The class that was requested.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Immediate parent, `None` for root classes.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Topmost ancestor, `None` for root classes.
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Root of the chain, the class itself for root classes.
    pub fn family(&self) -> &str {
        self.root().unwrap_or(&self.type_name)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_array(&self, key: &str) -> Option<&Vec<Value>> {
        self.get(key).and_then(Value::as_array)
    }

    /// Resolved `view` section.
    pub fn view(&self) -> Option<&Map<String, Value>> {
        self.get(VIEW_KEY).and_then(Value::as_object)
    }

    /// Owned JSON form with `_type` and, for non-root classes, the topmost
    /// `_extends` stamped in.
    pub fn to_value(&self) -> Value {
        let mut map = self.fields.clone();
        map.insert(TYPE_KEY.to_string(), Value::String(self.type_name.clone()));
        if let Some(ref root) = self.root {
            map.insert(EXTENDS_KEY.to_string(), Value::String(root.clone()));
        }
        Value::Object(map)
    }
}

/// Resolves classes of one raw table, memoizing results per class name.
///
/// The table is immutable for the lifetime of a resolver; a reloaded table
/// gets a new resolver (see [`super::watcher::ClassRegistry`]).
pub struct ConfigResolver {
    table: RawTypeTable,
    bindings: Bindings,
    diagnostics: DiagnosticLog,
    cache: Mutex<HashMap<String, Arc<ResolvedTypeConfig>>>,
}

impl ConfigResolver {
    /// `bindings` are the well-known template names; `type` is added per class.
    pub fn new(table: RawTypeTable, bindings: Bindings, diagnostics: DiagnosticLog) -> Self {
        Self {
            table,
            bindings,
            diagnostics,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolver using the bindings of `config`.
    pub fn with_config(table: RawTypeTable, config: &AppConfig, diagnostics: DiagnosticLog) -> Self {
        Self::new(table, config.template_bindings(), diagnostics)
    }

    pub fn table(&self) -> &RawTypeTable {
        &self.table
    }

    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    pub fn type_names(&self) -> Vec<String> {
        self.table.names().map(str::to_string).collect()
    }

    /// Resolve one class.
    ///
    /// Unknown classes resolve to an empty configuration with a warning.
    /// A cyclic `_extends` chain fails with [`crate::error::ErrorCode::ExtendsCycle`].
    pub fn resolve(&self, type_name: &str) -> EngineResult<Arc<ResolvedTypeConfig>> {
        let mut path = Vec::new();
        self.resolve_in_path(type_name, &mut path)
    }

    /// Resolve every class of the table, sorted by name. Stops at the first error.
    pub fn resolve_all(&self) -> EngineResult<Vec<Arc<ResolvedTypeConfig>>> {
        self.table.names().map(|name| self.resolve(name)).collect()
    }

    /// Leaf-to-root list of class names, starting with `type_name`.
    pub fn chain(&self, type_name: &str) -> EngineResult<Vec<String>> {
        let mut chain = vec![type_name.to_string()];
        let mut current = type_name;
        while let Some(parent) = self.table.parent_of(current) {
            if chain.iter().any(|seen| seen == parent) {
                chain.push(parent.to_string());
                return Err(EngineError::extends_cycle(&chain));
            }
            chain.push(parent.to_string());
            current = parent;
        }
        Ok(chain)
    }

    fn resolve_in_path(
        &self,
        type_name: &str,
        path: &mut Vec<String>,
    ) -> EngineResult<Arc<ResolvedTypeConfig>> {
        if let Some(hit) = self.cached(type_name) {
            return Ok(hit);
        }

        if path.iter().any(|seen| seen == type_name) {
            let mut chain = path.clone();
            chain.push(type_name.to_string());
            return Err(EngineError::extends_cycle(&chain));
        }

        let mut node = self.compile_node(type_name);
        if node.extends.is_none() {
            self.drop_root_ops(&mut node, type_name);
        }

        path.push(type_name.to_string());
        let parent = match node.extends {
            Some(ref parent) => Some(self.resolve_in_path(parent, path)?),
            None => None,
        };
        path.pop();

        let empty = Map::new();
        let parent_fields = parent.as_ref().map_or(&empty, |p| &p.fields);
        let fields = merge_nodes(parent_fields, &node, type_name, &self.diagnostics);

        let root = parent
            .as_ref()
            .map(|p| p.root.clone().unwrap_or_else(|| p.type_name.clone()));

        debug!(
            class = %type_name,
            parent = ?node.extends,
            root = ?root,
            "Resolved class"
        );

        let resolved = Arc::new(ResolvedTypeConfig {
            type_name: type_name.to_string(),
            parent: node.extends,
            root,
            fields,
        });
        self.store(type_name, &resolved);
        Ok(resolved)
    }

    /// Look up, render templates and parse the raw object of one class.
    fn compile_node(&self, type_name: &str) -> ConfigNode {
        let Some(raw) = self.table.get(type_name) else {
            self.diagnostics.warning(
                DiagnosticKind::UnknownType,
                type_name,
                format!("class '{}' is not defined; resolving as empty", type_name),
            );
            return ConfigNode::default();
        };

        let mut compiled = Value::Object(raw.clone());
        interpolate_value(
            &mut compiled,
            &self.bindings.for_type(type_name),
            type_name,
            &self.diagnostics,
        );

        match compiled {
            Value::Object(map) => ConfigNode::from_map(map, type_name, &self.diagnostics),
            _ => ConfigNode::default(),
        }
    }

    /// A root is taken as written: its operator keys are stripped, not applied.
    fn drop_root_ops(&self, node: &mut ConfigNode, type_name: &str) {
        let view_ops = node.view.as_mut().map(|view| std::mem::take(&mut view.ops));
        let ops = std::mem::take(&mut node.ops)
            .into_iter()
            .chain(view_ops.into_iter().flatten());

        for op in ops {
            self.diagnostics.warning(
                DiagnosticKind::InertOperator,
                type_name,
                format!(
                    "_{}_{} ignored: '{}' extends no class",
                    op.field(),
                    op.kind().as_str(),
                    type_name
                ),
            );
        }
    }

    fn cached(&self, type_name: &str) -> Option<Arc<ResolvedTypeConfig>> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(type_name)
            .cloned()
    }

    fn store(&self, type_name: &str, resolved: &Arc<ResolvedTypeConfig>) {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(type_name.to_string(), Arc::clone(resolved));
    }
}

impl std::fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigResolver")
            .field("classes", &self.table.len())
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

/// One-shot resolution with the default vault bindings and no memoization
/// across calls.
pub fn resolve(table: &RawTypeTable, type_name: &str) -> EngineResult<ResolvedTypeConfig> {
    let resolver = ConfigResolver::with_config(
        table.clone(),
        &AppConfig::default(),
        DiagnosticLog::new(),
    );
    resolver.resolve(type_name).map(|resolved| (*resolved).clone())
}

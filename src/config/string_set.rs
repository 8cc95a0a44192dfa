//! Duplicate-free set of strings.
//!
//! Used for `ignore_fields` on prompt options and `tags` on view options.
//! Iteration and serialization are sorted, so the JSON form is canonical.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StringSet {
    items: BTreeSet<String>,
}

impl StringSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one string, or every string of an array.
    ///
    /// A batch containing any non-string is rejected as a whole and nothing
    /// is inserted.
    pub fn add(&mut self, items: &Value) -> EngineResult<()> {
        let batch = Self::check_strings(items)?;
        self.items.extend(batch);
        Ok(())
    }

    pub fn insert(&mut self, item: impl Into<String>) -> bool {
        self.items.insert(item.into())
    }

    pub fn extend<I, S>(&mut self, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items.extend(items.into_iter().map(Into::into));
    }

    pub fn delete(&mut self, item: &str) -> bool {
        self.items.remove(item)
    }

    pub fn has(&self, item: &str) -> bool {
        self.items.contains(item)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn delete_multiple<'a>(&mut self, items: impl IntoIterator<Item = &'a str>) {
        for item in items {
            self.items.remove(item);
        }
    }

    /// Swap `old_item` for `new_item`. A missing `old_item` still adds `new_item`.
    pub fn replace(&mut self, old_item: &str, new_item: impl Into<String>) {
        self.items.remove(old_item);
        self.items.insert(new_item.into());
    }

    /// Clear the set, then add every string of `items`.
    ///
    /// Validation happens first; on error the set is left untouched.
    pub fn replace_with(&mut self, items: &Value) -> EngineResult<()> {
        let batch = Self::check_strings(items)?;
        self.items = batch.into_iter().collect();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.items.iter().cloned().collect()
    }

    /// JSON array text, for embedding in generated notes.
    pub fn as_string(&self) -> String {
        serde_json::to_string(&self.items).unwrap_or_else(|_| "[]".to_string())
    }

    fn check_strings(items: &Value) -> EngineResult<Vec<String>> {
        match items {
            Value::String(s) => Ok(vec![s.clone()]),
            Value::Array(values) => values
                .iter()
                .map(|v| match v {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(EngineError::not_a_string(other)),
                })
                .collect(),
            other => Err(EngineError::not_a_string(other)),
        }
    }
}

impl TryFrom<&Value> for StringSet {
    type Error = EngineError;

    fn try_from(value: &Value) -> EngineResult<Self> {
        let mut set = StringSet::new();
        set.add(value)?;
        Ok(set)
    }
}

impl<S: Into<String>> FromIterator<S> for StringSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = StringSet::new();
        set.extend(iter);
        set
    }
}

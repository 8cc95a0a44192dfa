//! Collaborators of the options factory.
//!
//! The engine itself never touches the vault or a clock directly; it goes
//! through these traits. Each has a default implementation used by the
//! binary and a static one for tests.

use crate::config::options::PromptOptions;
use crate::error::{EngineError, EngineResult};
use crate::periodic::PERIODIC_FAMILY;
use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Existence checks against the vault.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Whether the vault-relative `path` exists.
    async fn exists(&self, path: &str) -> EngineResult<bool>;
}

/// Vault on the local disk.
#[derive(Debug, Clone)]
pub struct TokioFileSystem {
    root: PathBuf,
}

impl TokioFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn exists(&self, path: &str) -> EngineResult<bool> {
        tokio::fs::try_exists(self.root.join(path))
            .await
            .map_err(|e| EngineError::file_check(path, e))
    }
}

/// In-memory vault listing.
#[derive(Debug, Clone, Default)]
pub struct StaticFileSystem {
    files: HashSet<String>,
}

impl StaticFileSystem {
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl FileSystem for StaticFileSystem {
    async fn exists(&self, path: &str) -> EngineResult<bool> {
        Ok(self.files.contains(path))
    }
}

/// Date formats of periodic classes.
pub trait PeriodFormatLookup: Send + Sync {
    fn format_for(&self, type_name: &str) -> Option<String>;
}

/// Formats from `period_formats` in `config.yaml`.
#[derive(Debug, Clone, Default)]
pub struct StaticPeriodFormats {
    formats: HashMap<String, String>,
}

impl StaticPeriodFormats {
    pub fn new(formats: HashMap<String, String>) -> Self {
        Self { formats }
    }

    pub fn with(mut self, type_name: impl Into<String>, format: impl Into<String>) -> Self {
        self.formats.insert(type_name.into(), format.into());
        self
    }
}

impl PeriodFormatLookup for StaticPeriodFormats {
    fn format_for(&self, type_name: &str) -> Option<String> {
        self.formats.get(type_name).cloned()
    }
}

/// Renders dates with moment-style format strings.
pub trait DateFormatter: Send + Sync {
    fn today(&self) -> NaiveDate;

    fn format(&self, date: NaiveDate, fmt: &str) -> String;

    fn format_today(&self, fmt: &str) -> String {
        self.format(self.today(), fmt)
    }
}

/// Moment tokens, longest first so `MMMM` wins over `MM`.
const TOKENS: [&str; 17] = [
    "YYYY", "GGGG", "gggg", "MMMM", "dddd", "MMM", "ddd", "YY", "MM", "DD", "WW", "ww", "Q", "M",
    "D", "W", "w",
];

/// [`DateFormatter`] backed by chrono.
///
/// Week tokens (`ww`, `WW`, `gggg`, `GGGG`) all use ISO weeks.
#[derive(Debug, Clone, Default)]
pub struct ChronoDateFormatter {
    fixed_today: Option<NaiveDate>,
}

impl ChronoDateFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Formatter whose `today` is always `date`.
    pub fn fixed(date: NaiveDate) -> Self {
        Self {
            fixed_today: Some(date),
        }
    }

    fn render_token(date: NaiveDate, token: &str) -> String {
        match token {
            "YYYY" => format!("{:04}", date.year()),
            "YY" => format!("{:02}", date.year().rem_euclid(100)),
            "GGGG" | "gggg" => format!("{:04}", date.iso_week().year()),
            "Q" => ((date.month0() / 3) + 1).to_string(),
            "MMMM" => date.format("%B").to_string(),
            "MMM" => date.format("%b").to_string(),
            "MM" => format!("{:02}", date.month()),
            "M" => date.month().to_string(),
            "DD" => format!("{:02}", date.day()),
            "D" => date.day().to_string(),
            "dddd" => date.format("%A").to_string(),
            "ddd" => date.format("%a").to_string(),
            "WW" | "ww" => format!("{:02}", date.iso_week().week()),
            "W" | "w" => date.iso_week().week().to_string(),
            other => other.to_string(),
        }
    }
}

impl DateFormatter for ChronoDateFormatter {
    fn today(&self) -> NaiveDate {
        self.fixed_today
            .unwrap_or_else(|| Local::now().date_naive())
    }

    fn format(&self, date: NaiveDate, fmt: &str) -> String {
        let mut out = String::with_capacity(fmt.len() + 8);
        let mut rest = fmt;

        'outer: while let Some(ch) = rest.chars().next() {
            // `[...]` is literal text
            if ch == '['
                && let Some(end) = rest.find(']')
            {
                out.push_str(&rest[1..end]);
                rest = &rest[end + 1..];
                continue;
            }

            for token in TOKENS {
                if let Some(after) = rest.strip_prefix(token) {
                    out.push_str(&Self::render_token(date, token));
                    rest = after;
                    continue 'outer;
                }
            }

            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }

        out
    }
}

/// Field schema of a class, as a metadata catalog reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassSchema {
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
    #[serde(default)]
    pub fields_order: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default)]
    pub tag_names: Vec<String>,
    #[serde(default)]
    pub files_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub options: Value,
}

impl ClassSchema {
    /// Fields in catalog order; fields missing from `fields_order` follow.
    pub fn ordered_fields(&self) -> Vec<&FieldSchema> {
        let mut ordered: Vec<&FieldSchema> = self
            .fields_order
            .iter()
            .filter_map(|name| self.fields.iter().find(|f| &f.name == name))
            .collect();
        for field in &self.fields {
            if !self.fields_order.contains(&field.name) {
                ordered.push(field);
            }
        }
        ordered
    }

    pub fn is_periodic(&self) -> bool {
        self.extends.as_deref() == Some(PERIODIC_FAMILY)
    }
}

/// Source of class field schemas.
pub trait ClassCatalog: Send + Sync {
    fn resolved_fields(&self, type_name: &str) -> Option<ClassSchema>;
}

/// Catalog held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticClassCatalog {
    classes: HashMap<String, ClassSchema>,
}

impl StaticClassCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, type_name: impl Into<String>, schema: ClassSchema) -> Self {
        self.classes.insert(type_name.into(), schema);
        self
    }
}

impl ClassCatalog for StaticClassCatalog {
    fn resolved_fields(&self, type_name: &str) -> Option<ClassSchema> {
        self.classes.get(type_name).cloned()
    }
}

/// Folders a new note may be placed in: the configured `files_paths`, or the
/// catalog's when none are configured.
pub fn folders_for(options: &PromptOptions, schema: Option<&ClassSchema>) -> Vec<String> {
    if !options.files_paths.is_empty() {
        return options.files_paths.clone();
    }
    schema.map(|s| s.files_paths.clone()).unwrap_or_default()
}

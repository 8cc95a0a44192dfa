//! Configuration types and structures.
//!
//! `AppConfig` is the vault-level configuration (`config.yaml`); the class
//! table itself (`classes.yaml`) is a free-form mapping handled by the resolver.

use super::template::Bindings;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Class table compiled into the binary.
pub const DEFAULT_CLASSES_YAML: &str = include_str!("../../defaults/classes.yaml");

/// Default moment-style date format.
pub const DATE_FMT: &str = "YYYY-MM-DD";

/// Default separator between title prefix and suffix.
pub const TITLE_SEP: &str = "-";

/// Dataview progress bar views.
pub mod progress_view {
    pub const TOTAL: &str = "total-progress-bar";
    pub const PAGE: &str = "page-progress-bar";
}

/// Fields never prompted for, whatever the class says.
pub const DEFAULT_IGNORE_FIELDS: [&str; 4] = [
    "cssClasses", // empty
    "created",    // generated at creation time
    "modified",   // generated at creation time
    "bar",        // only created if tasks are enabled
];

/// Vault-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: VaultPaths,

    /// Default moment-style date format for titles.
    #[serde(default = "default_date_fmt")]
    pub date_fmt: String,

    /// Separator between title prefix and suffix.
    #[serde(default = "default_title_sep")]
    pub title_sep: String,

    /// Date format per periodic class (e.g. `weekly: gggg-[W]ww`).
    #[serde(default)]
    pub period_formats: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paths: VaultPaths::default(),
            date_fmt: default_date_fmt(),
            title_sep: default_title_sep(),
            period_formats: HashMap::new(),
        }
    }
}

fn default_date_fmt() -> String {
    DATE_FMT.to_string()
}

fn default_title_sep() -> String {
    TITLE_SEP.to_string()
}

impl AppConfig {
    /// Well-known names available to `${...}` templates in the class table.
    ///
    /// `type` is added per class at resolution time.
    pub fn template_bindings(&self) -> Bindings {
        Bindings::new()
            .with("TEMPLATE_ROOT", self.paths.template_root.as_str())
            .with("INCLUDE_TEMPLATE_DIR", self.paths.include_template_dir())
            .with("MODULES_ROOT", self.paths.modules_root.as_str())
            .with("METADATA_MENU_ROOT", self.paths.metadata_menu_root.as_str())
            .with("VIEWS_ROOT", self.paths.views_root.as_str())
            .with("DATE_FMT", self.date_fmt.as_str())
            .with("TITLE_SEP", self.title_sep.as_str())
    }
}

/// Vault layout. All directories except `vault_root` are vault-relative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultPaths {
    /// Vault directory on disk.
    #[serde(default = "default_vault_root")]
    pub vault_root: PathBuf,

    /// Templates, prompt templates and file includes.
    #[serde(default = "default_template_root")]
    pub template_root: String,

    /// Script modules.
    #[serde(default = "default_modules_root")]
    pub modules_root: String,

    /// Class definitions of the metadata plugin.
    #[serde(default = "default_metadata_menu_root")]
    pub metadata_menu_root: String,

    /// Dataview views.
    #[serde(default = "default_views_root")]
    pub views_root: String,

    /// File include templates; defaults to `<template_root>/include`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_template_dir: Option<String>,
}

impl Default for VaultPaths {
    fn default() -> Self {
        Self {
            vault_root: default_vault_root(),
            template_root: default_template_root(),
            modules_root: default_modules_root(),
            metadata_menu_root: default_metadata_menu_root(),
            views_root: default_views_root(),
            include_template_dir: None,
        }
    }
}

fn default_vault_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_template_root() -> String {
    "_templates".to_string()
}

fn default_modules_root() -> String {
    "_modules".to_string()
}

fn default_metadata_menu_root() -> String {
    "_mm".to_string()
}

fn default_views_root() -> String {
    "_views".to_string()
}

impl VaultPaths {
    pub fn include_template_dir(&self) -> String {
        self.include_template_dir
            .clone()
            .unwrap_or_else(|| format!("{}/include", self.template_root))
    }
}

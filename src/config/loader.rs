//! Configuration loader with tier-based merging.
//!
//! Each tier may carry a `classes.yaml` (the class table) and a `config.yaml`
//! (vault settings). Both are merged field-by-field across tiers, later tiers
//! winning.

use super::merge::deep_merge_all;
use super::options::OptionsFactory;
use super::resolver::{ConfigResolver, RawTypeTable};
use super::types::{AppConfig, DEFAULT_CLASSES_YAML};
use crate::collab::TokioFileSystem;
use crate::logging::DiagnosticLog;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// File holding the class table in each tier.
pub const CLASSES_FILE: &str = "classes.yaml";
/// File holding vault settings in each tier.
pub const CONFIG_FILE: &str = "config.yaml";

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Embedded defaults (lowest priority)
    Defaults = 0,
    /// Project-level config ($CWD/notegen/)
    Project = 1,
    /// User-level config (~/.notegen/)
    User = 2,
    /// Environment variables (highest priority)
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Directories of the file-backed tiers.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project-level config directory
    pub project_dir: Option<PathBuf>,
    /// User-level config directory
    pub user_dir: Option<PathBuf>,
    /// Class file replacing every tier's `classes.yaml`
    pub classes_path: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    pub fn discover() -> Self {
        // User dir: NOTEGEN_USER_DIR or ~/.notegen
        let user_dir = std::env::var("NOTEGEN_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".notegen")));

        // Project dir: NOTEGEN_PROJECT_DIR or $CWD/notegen
        let project_dir = std::env::var("NOTEGEN_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("notegen")));

        let classes_path = std::env::var("NOTEGEN_CLASSES_PATH").ok().map(PathBuf::from);

        Self {
            project_dir,
            user_dir,
            classes_path,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
            classes_path: None,
        }
    }

    pub fn with_classes_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.classes_path = Some(path.into());
        self
    }

    /// Tier directories that exist, lowest priority first.
    pub fn existing_dirs(&self) -> Vec<(ConfigTier, &Path)> {
        let mut dirs = Vec::new();
        if let Some(ref dir) = self.project_dir
            && dir.is_dir()
        {
            dirs.push((ConfigTier::Project, dir.as_path()));
        }
        if let Some(ref dir) = self.user_dir
            && dir.is_dir()
        {
            dirs.push((ConfigTier::User, dir.as_path()));
        }
        dirs
    }
}

/// Loaded vault settings and class table.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Paths for each tier
    pub paths: ConfigPaths,
    config: AppConfig,
    classes: RawTypeTable,
    /// Files that contributed, lowest priority first
    sources: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Load configuration from all tiers with proper merging.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover())
    }

    /// Load configuration with explicit paths.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        let mut sources = Vec::new();

        // Tier 1: Defaults (embedded)
        let mut class_layers: Vec<Value> = vec![
            serde_yaml::from_str(DEFAULT_CLASSES_YAML).context("embedded class table")?,
        ];
        let mut config_layers: Vec<Value> = vec![serde_json::to_value(AppConfig::default())?];

        // Tiers 2 and 3: project, then user
        for (tier, dir) in paths.existing_dirs() {
            if let Some(value) = read_yaml(&dir.join(CLASSES_FILE), &mut sources)? {
                debug!(%tier, "Loaded class table");
                class_layers.push(value);
            }
            if let Some(value) = read_yaml(&dir.join(CONFIG_FILE), &mut sources)? {
                debug!(%tier, "Loaded vault config");
                config_layers.push(value);
            }
        }

        // Explicit class file overrides every tier
        if let Some(ref path) = paths.classes_path {
            let value = read_yaml(path, &mut sources)?
                .with_context(|| format!("class file {} not found", path.display()))?;
            class_layers = vec![value];
        }

        let classes = RawTypeTable::from_value(deep_merge_all(class_layers))?;
        let mut config: AppConfig =
            serde_json::from_value(deep_merge_all(config_layers)).context("invalid config.yaml")?;

        // Tier 4: Environment variable overrides
        Self::apply_env_overrides(&mut config);

        Ok(Self {
            paths,
            config,
            classes,
            sources,
        })
    }

    /// Apply environment variable overrides to config.
    fn apply_env_overrides(config: &mut AppConfig) {
        if let Ok(vault_root) = std::env::var("NOTEGEN_VAULT_ROOT") {
            config.paths.vault_root = PathBuf::from(vault_root);
        }

        if let Ok(template_root) = std::env::var("NOTEGEN_TEMPLATE_ROOT") {
            config.paths.template_root = template_root;
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    /// Get the merged class table.
    pub fn classes(&self) -> &RawTypeTable {
        &self.classes
    }

    /// Files read while loading, lowest priority first.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Resolver over the loaded class table.
    pub fn resolver(&self, diagnostics: DiagnosticLog) -> ConfigResolver {
        ConfigResolver::with_config(self.classes.clone(), &self.config, diagnostics)
    }

    /// Options factory checking include templates in the vault on disk.
    pub fn options_factory(&self, diagnostics: DiagnosticLog) -> OptionsFactory {
        let files = TokioFileSystem::new(self.config.paths.vault_root.clone());
        OptionsFactory::new(self.config.clone(), Arc::new(files)).with_diagnostics(diagnostics)
    }
}

/// Parse a YAML tier file. Missing files are skipped, broken ones are errors.
fn read_yaml(path: &Path, sources: &mut Vec<PathBuf>) -> Result<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    sources.push(path.to_path_buf());
    Ok(Some(value))
}

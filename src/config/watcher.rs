//! File watcher for class and vault configuration.
//!
//! Watches the tier directories for changes to `classes.yaml` and
//! `config.yaml`, and emits reload events through a tokio watch channel.
//! Uses debouncing to coalesce rapid file changes. [`ClassRegistry`] holds
//! the current resolver and swaps in a fresh one on reload.

use super::loader::{CLASSES_FILE, CONFIG_FILE, ConfigLoader, ConfigPaths};
use super::resolver::ConfigResolver;
use crate::logging::DiagnosticLog;
use arc_swap::ArcSwap;
use notify_debouncer_mini::{DebouncedEventKind, new_debouncer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Event types emitted when configuration files change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigChangeEvent {
    /// A `classes.yaml` file changed
    ClassesYaml(PathBuf),
    /// A `config.yaml` file changed
    ConfigYaml(PathBuf),
    /// Multiple files changed in quick succession
    BatchChange(Vec<PathBuf>),
    /// Watcher encountered an error
    Error(String),
}

impl ConfigChangeEvent {
    /// Returns true if this event requires a config reload.
    pub fn requires_reload(&self) -> bool {
        !matches!(self, ConfigChangeEvent::Error(_))
    }

    /// Get the affected paths for this event.
    pub fn affected_paths(&self) -> Vec<&Path> {
        match self {
            ConfigChangeEvent::ClassesYaml(p) | ConfigChangeEvent::ConfigYaml(p) => {
                vec![p.as_path()]
            }
            ConfigChangeEvent::BatchChange(paths) => paths.iter().map(|p| p.as_path()).collect(),
            ConfigChangeEvent::Error(_) => vec![],
        }
    }
}

/// Configuration for the file watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Debounce duration for coalescing rapid changes.
    pub debounce_duration: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_millis(500),
        }
    }
}

/// Directories to watch for configuration changes.
#[derive(Debug, Clone, Default)]
pub struct WatchPaths {
    /// Tier directories (project, user)
    pub dirs: Vec<PathBuf>,
    /// Explicit class file, watched through its parent directory
    pub classes_path: Option<PathBuf>,
}

impl WatchPaths {
    pub fn from_config_paths(paths: &ConfigPaths) -> Self {
        Self {
            dirs: paths
                .existing_dirs()
                .into_iter()
                .map(|(_, dir)| dir.to_path_buf())
                .collect(),
            classes_path: paths.classes_path.clone(),
        }
    }
}

/// Handle to control the config watcher.
pub struct ConfigWatcherHandle {
    /// Receiver for config change events.
    /// Cloning this receiver will allow multiple consumers to receive events.
    pub events: watch::Receiver<Option<ConfigChangeEvent>>,
    /// Handle to the watcher task (dropping this will stop the watcher).
    _task_handle: tokio::task::JoinHandle<()>,
}

impl ConfigWatcherHandle {
    /// Wait for the next config change event.
    pub async fn wait_for_change(&mut self) -> Option<ConfigChangeEvent> {
        // Skip the initial None value
        loop {
            if self.events.changed().await.is_err() {
                return None; // Sender dropped
            }
            let event = self.events.borrow().clone();
            if event.is_some() {
                return event;
            }
        }
    }

    /// Get the latest event without waiting.
    pub fn latest_event(&self) -> Option<ConfigChangeEvent> {
        self.events.borrow().clone()
    }
}

/// Starts the configuration file watcher.
///
/// Directories that do not exist are skipped with a warning.
pub fn start_config_watcher(
    paths: WatchPaths,
    config: WatcherConfig,
) -> Result<ConfigWatcherHandle, notify::Error> {
    let (event_tx, event_rx) = watch::channel(None);
    let (notify_tx, notify_rx) = mpsc::channel();

    // Create the debounced watcher
    let mut debouncer = new_debouncer(config.debounce_duration, notify_tx)?;
    let watcher = debouncer.watcher();

    let explicit_dir = paths
        .classes_path
        .as_ref()
        .and_then(|p| p.parent())
        .map(|p| p.to_path_buf());

    for dir in paths.dirs.iter().chain(explicit_dir.iter()) {
        if dir.exists() {
            info!("Watching config directory: {}", dir.display());
            watcher.watch(dir, notify::RecursiveMode::NonRecursive)?;
        } else {
            warn!(
                "Config directory does not exist, skipping watch: {}",
                dir.display()
            );
        }
    }

    // Spawn the event processing task
    let task_handle = tokio::task::spawn_blocking(move || {
        // Keep the debouncer alive
        let _debouncer = debouncer;
        process_notify_events(notify_rx, event_tx, &paths);
    });

    Ok(ConfigWatcherHandle {
        events: event_rx,
        _task_handle: task_handle,
    })
}

/// Process events from the notify debouncer and convert to ConfigChangeEvents.
fn process_notify_events(
    rx: mpsc::Receiver<Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>>,
    tx: watch::Sender<Option<ConfigChangeEvent>>,
    paths: &WatchPaths,
) {
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                if let Some(event) = classify_events(events, paths) {
                    debug!("Config change detected: {:?}", event);
                    if tx.send(Some(event)).is_err() {
                        info!("Config watcher receiver dropped, stopping");
                        return;
                    }
                }
            }
            Ok(Err(e)) => {
                error!("File watcher error: {}", e);
                let _ = tx.send(Some(ConfigChangeEvent::Error(e.to_string())));
            }
            Err(_) => {
                info!("Config watcher channel closed, stopping");
                return;
            }
        }
    }
}

/// Fold one debounced batch into a single event.
fn classify_events(
    events: Vec<notify_debouncer_mini::DebouncedEvent>,
    paths: &WatchPaths,
) -> Option<ConfigChangeEvent> {
    let mut changed: Vec<ConfigChangeEvent> = events
        .into_iter()
        .filter(|event| {
            matches!(
                event.kind,
                DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
            )
        })
        .filter_map(|event| classify_path(&event.path, paths))
        .collect();

    if changed.len() > 1 {
        let batch = changed
            .iter()
            .flat_map(|e| e.affected_paths())
            .map(Path::to_path_buf)
            .collect();
        return Some(ConfigChangeEvent::BatchChange(batch));
    }
    changed.pop()
}

/// Classify a single path into a ConfigChangeEvent.
fn classify_path(path: &Path, paths: &WatchPaths) -> Option<ConfigChangeEvent> {
    if paths.classes_path.as_deref() == Some(path) {
        return Some(ConfigChangeEvent::ClassesYaml(path.to_path_buf()));
    }

    match path.file_name().and_then(|n| n.to_str()) {
        Some(CLASSES_FILE) => Some(ConfigChangeEvent::ClassesYaml(path.to_path_buf())),
        Some(CONFIG_FILE) => Some(ConfigChangeEvent::ConfigYaml(path.to_path_buf())),
        _ => None,
    }
}

/// What one load produced.
#[derive(Debug)]
pub struct RegistrySnapshot {
    pub loader: ConfigLoader,
    pub resolver: ConfigResolver,
}

/// The current class table and resolver, replaced wholesale on reload.
///
/// Readers take a snapshot and keep using it even if a reload happens
/// meanwhile; the memo cache of the old resolver dies with the snapshot.
pub struct ClassRegistry {
    paths: ConfigPaths,
    diagnostics: DiagnosticLog,
    current: ArcSwap<RegistrySnapshot>,
}

impl ClassRegistry {
    pub fn load(paths: ConfigPaths, diagnostics: DiagnosticLog) -> anyhow::Result<Self> {
        let snapshot = Self::build(&paths, &diagnostics)?;
        Ok(Self {
            paths,
            diagnostics,
            current: ArcSwap::from_pointee(snapshot),
        })
    }

    fn build(paths: &ConfigPaths, diagnostics: &DiagnosticLog) -> anyhow::Result<RegistrySnapshot> {
        let loader = ConfigLoader::load_with_paths(paths.clone())?;
        let resolver = loader.resolver(diagnostics.clone());
        Ok(RegistrySnapshot { loader, resolver })
    }

    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.load_full()
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    /// Reload every tier. On failure the previous snapshot stays current.
    pub fn reload(&self) -> anyhow::Result<()> {
        match Self::build(&self.paths, &self.diagnostics) {
            Ok(snapshot) => {
                info!(
                    classes = snapshot.loader.classes().len(),
                    "Reloaded class configuration"
                );
                self.current.store(Arc::new(snapshot));
                Ok(())
            }
            Err(e) => {
                warn!("Reload failed, keeping previous configuration: {:#}", e);
                Err(e)
            }
        }
    }
}

//! Structured diagnostics for the tolerant paths of class resolution.
//!
//! Several authoring mistakes are non-fatal (unknown classes,
//! operators aimed at non-array fields, unbound template placeholders). They
//! still have to be visible, so every one of them goes through a
//! [`DiagnosticLog`], which outputs to two backends:
//! - tracing (stderr/file), always
//! - an in-memory record that callers and tests can inspect

use serde::Serialize;
use std::sync::{
    Arc, Mutex, MutexGuard,
    atomic::{AtomicU8, Ordering},
};
use tracing::Level;

/// Severity of a diagnostic, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Debug,
    Info,
    Warning,
}

impl Severity {
    fn to_u8(self) -> u8 {
        match self {
            Severity::Debug => 0,
            Severity::Info => 1,
            Severity::Warning => 2,
        }
    }

    fn from_u8(val: u8) -> Self {
        match val {
            0 => Severity::Debug,
            1 => Severity::Info,
            _ => Severity::Warning,
        }
    }

    /// Convert to the tracing level used when emitting.
    pub fn to_tracing(self) -> Level {
        match self {
            Severity::Debug => Level::DEBUG,
            Severity::Info => Level::INFO,
            Severity::Warning => Level::WARN,
        }
    }
}

/// Atomic severity filter deciding which diagnostics get recorded.
pub struct SeverityFilter(AtomicU8);

impl SeverityFilter {
    pub fn new(severity: Severity) -> Self {
        Self(AtomicU8::new(severity.to_u8()))
    }

    pub fn get(&self) -> Severity {
        Severity::from_u8(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, severity: Severity) {
        self.0.store(severity.to_u8(), Ordering::Relaxed);
    }

    pub fn should_record(&self, severity: Severity) -> bool {
        severity.to_u8() >= self.0.load(Ordering::Relaxed)
    }
}

impl Default for SeverityFilter {
    fn default() -> Self {
        Self::new(Severity::Debug)
    }
}

/// What kind of tolerated condition was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Requested class is not in the table; resolved as empty.
    UnknownType,
    /// An `_add`/`_replace`/`_delete` operator targeted a non-array field.
    MergeTypeMismatch,
    /// An operator key carried a value of the wrong shape.
    MalformedOperator,
    /// An operator on a class with no parent; there is nothing to apply it to.
    InertOperator,
    /// A `${name}` placeholder had no binding.
    MissingTemplateBinding,
    /// `include_default_templates` is on but the include file is absent.
    MissingIncludeTemplate,
}

/// One recorded diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub type_name: String,
    pub message: String,
}

/// Cloneable diagnostic sink shared by the resolver and options factory.
#[derive(Clone, Default)]
pub struct DiagnosticLog {
    records: Arc<Mutex<Vec<Diagnostic>>>,
    filter: Arc<SeverityFilter>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter shared by every clone of this log.
    pub fn with_filter(mut self, filter: Arc<SeverityFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Emit a diagnostic to tracing and record it if it passes the filter.
    pub fn log(
        &self,
        severity: Severity,
        kind: DiagnosticKind,
        type_name: &str,
        message: impl Into<String>,
    ) {
        let message = message.into();

        match severity.to_tracing() {
            Level::WARN => tracing::warn!(class = %type_name, kind = ?kind, "{}", message),
            Level::INFO => tracing::info!(class = %type_name, kind = ?kind, "{}", message),
            _ => tracing::debug!(class = %type_name, kind = ?kind, "{}", message),
        }

        if !self.filter.should_record(severity) {
            return;
        }
        self.lock_records().push(Diagnostic {
            severity,
            kind,
            type_name: type_name.to_string(),
            message,
        });
    }

    pub fn warning(&self, kind: DiagnosticKind, type_name: &str, message: impl Into<String>) {
        self.log(Severity::Warning, kind, type_name, message);
    }

    pub fn debug(&self, kind: DiagnosticKind, type_name: &str, message: impl Into<String>) {
        self.log(Severity::Debug, kind, type_name, message);
    }

    /// Snapshot of everything recorded so far.
    pub fn records(&self) -> Vec<Diagnostic> {
        self.lock_records().clone()
    }

    /// Records of one kind.
    pub fn of_kind(&self, kind: DiagnosticKind) -> Vec<Diagnostic> {
        self.records()
            .into_iter()
            .filter(|d| d.kind == kind)
            .collect()
    }

    /// Drain all records.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock_records())
    }

    // A panic elsewhere must not cost us the records already pushed
    fn lock_records(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for DiagnosticLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticLog")
            .field("records", &self.records().len())
            .field("filter", &self.filter.get())
            .finish()
    }
}

//! Structured error types for class configuration resolution.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authoring errors
    ExtendsCycle,
    NotAString,
    InvalidTable,
    InvalidConfig,

    // Collaborator errors
    FileCheckFailed,

    // Internal errors
    InternalError,
}

/// Structured error raised by the configuration engine.
#[derive(Debug, Clone, Serialize)]
pub struct EngineError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl EngineError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            type_name: None,
            details: None,
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    /// A class `_extends` chain that loops back onto itself.
    ///
    /// `chain` is the active resolution path, leaf first, ending with the
    /// type that was revisited.
    pub fn extends_cycle(chain: &[String]) -> Self {
        let leaf = chain.first().cloned().unwrap_or_default();
        Self::new(
            ErrorCode::ExtendsCycle,
            format!("extends cycle: {}", chain.join(" -> ")),
        )
        .with_type(leaf)
    }

    pub fn not_a_string(value: &serde_json::Value) -> Self {
        Self::new(
            ErrorCode::NotAString,
            format!("string set items must be strings, got {}", value),
        )
    }

    pub fn invalid_table(reason: &str) -> Self {
        Self::new(
            ErrorCode::InvalidTable,
            format!("invalid class table: {}", reason),
        )
    }

    pub fn invalid_config(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InvalidConfig, err.to_string())
    }

    pub fn file_check(path: &str, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::FileCheckFailed,
            format!("could not check whether {} exists", path),
        )
        .with_details(err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.details {
            Some(ref details) => write!(f, "{}: {}", self.message, details),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for EngineError {}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<EngineError>() {
            Ok(engine_err) => engine_err,
            Err(err) => EngineError::internal(err),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

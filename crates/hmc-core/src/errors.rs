//! Structured error types shared across HMC crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`HmcError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (identifiers, sizes, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the HMC sampler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum HmcError {
    /// Caller violated a documented precondition (programming error).
    #[error("precondition violated: {0}")]
    Precondition(ErrorInfo),
    /// Operation is not available in the current driver mode.
    #[error("unsupported mode: {0}")]
    UnsupportedMode(ErrorInfo),
    /// Attribute store lookups and writes.
    #[error("store error: {0}")]
    Store(ErrorInfo),
    /// Failures reported by a scoring function.
    #[error("scoring error: {0}")]
    Scoring(ErrorInfo),
    /// Randomness and seeding errors.
    #[error("rng error: {0}")]
    Rng(ErrorInfo),
    /// Serialization, schema and file errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl HmcError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            HmcError::Precondition(info)
            | HmcError::UnsupportedMode(info)
            | HmcError::Store(info)
            | HmcError::Scoring(info)
            | HmcError::Rng(info)
            | HmcError::Serde(info) => info,
        }
    }

    /// Shorthand for a [`HmcError::Precondition`] without context.
    pub fn precondition(code: impl Into<String>, message: impl Into<String>) -> Self {
        HmcError::Precondition(ErrorInfo::new(code, message))
    }

    /// Wraps an I/O or parse failure on `path` into a [`HmcError::Serde`].
    pub fn serde_at(
        code: impl Into<String>,
        err: impl Display,
        path: &std::path::Path,
    ) -> Self {
        HmcError::Serde(
            ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
        )
    }
}

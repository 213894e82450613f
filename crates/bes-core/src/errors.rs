//! Structured error types shared across the sweep crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`SweepError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (paths, run identifiers, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the operator resolve the issue.
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

/// Canonical error type for the sweep pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SweepError {
    /// Missing or malformed configuration, detected before any job runs.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// A parameter value could not be used for the requested operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(ErrorInfo),
    /// The external engine could not be launched or did not finish in time.
    #[error("engine error: {0}")]
    Engine(ErrorInfo),
    /// The per-run result store could not be read.
    #[error("store error: {0}")]
    Store(ErrorInfo),
    /// Aggregation failed, e.g. because no run produced a valid record.
    #[error("dataset error: {0}")]
    Dataset(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
    /// Filesystem errors outside of a single job's scratch area.
    #[error("io error: {0}")]
    Io(ErrorInfo),
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

impl SweepError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            SweepError::Config(info)
            | SweepError::InvalidArgument(info)
            | SweepError::Engine(info)
            | SweepError::Store(info)
            | SweepError::Dataset(info)
            | SweepError::Serde(info)
            | SweepError::Io(info) => info,
        }
    }

    /// Whether this error is allowed to terminate a sweep.
    ///
    /// Engine, store and argument failures belong to a single job and are
    /// folded into that job's record instead.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            SweepError::InvalidArgument(_) | SweepError::Engine(_) | SweepError::Store(_)
        )
    }
}

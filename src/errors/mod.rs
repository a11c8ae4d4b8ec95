//! Error taxonomy for configuration, report ingestion and host calls.

use std::path::PathBuf;

use serde::Serialize;

use crate::models::dialect::Dialect;

/// Configuration problems detected while resolving settings.
///
/// Resolution fails fast: the first invalid dialect setting aborts it.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown charset '{label}' for {key}")]
    UnknownCharset { key: String, label: String },

    #[error("Invalid pattern for {key}: {source}")]
    InvalidPattern {
        key: String,
        #[source]
        source: regex::Error,
    },

    #[error("Pattern for {key} lacks capture groups: {}", .missing.join(", "))]
    MissingGroups { key: String, missing: Vec<String> },

    #[error("Invalid base directory '{}': {reason}", .path.display())]
    InvalidBaseDir { path: PathBuf, reason: String },
}

/// Failure reported by a host collaborator.
///
/// This is the only error allowed to end a run early.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{operation} failed: {message}")]
pub struct HostError {
    pub operation: String,
    pub message: String,
}

impl HostError {
    pub fn new(operation: &str, message: impl Into<String>) -> Self {
        Self {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}

/// Failures while locating or reading a single report.
///
/// Everything except `Host` is isolated to the report that raised it.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("No report path configured for {dialect}")]
    NotConfigured { dialect: Dialect },

    #[error("Report not found: {}", .path.display())]
    ReportNotFound { path: PathBuf },

    #[error("Cannot decode report {} as {charset}", .path.display())]
    Decode { path: PathBuf, charset: String },

    #[error("Malformed report {}: {reason}", .path.display())]
    Schema { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

/// Pipeline stage a per-report failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Locate,
    Read,
    Decode,
    Parse,
    Publish,
}

impl IngestError {
    /// Check if this error is the silent "dialect not configured" case.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured { .. })
    }

    /// Check if this error must end the run instead of skipping a report.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Host(_))
    }

    pub fn stage(&self) -> FailureStage {
        match self {
            Self::NotConfigured { .. } | Self::ReportNotFound { .. } => FailureStage::Locate,
            Self::Io { .. } => FailureStage::Read,
            Self::Decode { .. } => FailureStage::Decode,
            Self::Schema { .. } => FailureStage::Parse,
            Self::Host(_) => FailureStage::Publish,
        }
    }
}

//! Append-only job log entries.
//!
//! Every pipeline event is mirrored to operational logging; only a
//! subset is written to durable storage. The `should_persist` predicate
//! decides which, independently of the call sites.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::JobId;

/// Log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Steps that are persisted even at `info` severity.
const IMPORTANT_STEPS: &[&str] = &[
    "validation_failed",
    "validation_error",
    "processing_start",
    "processing_complete",
    "processing_error",
    "encoding_error",
    "analysis_error",
    "status_update",
];

/// Whether an event is written to the document store.
///
/// Warnings and errors always persist; info-level events only when the
/// step is on the important-steps allow-list.
pub fn should_persist(level: LogLevel, step: &str) -> bool {
    match level {
        LogLevel::Warn | LogLevel::Error => true,
        LogLevel::Info => IMPORTANT_STEPS.contains(&step),
    }
}

/// One append-only log record for a job. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobLogEntry {
    /// Job this entry belongs to
    pub job_id: JobId,

    /// Free-form step tag, e.g. `processing_start`, `encoding_error`
    pub step: String,

    /// Human-readable message
    pub message: String,

    /// Severity
    #[serde(default)]
    pub level: LogLevel,

    /// Elapsed time for the step, milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// When the event happened
    pub timestamp: DateTime<Utc>,

    /// Optional structured metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl JobLogEntry {
    /// Create an entry timestamped now.
    pub fn new(
        job_id: JobId,
        step: impl Into<String>,
        message: impl Into<String>,
        level: LogLevel,
    ) -> Self {
        Self {
            job_id,
            step: step.into(),
            message: message.into(),
            level,
            duration_ms: None,
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    /// Attach an elapsed-time measurement.
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Attach structured metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

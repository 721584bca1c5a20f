//! Job record and status state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a transcode job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job processing status.
///
/// Transitions are monotonic: once a job reaches `Done` or `Failed`
/// it never leaves that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Request accepted, not yet picked up
    #[default]
    Pending,
    /// Download/encode in progress
    Processing,
    /// Delivery artifact produced and published
    Done,
    /// Terminal failure; error recorded on the job
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    /// Explicit transition table. The only legal edges are
    /// `pending -> processing`, `processing -> done` and
    /// `processing -> failed`.
    pub fn can_transition(from: JobStatus, to: JobStatus) -> bool {
        matches!(
            (from, to),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Done)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rejected status edge.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("illegal status transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// Persisted record for one transcode job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoJob {
    /// Unique job ID
    pub id: JobId,

    /// Guild/server the upload came from
    pub server_id: String,

    /// User who uploaded the source
    pub uploader_id: String,

    /// Channel to deliver the result into
    pub channel_id: String,

    /// Source video URL (http/https)
    pub source_url: String,

    /// Queue the response is published to
    pub callback_queue: String,

    /// Current status
    #[serde(default)]
    pub status: JobStatus,

    /// Signed URL of the delivery artifact
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,

    /// Measured duration of the output, seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_duration_secs: Option<f64>,

    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl VideoJob {
    /// Create a new pending job from an accepted request.
    pub fn new(
        server_id: impl Into<String>,
        uploader_id: impl Into<String>,
        channel_id: impl Into<String>,
        source_url: impl Into<String>,
        callback_queue: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            server_id: server_id.into(),
            uploader_id: uploader_id.into(),
            channel_id: channel_id.into(),
            source_url: source_url.into(),
            callback_queue: callback_queue.into(),
            status: JobStatus::Pending,
            result_url: None,
            output_duration_secs: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(&mut self, to: JobStatus) -> Result<(), TransitionError> {
        if !JobStatus::can_transition(self.status, to) {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Move the job into `Processing`.
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(JobStatus::Processing)
    }

    /// Terminate successfully with the delivery URL and measured duration.
    pub fn finish(
        &mut self,
        result_url: impl Into<String>,
        output_duration_secs: f64,
    ) -> Result<(), TransitionError> {
        self.transition(JobStatus::Done)?;
        self.result_url = Some(result_url.into());
        self.output_duration_secs = Some(output_duration_secs);
        Ok(())
    }

    /// Terminate with a failure message.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Failed)?;
        self.error_message = Some(error.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> VideoJob {
        VideoJob::new("srv", "user", "chan", "https://example.com/a.mp4", "cb")
    }

    #[test]
    fn test_new_job_is_pending() {
        let j = job();
        assert_eq!(j.status, JobStatus::Pending);
        assert!(j.result_url.is_none());
        assert!(!j.status.is_terminal());
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut j = job();
        j.start().unwrap();
        assert_eq!(j.status, JobStatus::Processing);

        j.finish("https://signed.example/out.mp4", 12.7).unwrap();
        assert_eq!(j.status, JobStatus::Done);
        assert_eq!(j.output_duration_secs, Some(12.7));
        assert!(j.status.is_terminal());
    }

    #[test]
    fn test_failure_path() {
        let mut j = job();
        j.start().unwrap();
        j.fail("encoder exploded").unwrap();
        assert_eq!(j.status, JobStatus::Failed);
        assert_eq!(j.error_message.as_deref(), Some("encoder exploded"));
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let mut j = job();
        j.start().unwrap();
        j.finish("url", 1.0).unwrap();

        assert!(j.fail("late error").is_err());
        assert!(j.start().is_err());
        assert_eq!(j.status, JobStatus::Done);
    }

    #[test]
    fn test_no_skipping_processing() {
        let mut j = job();
        // pending -> done and pending -> failed are not in the table
        assert!(j.finish("url", 1.0).is_err());
        assert!(j.fail("err").is_err());
        assert_eq!(j.status, JobStatus::Pending);
    }

    #[test]
    fn test_transition_table() {
        use JobStatus::*;
        let all = [Pending, Processing, Done, Failed];
        for from in all {
            for to in all {
                let legal = matches!((from, to), (Pending, Processing) | (Processing, Done) | (Processing, Failed));
                assert_eq!(JobStatus::can_transition(from, to), legal, "{from} -> {to}");
            }
        }
    }
}

//! Job lifecycle tracking.
//!
//! Every event is mirrored to operational logging; durable writes go
//! through the persistence allow-list. A failed durable write is logged
//! and swallowed so bookkeeping can never take down a transcode that is
//! otherwise succeeding.

use tracing::{error, info, warn};

use vidpress_firestore::{JobLogRepository, JobRepository};
use vidpress_models::{should_persist, JobLogEntry, JobStatus, LogLevel, VideoJob};

/// Tracks one job's status and log trail.
#[derive(Clone)]
pub struct JobTracker {
    jobs: JobRepository,
    logs: JobLogRepository,
}

impl JobTracker {
    pub fn new(jobs: JobRepository, logs: JobLogRepository) -> Self {
        Self { jobs, logs }
    }

    /// Write the initial job record.
    pub async fn create_job(&self, job: &VideoJob) {
        if let Err(e) = self.jobs.create(job).await {
            warn!("Failed to persist job record {}: {}", job.id, e);
        }
    }

    /// Record one pipeline event.
    ///
    /// Always mirrored to tracing at the entry's severity; persisted
    /// only when the allow-list says so.
    pub async fn record(&self, entry: JobLogEntry) {
        match entry.level {
            LogLevel::Info => info!(job_id = %entry.job_id, step = %entry.step, "{}", entry.message),
            LogLevel::Warn => warn!(job_id = %entry.job_id, step = %entry.step, "{}", entry.message),
            LogLevel::Error => {
                error!(job_id = %entry.job_id, step = %entry.step, "{}", entry.message)
            }
        }

        if should_persist(entry.level, &entry.step) {
            if let Err(e) = self.logs.append(&entry).await {
                warn!("Failed to persist log entry for {}: {}", entry.job_id, e);
            }
        }
    }

    /// Advance the in-memory job state and persist the new status.
    ///
    /// The transition goes through the job's state machine first; an
    /// illegal edge is a programming error and is logged, not persisted.
    pub async fn set_status(&self, job: &mut VideoJob, to: JobStatus) {
        let result = match to {
            JobStatus::Processing => job.start(),
            // Done/Failed carry payloads; callers use finish_job/fail_job.
            other => {
                warn!("set_status called with terminal state {}", other);
                return;
            }
        };

        if let Err(e) = result {
            error!(job_id = %job.id, "{}", e);
            return;
        }

        self.persist_status(job).await;
    }

    /// Terminate successfully and persist the result.
    pub async fn finish_job(&self, job: &mut VideoJob, result_url: &str, duration_secs: f64) {
        if let Err(e) = job.finish(result_url, duration_secs) {
            error!(job_id = %job.id, "{}", e);
            return;
        }

        if let Err(e) = self.jobs.set_result(&job.id, result_url, duration_secs).await {
            warn!("Failed to persist result for {}: {}", job.id, e);
        }
        self.persist_status(job).await;
    }

    /// Terminate with a failure and persist the error.
    pub async fn fail_job(&self, job: &mut VideoJob, error_message: &str) {
        if let Err(e) = job.fail(error_message) {
            error!(job_id = %job.id, "{}", e);
            return;
        }

        if let Err(e) = self.jobs.set_error(&job.id, error_message).await {
            warn!("Failed to persist error for {}: {}", job.id, e);
        }
        self.persist_status(job).await;
    }

    async fn persist_status(&self, job: &VideoJob) {
        if let Err(e) = self.jobs.set_status(&job.id, job.status).await {
            warn!("Failed to persist status for {}: {}", job.id, e);
        }

        self.record(JobLogEntry::new(
            job.id.clone(),
            "status_update",
            format!("Status changed to {}", job.status),
            LogLevel::Info,
        ))
        .await;
    }
}

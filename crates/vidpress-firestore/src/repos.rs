//! Job and job-log repositories over the Firestore client.

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use vidpress_models::{JobId, JobLogEntry, JobStatus, VideoJob};

use crate::client::FirestoreClient;
use crate::error::FirestoreResult;
use crate::types::{ToFirestoreValue, Value};

/// Collection holding one document per job.
pub const JOBS_COLLECTION: &str = "video_jobs";

/// Collection holding append-only log entries.
pub const JOB_LOGS_COLLECTION: &str = "video_job_logs";

/// Persistence for job records.
#[derive(Clone)]
pub struct JobRepository {
    client: FirestoreClient,
}

impl JobRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Write the initial job record.
    pub async fn create(&self, job: &VideoJob) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("id".to_string(), job.id.as_str().to_firestore_value());
        fields.insert("serverId".to_string(), job.server_id.to_firestore_value());
        fields.insert(
            "uploaderId".to_string(),
            job.uploader_id.to_firestore_value(),
        );
        fields.insert("channelId".to_string(), job.channel_id.to_firestore_value());
        fields.insert("sourceUrl".to_string(), job.source_url.to_firestore_value());
        fields.insert(
            "callbackQueue".to_string(),
            job.callback_queue.to_firestore_value(),
        );
        fields.insert(
            "status".to_string(),
            job.status.as_str().to_firestore_value(),
        );
        fields.insert("createdAt".to_string(), job.created_at.to_firestore_value());
        fields.insert("updatedAt".to_string(), job.updated_at.to_firestore_value());

        self.client
            .create_document(JOBS_COLLECTION, job.id.as_str(), fields)
            .await?;
        debug!("Created job record {}", job.id);
        Ok(())
    }

    /// Update the status field (and updatedAt).
    pub async fn set_status(&self, job_id: &JobId, status: JobStatus) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), status.as_str().to_firestore_value());
        fields.insert(
            "updatedAt".to_string(),
            chrono::Utc::now().to_firestore_value(),
        );

        self.client
            .update_document(
                JOBS_COLLECTION,
                job_id.as_str(),
                fields,
                Some(vec!["status".to_string(), "updatedAt".to_string()]),
            )
            .await?;
        Ok(())
    }

    /// Record the delivery URL and measured output duration.
    pub async fn set_result(
        &self,
        job_id: &JobId,
        result_url: &str,
        output_duration_secs: f64,
    ) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("resultUrl".to_string(), result_url.to_firestore_value());
        fields.insert(
            "outputDurationSecs".to_string(),
            output_duration_secs.to_firestore_value(),
        );
        fields.insert(
            "updatedAt".to_string(),
            chrono::Utc::now().to_firestore_value(),
        );

        self.client
            .update_document(
                JOBS_COLLECTION,
                job_id.as_str(),
                fields,
                Some(vec![
                    "resultUrl".to_string(),
                    "outputDurationSecs".to_string(),
                    "updatedAt".to_string(),
                ]),
            )
            .await?;
        Ok(())
    }

    /// Record a terminal error message.
    pub async fn set_error(&self, job_id: &JobId, error_message: &str) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert(
            "errorMessage".to_string(),
            error_message.to_firestore_value(),
        );
        fields.insert(
            "updatedAt".to_string(),
            chrono::Utc::now().to_firestore_value(),
        );

        self.client
            .update_document(
                JOBS_COLLECTION,
                job_id.as_str(),
                fields,
                Some(vec!["errorMessage".to_string(), "updatedAt".to_string()]),
            )
            .await?;
        Ok(())
    }
}

/// Append-only persistence for job log entries.
#[derive(Clone)]
pub struct JobLogRepository {
    client: FirestoreClient,
}

impl JobLogRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Append one entry. Entries are never mutated or deleted.
    pub async fn append(&self, entry: &JobLogEntry) -> FirestoreResult<()> {
        let doc_id = Uuid::new_v4().to_string();
        self.client
            .create_document(JOB_LOGS_COLLECTION, &doc_id, log_entry_fields(entry))
            .await?;
        Ok(())
    }
}

fn log_entry_fields(entry: &JobLogEntry) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("jobId".to_string(), entry.job_id.as_str().to_firestore_value());
    fields.insert("step".to_string(), entry.step.to_firestore_value());
    fields.insert("message".to_string(), entry.message.to_firestore_value());
    fields.insert(
        "level".to_string(),
        entry.level.as_str().to_firestore_value(),
    );
    fields.insert("timestamp".to_string(), entry.timestamp.to_firestore_value());
    if let Some(ms) = entry.duration_ms {
        fields.insert("durationMs".to_string(), ms.to_firestore_value());
    }
    if let Some(ref meta) = entry.metadata {
        fields.insert("metadata".to_string(), meta.to_firestore_value());
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidpress_models::LogLevel;

    #[test]
    fn test_log_entry_fields_layout() {
        let entry = JobLogEntry::new(
            JobId::from_string("job-1"),
            "processing_start",
            "started",
            LogLevel::Info,
        )
        .with_duration_ms(7)
        .with_metadata(serde_json::json!({"width": 1920}));

        let fields = log_entry_fields(&entry);
        assert!(matches!(
            fields.get("jobId"),
            Some(Value::StringValue(s)) if s == "job-1"
        ));
        assert!(matches!(
            fields.get("level"),
            Some(Value::StringValue(s)) if s == "info"
        ));
        assert!(matches!(fields.get("durationMs"), Some(Value::IntegerValue(_))));
        assert!(matches!(fields.get("metadata"), Some(Value::MapValue(_))));
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let entry = JobLogEntry::new(JobId::new(), "status_update", "pending", LogLevel::Info);
        let fields = log_entry_fields(&entry);
        assert!(!fields.contains_key("durationMs"));
        assert!(!fields.contains_key("metadata"));
    }
}

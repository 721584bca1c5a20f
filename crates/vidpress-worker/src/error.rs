//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] vidpress_models::RequestError),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Download timed out after {0}s")]
    DownloadTimeout(u64),

    #[error("Source not found (404): {0}")]
    SourceNotFound(String),

    #[error("Source access denied (403): {0}")]
    SourceForbidden(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Media error: {0}")]
    Media(#[from] vidpress_media::MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] vidpress_storage::StorageError),

    #[error("Firestore error: {0}")]
    Firestore(#[from] vidpress_firestore::FirestoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] vidpress_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Step tag recorded in the job log for this failure class.
    ///
    /// Validation rule violations (wrong URL, wrong size) are
    /// `validation_failed`; a source we could not even stat is
    /// `validation_error`.
    pub fn log_step(&self) -> &'static str {
        match self {
            WorkerError::InvalidRequest(_) => "validation_failed",
            WorkerError::DownloadFailed(_)
            | WorkerError::DownloadTimeout(_)
            | WorkerError::SourceNotFound(_)
            | WorkerError::SourceForbidden(_) => "processing_error",
            WorkerError::Media(vidpress_media::MediaError::SourceTooSmall { .. })
            | WorkerError::Media(vidpress_media::MediaError::SourceTooLarge { .. }) => {
                "validation_failed"
            }
            WorkerError::Media(vidpress_media::MediaError::SourceUnreadable { .. }) => {
                "validation_error"
            }
            WorkerError::Media(vidpress_media::MediaError::EncodeFailed { .. }) => "encoding_error",
            WorkerError::Media(vidpress_media::MediaError::ProbeFailed { .. })
            | WorkerError::Media(vidpress_media::MediaError::InvalidMedia(_)) => "analysis_error",
            _ => "processing_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidpress_media::MediaError;

    #[test]
    fn test_log_step_classification() {
        assert_eq!(
            WorkerError::DownloadTimeout(60).log_step(),
            "processing_error"
        );
        assert_eq!(
            WorkerError::Media(MediaError::encode_failed("encoding", "boom", None, Some(1)))
                .log_step(),
            "encoding_error"
        );
        assert_eq!(
            WorkerError::Media(MediaError::InvalidMedia("no video".into())).log_step(),
            "analysis_error"
        );
    }

    // Size-limit violations are the same class as a malformed request:
    // the input broke a rule. Only a source we could not inspect at all
    // counts as a validation *error*.
    #[test]
    fn test_size_rule_violations_tagged_validation_failed() {
        assert_eq!(
            WorkerError::Media(MediaError::SourceTooSmall { size: 3 }).log_step(),
            "validation_failed"
        );
        assert_eq!(
            WorkerError::Media(MediaError::SourceTooLarge {
                size: 600 * 1024 * 1024,
                limit: 500 * 1024 * 1024,
            })
            .log_step(),
            "validation_failed"
        );
        assert_eq!(
            WorkerError::Media(MediaError::SourceUnreadable {
                path: "/tmp/x/source.mp4".into(),
                message: "permission denied".into(),
            })
            .log_step(),
            "validation_error"
        );
    }
}

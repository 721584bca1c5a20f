//! Queue wire schemas.
//!
//! Field names are camelCase to match the message contract consumed and
//! produced by the bot side.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Why an inbound request was rejected before a job record existed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("originalVideoUrl must be an http or https URL")]
    InvalidSourceUrl,

    #[error("callbackQueue must not be empty")]
    MissingCallbackQueue,
}

/// Inbound transcode request, consumed from the request stream.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranscodeRequest {
    pub server_id: String,
    pub uploader_id: String,
    pub original_video_url: String,
    pub channel_id: String,
    pub callback_queue: String,
}

impl TranscodeRequest {
    /// Pre-flight checks performed before any job record is created.
    ///
    /// The source URL must parse and carry an http/https scheme; the
    /// callback destination must be named.
    pub fn validate(&self) -> Result<(), RequestError> {
        let url = Url::parse(self.original_video_url.trim())
            .map_err(|_| RequestError::InvalidSourceUrl)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RequestError::InvalidSourceUrl);
        }
        if self.callback_queue.trim().is_empty() {
            return Err(RequestError::MissingCallbackQueue);
        }
        Ok(())
    }
}

/// Outbound response, published to the request's `callbackQueue`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranscodeResponse {
    pub video_id: String,
    pub success: bool,
    pub processed_file_path: String,
    /// Kept for wire compatibility; thumbnails are not generated.
    pub thumbnail_file_path: String,
    pub channel_id: String,
    pub server_id: String,
    pub uploader_id: String,
    /// Output duration in seconds, rounded
    pub duration: u64,
    pub error: String,
}

impl TranscodeResponse {
    /// Skeleton response echoing the request's routing fields.
    pub fn for_request(request: &TranscodeRequest) -> Self {
        Self {
            video_id: String::new(),
            success: false,
            processed_file_path: String::new(),
            thumbnail_file_path: String::new(),
            channel_id: request.channel_id.clone(),
            server_id: request.server_id.clone(),
            uploader_id: request.uploader_id.clone(),
            duration: 0,
            error: String::new(),
        }
    }

    /// Fill in the success fields.
    pub fn succeed(mut self, video_id: impl Into<String>, url: impl Into<String>, duration_secs: f64) -> Self {
        self.video_id = video_id.into();
        self.success = true;
        self.processed_file_path = url.into();
        self.duration = duration_secs.round() as u64;
        self
    }

    /// Fill in the failure fields.
    pub fn fail_with(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = error.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str) -> TranscodeRequest {
        TranscodeRequest {
            server_id: "srv".into(),
            uploader_id: "user".into(),
            original_video_url: url.into(),
            channel_id: "chan".into(),
            callback_queue: "video.callback".into(),
        }
    }

    #[test]
    fn test_valid_urls_pass() {
        assert!(request("https://cdn.example.com/v.mp4").validate().is_ok());
        assert!(request("http://host/v.mp4").validate().is_ok());
        // surrounding whitespace is tolerated, matching the bot's payloads
        assert!(request("  https://host/v.mp4 ").validate().is_ok());
    }

    #[test]
    fn test_malformed_url_is_rejected() {
        assert_eq!(
            request("not-a-url").validate(),
            Err(RequestError::InvalidSourceUrl)
        );
        assert_eq!(request("").validate(), Err(RequestError::InvalidSourceUrl));
        assert_eq!(
            request("ftp://host/v.mp4").validate(),
            Err(RequestError::InvalidSourceUrl)
        );
    }

    #[test]
    fn test_empty_callback_queue_is_rejected() {
        let mut r = request("https://host/v.mp4");
        r.callback_queue = "  ".into();
        assert_eq!(r.validate(), Err(RequestError::MissingCallbackQueue));
    }

    #[test]
    fn test_wire_field_names_are_camel_case() {
        let r = request("https://host/v.mp4");
        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("originalVideoUrl").is_some());
        assert!(json.get("callbackQueue").is_some());

        let resp = TranscodeResponse::for_request(&r).succeed("vid", "https://signed", 12.6);
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("processedFilePath").is_some());
        assert_eq!(json.get("duration").unwrap().as_u64(), Some(13));
    }
}

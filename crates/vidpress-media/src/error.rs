//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("Source file unreadable: {path}: {message}")]
    SourceUnreadable { path: PathBuf, message: String },

    #[error("Source file too small ({size} bytes); likely an empty or corrupt download")]
    SourceTooSmall { size: u64 },

    #[error("Source file too large ({size} bytes, limit {limit})")]
    SourceTooLarge { size: u64, limit: u64 },

    #[error("FFprobe failed: {message}")]
    ProbeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Invalid media file: {0}")]
    InvalidMedia(String),

    #[error("Selected resolution degenerated to {width}x{height}")]
    DegenerateResolution { width: u32, height: u32 },

    #[error("FFmpeg {phase} failed: {message}")]
    EncodeFailed {
        phase: &'static str,
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a probe failure error.
    pub fn probe_failed(message: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ProbeFailed {
            message: message.into(),
            stderr,
        }
    }

    /// Create an encode failure error, keeping only a stderr tail.
    pub fn encode_failed(
        phase: &'static str,
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::EncodeFailed {
            phase,
            message: message.into(),
            stderr: stderr.map(|s| tail(&s, 2048)),
            exit_code,
        }
    }
}

/// Last `max` bytes of a string, on a char boundary.
fn tail(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_tail_is_bounded() {
        let long = "x".repeat(10_000);
        let err = MediaError::encode_failed("encoding", "boom", Some(long), Some(1));
        if let MediaError::EncodeFailed { stderr, .. } = err {
            assert_eq!(stderr.unwrap().len(), 2048);
        } else {
            panic!("wrong variant");
        }
    }
}

//! Shared data models for the vidpress backend.
//!
//! This crate provides Serde-serializable types for:
//! - Job records and the status state machine
//! - Append-only job log entries and the persistence allow-list
//! - Queue wire schemas (transcode request/response)
//! - Probed media profiles and derived encode parameters

pub mod job;
pub mod log;
pub mod media;
pub mod wire;

// Re-export common types
pub use job::{JobId, JobStatus, TransitionError, VideoJob};
pub use log::{should_persist, JobLogEntry, LogLevel};
pub use media::{
    AudioLevels, EncodeParams, MediaProfile, AUDIO_SAMPLE_RATE, DEFAULT_AUDIO_CODEC, DEFAULT_CRF,
    DEFAULT_PRESET, DEFAULT_VIDEO_CODEC,
};
pub use wire::{RequestError, TranscodeRequest, TranscodeResponse};

//! FFmpeg CLI wrapper for the transcoding pipeline.
//!
//! This crate provides:
//! - Pre-flight validation of downloaded source files
//! - Type-safe FFmpeg/FFprobe command building and execution
//! - Media probing and conditional loudness measurement
//! - Pure parameter selection (resolution, bitrate, filter chains)
//! - Single-pass and two-pass encode orchestration
//! - A temp-workspace guard that cleans up on every exit path

pub mod command;
pub mod encode;
pub mod error;
pub mod loudness;
pub mod params;
pub mod probe;
pub mod validate;
pub mod workspace;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use encode::{encode_video, EncodePhase};
pub use error::{MediaError, MediaResult};
pub use loudness::{measure_loudness, needs_loudness_measurement, LOUDNESS_SKIP_THRESHOLD_SECS};
pub use params::select_params;
pub use probe::probe_media;
pub use validate::validate_source;
pub use workspace::JobWorkspace;

//! Probed media profiles and derived encode parameters.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "fast";
/// Quality target for the CRF-with-ceiling strategy
pub const DEFAULT_CRF: u8 = 26;
/// Output audio sample rate
pub const AUDIO_SAMPLE_RATE: u32 = 44_100;

/// Measured audio levels from a volumedetect pass, in dB.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioLevels {
    pub max_volume: f64,
    pub mean_volume: f64,
}

/// What probing learned about a source file. Derived, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MediaProfile {
    /// Original width in pixels
    pub width: u32,
    /// Original height in pixels
    pub height: u32,
    /// Container duration in seconds
    pub duration: f64,
    /// Whether an audio stream is present
    pub has_audio: bool,
    /// Container-reported size in bytes, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Measured loudness; absent for long inputs or when measurement failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_levels: Option<AudioLevels>,
}

impl MediaProfile {
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Derived encoder invocation parameters.
///
/// Width and height are always non-zero multiples of 8 (macroblock
/// alignment required by the encoder).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EncodeParams {
    /// Target width in pixels, multiple of 8
    pub width: u32,
    /// Target height in pixels, multiple of 8
    pub height: u32,
    /// Target video bitrate, kbps
    pub video_bitrate_kbps: u32,
    /// Audio bitrate tag, e.g. "64k"
    pub audio_bitrate: String,
    /// Effective scale factor actually applied (aligned width / original width)
    pub scale_factor: f64,
    /// Ordered video filter chain
    pub video_filters: Vec<String>,
    /// Ordered audio filter chain; loudness normalization is always last
    pub audio_filters: Vec<String>,
    /// Whether the source carries audio at all
    pub has_audio: bool,
    /// Encoder passes: 1 (CRF with bitrate ceiling) or 2 (stats + rate-controlled)
    pub passes: u8,
}

impl EncodeParams {
    /// Buffer size for the rate-control ceiling, kbps.
    pub fn bufsize_kbps(&self) -> u32 {
        self.video_bitrate_kbps + self.video_bitrate_kbps / 2
    }

    /// Combined `-vf` argument value.
    pub fn video_filter_arg(&self) -> String {
        self.video_filters.join(",")
    }

    /// Combined `-af` argument value.
    pub fn audio_filter_arg(&self) -> String {
        self.audio_filters.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bufsize_is_one_and_a_half_times_bitrate() {
        let params = EncodeParams {
            width: 1280,
            height: 720,
            video_bitrate_kbps: 1500,
            audio_bitrate: "80k".into(),
            scale_factor: 1.0,
            video_filters: vec!["scale=1280:720:flags=lanczos".into()],
            audio_filters: vec!["loudnorm=I=-16:TP=-1.5:LRA=11".into()],
            has_audio: true,
            passes: 2,
        };
        assert_eq!(params.bufsize_kbps(), 2250);
        assert_eq!(params.video_filter_arg(), "scale=1280:720:flags=lanczos");
    }
}

//! Audio loudness measurement via a volumedetect pass.
//!
//! This is a decode-and-discard second analysis pass, so it is only
//! worth the latency on short clips; callers skip it entirely above
//! [`LOUDNESS_SKIP_THRESHOLD_SECS`]. Every failure here is non-fatal:
//! the pipeline proceeds without levels rather than aborting.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::warn;

use vidpress_models::AudioLevels;

use crate::command::{FfmpegCommand, FfmpegRunner};

/// Above this duration loudness measurement is skipped; gain correction
/// matters most on short clips and the extra decode is not free.
pub const LOUDNESS_SKIP_THRESHOLD_SECS: f64 = 300.0;

/// Whether a source of the given duration gets a loudness pass.
pub fn needs_loudness_measurement(duration_secs: f64) -> bool {
    duration_secs <= LOUDNESS_SKIP_THRESHOLD_SECS
}

fn max_volume_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"max_volume: (-?\d+\.?\d*) dB").unwrap())
}

fn mean_volume_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"mean_volume: (-?\d+\.?\d*) dB").unwrap())
}

/// Measure max/mean volume of the audio stream.
///
/// Returns `None` when the tool fails or the diagnostic output cannot
/// be parsed; the caller treats both the same as "no measurement".
pub async fn measure_loudness(path: impl AsRef<Path>) -> Option<AudioLevels> {
    let path = path.as_ref();
    let cmd = FfmpegCommand::new_discard(path)
        .audio_filter("volumedetect")
        .arg("-vn");

    let stderr = match FfmpegRunner::new().run(&cmd, "volume analysis").await {
        Ok(stderr) => stderr,
        Err(e) => {
            warn!("Volume analysis failed for {}: {}", path.display(), e);
            return None;
        }
    };

    match parse_volume_report(&stderr) {
        Some(levels) => Some(levels),
        None => {
            warn!(
                "Volume analysis produced no parseable levels for {}",
                path.display()
            );
            None
        }
    }
}

/// Pull the two scalar dB values out of volumedetect's stderr report.
pub fn parse_volume_report(stderr: &str) -> Option<AudioLevels> {
    let max_volume = max_volume_re()
        .captures(stderr)?
        .get(1)?
        .as_str()
        .parse::<f64>()
        .ok()?;
    let mean_volume = mean_volume_re()
        .captures(stderr)?
        .get(1)?
        .as_str()
        .parse::<f64>()
        .ok()?;

    Some(AudioLevels {
        max_volume,
        mean_volume,
    })
}

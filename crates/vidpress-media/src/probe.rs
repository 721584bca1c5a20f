//! FFprobe media inspection.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use vidpress_models::MediaProfile;

use crate::error::{MediaError, MediaResult};

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
}

/// Probe a media file's container and streams.
///
/// Fails when the tool cannot open the file, when no video stream
/// exists, or when the reported duration is not positive. Loudness is
/// never measured here; see [`crate::loudness`].
pub async fn probe_media(path: impl AsRef<Path>) -> MediaResult<MediaProfile> {
    let path = path.as_ref();

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::probe_failed(
            "FFprobe failed",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    profile_from_probe(probe)
}

fn profile_from_probe(probe: FfprobeOutput) -> MediaResult<MediaProfile> {
    if probe.streams.is_empty() {
        return Err(MediaError::InvalidMedia("no streams found".to_string()));
    }

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::InvalidMedia("no video stream found".to_string()))?;

    let (width, height) = match (video_stream.width, video_stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(MediaError::InvalidMedia(
                "video stream has no usable dimensions".to_string(),
            ))
        }
    };

    let duration = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);
    if duration <= 0.0 {
        return Err(MediaError::InvalidMedia(
            "container reports no duration".to_string(),
        ));
    }

    let size_bytes = probe
        .format
        .size
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok());

    let has_audio = probe.streams.iter().any(|s| s.codec_type == "audio");

    Ok(MediaProfile {
        width,
        height,
        duration,
        has_audio,
        size_bytes,
        audio_levels: None,
    })
}

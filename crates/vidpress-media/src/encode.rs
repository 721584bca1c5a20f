//! Encode orchestration: single-pass CRF or two-pass ABR.
//!
//! Two-pass trades roughly double the encode time for markedly better
//! rate control at the selected bitrate; the single-pass variant keeps
//! a CRF floor with a maxrate ceiling for fast turnaround.

use std::path::Path;
use tracing::info;

use vidpress_models::{
    EncodeParams, AUDIO_SAMPLE_RATE, DEFAULT_AUDIO_CODEC, DEFAULT_CRF, DEFAULT_PRESET,
    DEFAULT_VIDEO_CODEC,
};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Phase labels reported in encode failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodePhase {
    /// First pass of a two-pass encode (statistics only).
    AnalysisPass,
    /// The pass that produces the output file.
    Encoding,
}

impl EncodePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnalysisPass => "analysis pass",
            Self::Encoding => "encoding",
        }
    }
}

fn base_video_args(cmd: FfmpegCommand, params: &EncodeParams) -> FfmpegCommand {
    cmd.video_codec(DEFAULT_VIDEO_CODEC)
        .args(["-preset", DEFAULT_PRESET])
        .args(["-profile:v", "high"])
        .args(["-level", "4.0"])
        .args(["-pix_fmt", "yuv420p"])
        .video_filter(params.video_filter_arg())
}

fn audio_args(cmd: FfmpegCommand, params: &EncodeParams) -> FfmpegCommand {
    if !params.has_audio {
        return cmd.arg("-an");
    }
    let cmd = cmd
        .audio_codec(DEFAULT_AUDIO_CODEC)
        .args(["-b:a", params.audio_bitrate.as_str()])
        .args(["-ar", AUDIO_SAMPLE_RATE.to_string().as_str()]);
    if params.audio_filters.is_empty() {
        cmd
    } else {
        cmd.audio_filter(params.audio_filter_arg())
    }
}

/// Encode `input` to `output` with the selected parameters.
///
/// `passlog_prefix` names the x264 statistics files for two-pass runs;
/// the caller owns their cleanup along with the rest of the workspace.
pub async fn encode_video(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    params: &EncodeParams,
    passlog_prefix: impl AsRef<Path>,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();
    let runner = FfmpegRunner::new();

    info!(
        "Encoding {}x{} @ {}kbps, {} pass(es)",
        params.width, params.height, params.video_bitrate_kbps, params.passes
    );

    if params.passes >= 2 {
        let passlog = passlog_prefix.as_ref().to_string_lossy().to_string();
        let bitrate = format!("{}k", params.video_bitrate_kbps);
        let maxrate = bitrate.clone();
        let bufsize = format!("{}k", params.bufsize_kbps());

        // Pass 1: statistics only, no audio, discard output.
        let pass1 = base_video_args(FfmpegCommand::new_discard(input), params)
            .log_level("error")
            .args(["-b:v", bitrate.as_str()])
            .args(["-pass", "1"])
            .args(["-passlogfile", passlog.as_str()])
            .arg("-an");
        runner.run(&pass1, EncodePhase::AnalysisPass.as_str()).await?;

        let pass2 = base_video_args(FfmpegCommand::new(input, output), params)
            .args(["-b:v", bitrate.as_str()])
            .args(["-maxrate", maxrate.as_str()])
            .args(["-bufsize", bufsize.as_str()])
            .args(["-pass", "2"])
            .args(["-passlogfile", passlog.as_str()])
            .args(["-movflags", "+faststart"]);
        let pass2 = audio_args(pass2, params);
        runner.run(&pass2, EncodePhase::Encoding.as_str()).await?;
    } else {
        let maxrate = format!("{}k", params.video_bitrate_kbps);
        let bufsize = format!("{}k", params.bufsize_kbps());

        let cmd = base_video_args(FfmpegCommand::new(input, output), params)
            .args(["-crf", DEFAULT_CRF.to_string().as_str()])
            .args(["-maxrate", maxrate.as_str()])
            .args(["-bufsize", bufsize.as_str()])
            .args(["-movflags", "+faststart"]);
        let cmd = audio_args(cmd, params);
        runner.run(&cmd, EncodePhase::Encoding.as_str()).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(passes: u8, has_audio: bool) -> EncodeParams {
        EncodeParams {
            width: 1280,
            height: 720,
            video_bitrate_kbps: 1500,
            audio_bitrate: "80k".to_string(),
            scale_factor: 1.0,
            video_filters: vec!["scale=1280:720:flags=lanczos".to_string()],
            audio_filters: vec!["loudnorm=I=-16:TP=-1.5:LRA=11".to_string()],
            has_audio,
            passes,
        }
    }

    #[test]
    fn test_single_pass_args_use_crf_with_ceiling() {
        let p = params(1, true);
        let cmd = audio_args(
            base_video_args(FfmpegCommand::new("in.mp4", "out.mp4"), &p)
                .args(["-crf", "26"])
                .args(["-maxrate", "1500k"])
                .args(["-bufsize", "2250k"]),
            &p,
        );
        let args = cmd.build_args();
        assert!(args.contains(&"-crf".to_string()));
        assert!(args.contains(&"1500k".to_string()));
        assert!(args.contains(&"2250k".to_string()));
        assert!(args.contains(&"aac".to_string()));
        assert!(args.contains(&"44100".to_string()));
    }

    #[test]
    fn test_silent_source_drops_audio() {
        let p = params(1, false);
        let args = audio_args(FfmpegCommand::new("in.mp4", "out.mp4"), &p).build_args();
        assert!(args.contains(&"-an".to_string()));
        assert!(!args.contains(&"-c:a".to_string()));
    }

    #[test]
    fn test_bufsize_is_one_and_a_half_times_bitrate() {
        assert_eq!(params(2, true).bufsize_kbps(), 2250);
    }

    #[test]
    fn test_phase_labels() {
        assert_eq!(EncodePhase::AnalysisPass.as_str(), "analysis pass");
        assert_eq!(EncodePhase::Encoding.as_str(), "encoding");
    }
}

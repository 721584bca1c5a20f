//! Parameter selection: resolution, bitrate and filter chains.
//!
//! Everything in this module is pure and deterministic; the pipeline
//! feeds it a probed [`MediaProfile`] and gets back the full
//! [`EncodeParams`] for the encoder. Longer inputs get a smaller
//! resolution ceiling and a lower audio tier, trading quality for
//! output size and encode time.

use vidpress_models::{AudioLevels, EncodeParams, MediaProfile};

use crate::error::{MediaError, MediaResult};

/// Default total size budget when the input size is unknown: 9.4 MiB,
/// just under a 10 MiB delivery cap.
pub const DEFAULT_TARGET_BYTES: f64 = 9.4 * 1024.0 * 1024.0;

/// Real files land 5-15% above the nominal bitrate; budget for it.
const SIZE_SAFETY_FACTOR: f64 = 0.85;

/// When the input size is known, never budget more than this share of it.
const INPUT_BUDGET_RATIO: f64 = 0.6;

/// Mean volume below this triggers a gain boost.
pub const BOOST_THRESHOLD_DB: f64 = -20.0;

/// Headroom left when boosting, dB.
pub const BOOST_MARGIN_DB: f64 = 12.0;

/// Boost ceiling, dB. Very quiet audio is never fully compensated; past
/// this the noise floor comes up with it.
pub const BOOST_CAP_DB: f64 = 15.0;

/// Scale factors above this get a mild sharpening pass.
const SHARPEN_THRESHOLD: f64 = 1.3;

/// Terminal loudness normalization stage (broadcast-style targets).
const LOUDNORM: &str = "loudnorm=I=-16:TP=-1.5:LRA=11";

/// Resolution bounding box for a given duration.
///
/// Longer videos get a smaller ceiling.
pub fn resolution_ceiling(duration_secs: f64) -> (u32, u32) {
    if duration_secs > 600.0 {
        (1280, 720)
    } else if duration_secs > 300.0 {
        (1600, 900)
    } else {
        (1920, 1080)
    }
}

/// Maximum upscale factor for a given original pixel count.
///
/// Small originals are allowed to grow more; large ones gain nothing
/// from upscaling and are capped near 1x.
pub fn upscale_cap(original_pixels: u64) -> f64 {
    if original_pixels < 480 * 360 {
        2.0
    } else if original_pixels < 640 * 480 {
        1.8
    } else if original_pixels < 1280 * 720 {
        1.5
    } else {
        1.2
    }
}

/// Target dimensions plus the applied scale factor.
///
/// Dimensions are floor-aligned to multiples of 8 for the encoder's
/// macroblock structure; degenerating to zero in either axis is an
/// error.
pub fn select_resolution(
    orig_width: u32,
    orig_height: u32,
    duration_secs: f64,
) -> MediaResult<(u32, u32, f64)> {
    let (ceil_w, ceil_h) = resolution_ceiling(duration_secs);
    let cap = upscale_cap(orig_width as u64 * orig_height as u64);

    let scale = (ceil_w as f64 / orig_width as f64)
        .min(ceil_h as f64 / orig_height as f64)
        .min(cap);

    let width = ((orig_width as f64 * scale / 8.0).floor() as u32) * 8;
    let height = ((orig_height as f64 * scale / 8.0).floor() as u32) * 8;

    if width == 0 || height == 0 {
        return Err(MediaError::DegenerateResolution { width, height });
    }

    // Report the scale that alignment actually left us with.
    let applied = width as f64 / orig_width as f64;
    Ok((width, height, applied))
}

/// Audio bitrate tier for a target frame size.
pub fn audio_bitrate_for(target_pixels: u64) -> &'static str {
    if target_pixels <= 854 * 480 {
        "64k"
    } else if target_pixels <= 1280 * 720 {
        "80k"
    } else {
        "96k"
    }
}

fn audio_bitrate_kbps(tag: &str) -> u32 {
    tag.trim_end_matches('k').parse().unwrap_or(96)
}

/// Allowed video bitrate window (kbps) for a target frame size.
pub fn bitrate_window(target_pixels: u64) -> (u32, u32) {
    let max = if target_pixels <= 640 * 480 {
        800
    } else if target_pixels <= 854 * 480 {
        1000
    } else if target_pixels <= 1280 * 720 {
        1500
    } else if target_pixels <= 1920 * 1080 {
        2200
    } else {
        1800
    };
    let min = 250.min(max * 3 / 10);
    (min, max)
}

/// Single video bitrate from the size budget, clamped to the tier window.
pub fn select_video_bitrate(
    duration_secs: f64,
    input_size_bytes: Option<u64>,
    audio_kbps: u32,
    target_pixels: u64,
) -> u32 {
    let budget = match input_size_bytes {
        Some(size) => DEFAULT_TARGET_BYTES.min(size as f64 * INPUT_BUDGET_RATIO),
        None => DEFAULT_TARGET_BYTES,
    };

    let available_bytes = budget * SIZE_SAFETY_FACTOR - (audio_kbps as f64 * 1000.0 * duration_secs) / 8.0;
    let computed = (available_bytes.max(0.0) * 8.0 / duration_secs / 1000.0).floor() as u32;

    let (min, max) = bitrate_window(target_pixels);
    computed.clamp(min, max)
}

/// Ordered video filter chain: scale first, then sharpening when the
/// upscale is big enough to soften the picture.
pub fn video_filters(width: u32, height: u32, scale_factor: f64) -> Vec<String> {
    let mut filters = vec![format!("scale={}:{}:flags=lanczos", width, height)];
    if scale_factor > SHARPEN_THRESHOLD {
        filters.push("unsharp=3:3:0.3:3:3:0.2".to_string());
    }
    filters
}

/// Ordered audio filter chain.
///
/// A bounded gain boost leads when the measured mean volume is below
/// the threshold; loudness normalization is always the terminal stage.
pub fn audio_filters(levels: Option<AudioLevels>) -> Vec<String> {
    let mut filters = Vec::new();

    match levels {
        Some(levels) => {
            if levels.mean_volume < BOOST_THRESHOLD_DB {
                let boost = (-levels.mean_volume - BOOST_MARGIN_DB).min(BOOST_CAP_DB);
                filters.push(format!("volume={boost}dB"));
            }
            filters.push("afftdn=nr=20:nf=-40".to_string());
            filters.push("acompressor=threshold=-18dB:ratio=3:attack=5:release=50".to_string());
            filters.push("treble=g=2:f=8000:w=1".to_string());
            filters.push("bass=g=1:f=100:w=0.5".to_string());
        }
        None => {
            // No measurement: milder cleanup, no boost.
            filters.push("afftdn=nr=15:nf=-35".to_string());
            filters.push("acompressor=threshold=-20dB:ratio=2:attack=5:release=50".to_string());
        }
    }

    filters.push(LOUDNORM.to_string());
    filters
}

/// Derive the full encoder parameter set from a probed profile.
pub fn select_params(profile: &MediaProfile, two_pass: bool) -> MediaResult<EncodeParams> {
    let (width, height, scale_factor) =
        select_resolution(profile.width, profile.height, profile.duration)?;

    let target_pixels = width as u64 * height as u64;
    let audio_bitrate = audio_bitrate_for(target_pixels);
    let video_bitrate_kbps = select_video_bitrate(
        profile.duration,
        profile.size_bytes,
        audio_bitrate_kbps(audio_bitrate),
        target_pixels,
    );

    Ok(EncodeParams {
        width,
        height,
        video_bitrate_kbps,
        audio_bitrate: audio_bitrate.to_string(),
        scale_factor,
        video_filters: video_filters(width, height, scale_factor),
        audio_filters: if profile.has_audio {
            audio_filters(profile.audio_levels)
        } else {
            Vec::new()
        },
        has_audio: profile.has_audio,
        passes: if two_pass { 2 } else { 1 },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(width: u32, height: u32, duration: f64) -> MediaProfile {
        MediaProfile {
            width,
            height,
            duration,
            has_audio: true,
            size_bytes: None,
            audio_levels: None,
        }
    }

    #[test]
    fn test_ceiling_tiers() {
        assert_eq!(resolution_ceiling(601.0), (1280, 720));
        assert_eq!(resolution_ceiling(301.0), (1600, 900));
        assert_eq!(resolution_ceiling(300.0), (1920, 1080));
        assert_eq!(resolution_ceiling(30.0), (1920, 1080));
    }

    #[test]
    fn test_4k_short_clip_downscales_to_1080p() {
        // 3840x2160 at 120s: ceiling 1920x1080, large-original cap 1.2,
        // bounded by ceiling/original = 0.5.
        let (w, h, scale) = select_resolution(3840, 2160, 120.0).unwrap();
        assert_eq!((w, h), (1920, 1080));
        assert!((scale - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_alignment_and_ceiling_hold_across_inputs() {
        let dims = [
            (320, 240),
            (426, 240),
            (640, 360),
            (854, 480),
            (1280, 720),
            (1366, 768),
            (1920, 1080),
            (2560, 1440),
            (3840, 2160),
            (608, 1080), // portrait
            (1021, 769), // odd sizes
        ];
        let durations = [15.0, 119.0, 301.0, 601.0, 1800.0];

        for (ow, oh) in dims {
            for d in durations {
                let (ceil_w, ceil_h) = resolution_ceiling(d);
                let cap = upscale_cap(ow as u64 * oh as u64);
                let (w, h, scale) = select_resolution(ow, oh, d).unwrap();

                assert_eq!(w % 8, 0, "{ow}x{oh}@{d}");
                assert_eq!(h % 8, 0, "{ow}x{oh}@{d}");
                assert!(w > 0 && h > 0);
                assert!(w <= ceil_w, "{ow}x{oh}@{d}: {w} > {ceil_w}");
                assert!(h <= ceil_h, "{ow}x{oh}@{d}: {h} > {ceil_h}");
                // floor-alignment only ever shrinks the applied factor
                assert!(scale <= cap + 1e-9);
                assert!(scale <= ceil_w as f64 / ow as f64 + 1e-9);
            }
        }
    }

    #[test]
    fn test_small_original_upscales_within_cap() {
        // 320x240 is below the 480*360 tier, so cap is 2.0
        let (w, h, scale) = select_resolution(320, 240, 30.0).unwrap();
        assert_eq!((w, h), (640, 480));
        assert!((scale - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_resolution_is_rejected() {
        // 3x3 doubles to 6x6, which floor-aligns to zero
        let err = select_resolution(3, 3, 30.0).unwrap_err();
        assert!(matches!(err, MediaError::DegenerateResolution { .. }));
    }

    #[test]
    fn test_audio_tiers_follow_target_size() {
        assert_eq!(audio_bitrate_for(640 * 480), "64k");
        assert_eq!(audio_bitrate_for(1280 * 720), "80k");
        assert_eq!(audio_bitrate_for(1920 * 1080), "96k");
    }

    #[test]
    fn test_bitrate_stays_in_window() {
        let cases = [
            (30.0, None, 1920 * 1080_u64),
            (30.0, Some(1024 * 1024), 640 * 480),
            (600.0, None, 1280 * 720),
            (3600.0, None, 854 * 480),
            (1.0, None, 1920 * 1080), // tiny duration, huge computed rate
        ];
        for (duration, size, pixels) in cases {
            let (min, max) = bitrate_window(pixels);
            let kbps = select_video_bitrate(duration, size, 96, pixels);
            assert!(kbps >= min && kbps <= max, "{duration}s: {kbps} not in [{min},{max}]");
        }
    }

    #[test]
    fn test_long_video_hits_window_floor() {
        // One hour against a 9.4 MiB budget computes below the floor.
        let kbps = select_video_bitrate(3600.0, None, 64, 854 * 480);
        let (min, _) = bitrate_window(854 * 480);
        assert_eq!(kbps, min);
    }

    #[test]
    fn test_known_input_size_tightens_budget() {
        // 4 MiB input: budget is 60% of it, well under the default.
        let small = select_video_bitrate(60.0, Some(4 * 1024 * 1024), 96, 1280 * 720);
        let default = select_video_bitrate(60.0, None, 96, 1280 * 720);
        assert!(small < default);
    }

    #[test]
    fn test_boost_applied_iff_below_threshold() {
        // -28 dB mean, margin 12, cap 15: boost = min(16, 15) = 15
        let filters = audio_filters(Some(AudioLevels {
            max_volume: -9.0,
            mean_volume: -28.0,
        }));
        assert_eq!(filters[0], "volume=15dB");
        assert_eq!(filters.last().unwrap(), LOUDNORM);

        // -19 dB is above the -20 threshold: no boost stage
        let filters = audio_filters(Some(AudioLevels {
            max_volume: -2.0,
            mean_volume: -19.0,
        }));
        assert!(!filters[0].starts_with("volume="));
        assert_eq!(filters.last().unwrap(), LOUDNORM);
    }

    #[test]
    fn test_boost_never_exceeds_cap() {
        for mean in [-21.0, -25.0, -40.0, -70.0] {
            let filters = audio_filters(Some(AudioLevels {
                max_volume: 0.0,
                mean_volume: mean,
            }));
            if let Some(boost) = filters[0]
                .strip_prefix("volume=")
                .and_then(|s| s.strip_suffix("dB"))
            {
                assert!(boost.parse::<f64>().unwrap() <= BOOST_CAP_DB + 1e-9);
            }
        }
    }

    #[test]
    fn test_unmeasured_audio_gets_mild_chain() {
        let filters = audio_filters(None);
        assert!(filters[0].starts_with("afftdn"));
        assert_eq!(filters.last().unwrap(), LOUDNORM);
    }

    #[test]
    fn test_sharpening_only_on_real_upscales() {
        assert_eq!(video_filters(1920, 1080, 1.0).len(), 1);
        let sharpened = video_filters(1280, 720, 1.5);
        assert_eq!(sharpened.len(), 2);
        assert!(sharpened[1].starts_with("unsharp"));
    }

    #[test]
    fn test_select_params_end_to_end() {
        let mut p = profile(1280, 720, 45.0);
        p.audio_levels = Some(AudioLevels {
            max_volume: -5.0,
            mean_volume: -15.0,
        });
        let params = select_params(&p, true).unwrap();

        assert_eq!(params.passes, 2);
        assert_eq!(params.width % 8, 0);
        assert_eq!(params.height % 8, 0);
        assert!(params.has_audio);
        assert_eq!(params.audio_filters.last().unwrap(), LOUDNORM);
        let (min, max) = bitrate_window(params.width as u64 * params.height as u64);
        assert!(params.video_bitrate_kbps >= min && params.video_bitrate_kbps <= max);
    }

    #[test]
    fn test_silent_source_has_no_audio_chain() {
        let mut p = profile(640, 480, 20.0);
        p.has_audio = false;
        let params = select_params(&p, false).unwrap();
        assert!(params.audio_filters.is_empty());
        assert_eq!(params.passes, 1);
    }
}

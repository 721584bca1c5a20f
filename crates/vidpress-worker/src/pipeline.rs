//! The transcode pipeline: validate, fetch, analyze, encode, deliver.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use vidpress_media::{
    encode_video, measure_loudness, needs_loudness_measurement, probe_media, select_params,
    validate_source, JobWorkspace,
};
use vidpress_models::{
    JobId, JobLogEntry, JobStatus, LogLevel, MediaProfile, TranscodeRequest, TranscodeResponse,
    VideoJob,
};
use vidpress_storage::StorageClient;

use crate::config::WorkerConfig;
use crate::download::SourceDownloader;
use crate::error::{WorkerError, WorkerResult};
use crate::tracker::JobTracker;

/// Shared state for processing jobs.
pub struct PipelineContext {
    pub config: WorkerConfig,
    pub tracker: JobTracker,
    pub storage: StorageClient,
    pub downloader: SourceDownloader,
}

impl PipelineContext {
    pub fn new(
        config: WorkerConfig,
        tracker: JobTracker,
        storage: StorageClient,
    ) -> WorkerResult<Self> {
        let downloader =
            SourceDownloader::new(config.download_timeout, config.download_max_bytes)?;
        Ok(Self {
            config,
            tracker,
            storage,
            downloader,
        })
    }
}

/// Process one transcode request end to end.
///
/// Always returns a response; failures are folded into it rather than
/// propagated, so the caller can publish unconditionally.
pub async fn process_request(
    ctx: Arc<PipelineContext>,
    request: TranscodeRequest,
) -> TranscodeResponse {
    let started = Instant::now();
    let response = TranscodeResponse::for_request(&request);

    // Request-level validation: rejected before any job record or
    // persisted log exists.
    if let Err(e) = request.validate() {
        let err = WorkerError::from(e);
        tracing::error!(
            source_url = %request.original_video_url,
            "Rejected request: {}", err
        );
        return response.fail_with(err.to_string());
    }

    let mut job = VideoJob::new(
        &request.server_id,
        &request.uploader_id,
        &request.channel_id,
        &request.original_video_url,
        &request.callback_queue,
    );
    let video_id = job.id.clone();

    ctx.tracker.create_job(&job).await;
    ctx.tracker.set_status(&mut job, JobStatus::Processing).await;
    ctx.tracker
        .record(JobLogEntry::new(
            video_id.clone(),
            "processing_start",
            format!("Processing {}", job.source_url),
            LogLevel::Info,
        ))
        .await;

    match run_pipeline(&ctx, &job).await {
        Ok(outcome) => {
            ctx.tracker
                .record(
                    JobLogEntry::new(
                        video_id.clone(),
                        "processing_complete",
                        format!(
                            "Produced {:.1}s output at {}",
                            outcome.duration_secs, outcome.storage_key
                        ),
                        LogLevel::Info,
                    )
                    .with_duration_ms(started.elapsed().as_millis() as u64),
                )
                .await;
            ctx.tracker
                .finish_job(&mut job, &outcome.result_url, outcome.duration_secs)
                .await;

            response.succeed(video_id.to_string(), outcome.result_url, outcome.duration_secs)
        }
        Err(e) => {
            // Exactly one error entry per failed job, with total elapsed.
            ctx.tracker
                .record(
                    JobLogEntry::new(
                        video_id.clone(),
                        e.log_step(),
                        e.to_string(),
                        LogLevel::Error,
                    )
                    .with_duration_ms(started.elapsed().as_millis() as u64),
                )
                .await;
            ctx.tracker.fail_job(&mut job, &e.to_string()).await;

            response.fail_with(e.to_string())
        }
    }
}

struct PipelineOutcome {
    result_url: String,
    storage_key: String,
    duration_secs: f64,
}

async fn run_pipeline(ctx: &PipelineContext, job: &VideoJob) -> WorkerResult<PipelineOutcome> {
    let mut workspace = JobWorkspace::create(&ctx.config.work_dir, job.id.as_str()).await?;

    let result = run_pipeline_inner(ctx, job, &workspace).await;

    // Runs on success and failure alike; Drop covers panics.
    workspace.cleanup().await;
    result
}

async fn run_pipeline_inner(
    ctx: &PipelineContext,
    job: &VideoJob,
    workspace: &JobWorkspace,
) -> WorkerResult<PipelineOutcome> {
    let input = workspace.input_path();
    let output = workspace.output_path();

    // Fetch and validate the source.
    ctx.downloader.fetch(&job.source_url, &input).await?;
    validate_source(&input).await?;

    // Probe, and measure loudness only on short clips.
    let mut profile = probe_media(&input).await?;
    if profile.has_audio && needs_loudness_measurement(profile.duration) {
        profile.audio_levels = measure_loudness(&input).await;
        if loudness_measurement_failed(&profile) {
            ctx.tracker
                .record(loudness_failure_entry(job.id.clone()))
                .await;
        }
    } else if profile.has_audio {
        info!(
            job_id = %job.id,
            "Skipping loudness measurement for {:.0}s source", profile.duration
        );
    }

    // Derive parameters and encode.
    let params = select_params(&profile, !ctx.config.fast_mode)?;
    encode_video(&input, &output, &params, workspace.passlog_prefix()).await?;

    // The response reports the real output duration, not the source's.
    let output_profile = probe_media(&output).await?;

    let (storage_key, result_url) = ctx
        .storage
        .upload_processed(&output, job.id.as_str())
        .await?;

    Ok(PipelineOutcome {
        result_url,
        storage_key,
        duration_secs: output_profile.duration,
    })
}

/// True when a short clip with audio came out of the measurement step
/// without levels: the volumedetect pass was attempted and failed.
fn loudness_measurement_failed(profile: &MediaProfile) -> bool {
    profile.has_audio
        && needs_loudness_measurement(profile.duration)
        && profile.audio_levels.is_none()
}

fn loudness_failure_entry(job_id: JobId) -> JobLogEntry {
    JobLogEntry::new(
        job_id,
        "analysis_warning",
        "Loudness measurement failed; encoding without measured levels",
        LogLevel::Warn,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidpress_models::should_persist;

    #[test]
    fn test_invalid_request_maps_to_validation_step() {
        let err = WorkerError::from(vidpress_models::RequestError::InvalidSourceUrl);
        assert_eq!(err.log_step(), "validation_failed");
    }

    #[test]
    fn test_failed_loudness_pass_yields_persisted_warning() {
        let short_unmeasured = MediaProfile {
            width: 1280,
            height: 720,
            duration: 60.0,
            has_audio: true,
            size_bytes: Some(4 * 1024 * 1024),
            audio_levels: None,
        };
        assert!(loudness_measurement_failed(&short_unmeasured));

        let entry = loudness_failure_entry(JobId::new());
        assert_eq!(entry.level, LogLevel::Warn);
        assert!(should_persist(entry.level, &entry.step));
    }

    #[test]
    fn test_skipped_or_successful_loudness_pass_is_not_a_failure() {
        let long = MediaProfile {
            width: 1280,
            height: 720,
            duration: 700.0,
            has_audio: true,
            size_bytes: None,
            audio_levels: None,
        };
        assert!(!loudness_measurement_failed(&long));

        let silent = MediaProfile {
            duration: 60.0,
            has_audio: false,
            ..long.clone()
        };
        assert!(!loudness_measurement_failed(&silent));

        let measured = MediaProfile {
            duration: 60.0,
            audio_levels: Some(vidpress_models::AudioLevels {
                max_volume: -3.0,
                mean_volume: -18.0,
            }),
            ..long
        };
        assert!(!loudness_measurement_failed(&measured));
    }
}

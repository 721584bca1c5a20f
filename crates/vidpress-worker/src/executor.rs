//! Job executor: bounded-concurrency consumption from the queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info};
use uuid::Uuid;

use vidpress_models::TranscodeRequest;
use vidpress_queue::JobQueue;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::pipeline::{process_request, PipelineContext};

/// Executor that pulls requests off the queue and runs the pipeline,
/// at most `max_concurrent_jobs` at a time.
pub struct JobExecutor {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    ctx: Arc<PipelineContext>,
    job_semaphore: Arc<Semaphore>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    pub fn new(config: WorkerConfig, queue: JobQueue, ctx: PipelineContext) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = tokio::sync::watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            queue: Arc::new(queue),
            ctx: Arc::new(ctx),
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    /// Signal handle for graceful shutdown.
    pub fn shutdown_handle(&self) -> tokio::sync::watch::Sender<bool> {
        self.shutdown.clone()
    }

    /// Start the executor and run until shutdown.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting executor '{}' with {} max concurrent jobs",
            self.consumer_name, self.config.max_concurrent_jobs
        );

        self.queue.init().await?;

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_requests() => {
                    if let Err(e) = result {
                        error!("Error consuming requests: {}", e);
                        // Back off on error
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        info!("Waiting for in-flight jobs to complete...");
        let _ = tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs()).await;

        info!("Executor stopped");
        Ok(())
    }

    async fn consume_requests(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let requests = self
            .queue
            .consume(&self.consumer_name, 1000, available)
            .await?;

        if requests.is_empty() {
            return Ok(());
        }

        debug!("Consumed {} requests from queue", requests.len());

        for (message_id, request) in requests {
            let ctx = Arc::clone(&self.ctx);
            let queue = Arc::clone(&self.queue);
            let permit = self
                .job_semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::config_error("Semaphore closed"))?;

            tokio::spawn(async move {
                let _permit = permit;
                Self::execute(ctx, queue, message_id, request).await;
            });
        }

        Ok(())
    }

    /// Run one request and publish its response. No retries: a failed
    /// job produces a failure response and is acked like any other.
    async fn execute(
        ctx: Arc<PipelineContext>,
        queue: Arc<JobQueue>,
        message_id: String,
        request: TranscodeRequest,
    ) {
        let callback_queue = request.callback_queue.clone();

        let response = process_request(ctx, request).await;

        if let Err(e) = queue.publish_response(&callback_queue, &response).await {
            error!(
                "Failed to publish response for message {}: {}",
                message_id, e
            );
        }

        // Ack after publish so a crash between the two redelivers the
        // message instead of losing the response.
        if let Err(e) = queue.ack(&message_id).await {
            error!("Failed to ack message {}: {}", message_id, e);
        }
    }

    async fn wait_for_jobs(&self) {
        let total = self.config.max_concurrent_jobs;
        while self.job_semaphore.available_permits() < total {
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }
}

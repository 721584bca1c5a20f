//! Video transcoding worker binary.

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vidpress_firestore::{FirestoreClient, JobLogRepository, JobRepository};
use vidpress_media::{check_ffmpeg, check_ffprobe};
use vidpress_queue::JobQueue;
use vidpress_storage::StorageClient;
use vidpress_worker::{JobExecutor, JobTracker, PipelineContext, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::from_default_env().add_directive("vidpress=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting vidpress-worker");

    // Fail fast when the encoding tools are missing.
    if let Err(e) = check_ffmpeg().and(check_ffprobe()) {
        error!("{}", e);
        std::process::exit(1);
    }

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let queue = match JobQueue::from_env() {
        Ok(q) => q,
        Err(e) => {
            error!("Failed to create job queue: {}", e);
            std::process::exit(1);
        }
    };

    // The stream may not exist yet on a fresh deployment; XLEN still
    // answers, so this doubles as a Redis reachability check.
    match queue.len().await {
        Ok(backlog) => info!("Connected to Redis; {} request(s) pending", backlog),
        Err(e) => {
            error!("Redis connectivity check failed: {}", e);
            std::process::exit(1);
        }
    }

    let storage = match StorageClient::from_env().await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create storage client: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = storage.check_connectivity().await {
        error!("{}", e);
        std::process::exit(1);
    }

    let firestore = match FirestoreClient::from_env().await {
        Ok(f) => f,
        Err(e) => {
            error!("Failed to create Firestore client: {}", e);
            std::process::exit(1);
        }
    };

    let tracker = JobTracker::new(
        JobRepository::new(firestore.clone()),
        JobLogRepository::new(firestore),
    );

    let ctx = match PipelineContext::new(config.clone(), tracker, storage) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create pipeline context: {}", e);
            std::process::exit(1);
        }
    };

    let executor = JobExecutor::new(config, queue, ctx);

    // Flip the shutdown flag on Ctrl-C
    let shutdown = executor.shutdown_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown.send(true).ok();
    });

    if let Err(e) = executor.run().await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}

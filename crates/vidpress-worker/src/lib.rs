//! Adaptive video transcoding worker.
//!
//! Consumes transcode requests from the queue, runs the download,
//! analyze, encode and upload pipeline with bounded concurrency, and
//! publishes a response for every request.

pub mod config;
pub mod download;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod tracker;

pub use config::WorkerConfig;
pub use download::SourceDownloader;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use pipeline::{process_request, PipelineContext};
pub use tracker::JobTracker;

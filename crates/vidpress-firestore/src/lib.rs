//! Firestore persistence for job records and append-only job logs.
//!
//! A small REST client (token caching, mid-flight expiry retry) plus
//! typed repositories over the `video_jobs` and `video_job_logs`
//! collections.

pub mod client;
pub mod error;
pub mod repos;
pub mod token_cache;
pub mod types;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use repos::{JobLogRepository, JobRepository, JOBS_COLLECTION, JOB_LOGS_COLLECTION};
pub use types::{Document, ToFirestoreValue, Value};

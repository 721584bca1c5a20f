//! S3-compatible object storage for processed outputs.
//!
//! Uploads encoded videos under a timestamped `uploads/` key and hands
//! out short-lived presigned GET URLs for delivery.

pub mod client;
pub mod error;

pub use client::{StorageClient, StorageConfig, RESULT_URL_TTL};
pub use error::{StorageError, StorageResult};

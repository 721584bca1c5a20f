//! Redis Streams job queue.
//!
//! This crate provides:
//! - Transcode request consumption via a consumer group
//! - Response publication to per-caller callback streams

pub mod error;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use queue::{JobQueue, QueueConfig};

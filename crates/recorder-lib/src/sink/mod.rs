//! Record sinks
//!
//! A sink durably appends metric samples. PostgreSQL is the production
//! store; the in-memory sink serves local runs and tests.

mod memory;
mod postgres;

pub use memory::MemorySink;
pub use postgres::{PostgresConfig, PostgresSink};

use crate::error::SinkError;
use crate::models::MetricSample;

pub use async_trait::async_trait;

/// Append-only store for metric samples
///
/// Duplicate delivery of the same logical sample is tolerated; callers do
/// not deduplicate.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn append(&self, sample: &MetricSample) -> Result<(), SinkError>;
}

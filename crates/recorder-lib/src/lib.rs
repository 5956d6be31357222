//! Recorder library for remotely controlled workload sampling
//!
//! This crate provides the core functionality for:
//! - The sampling worker and its run lifecycle
//! - The gRPC control service
//! - Metrics sources (Kubernetes metrics API) and record sinks (Postgres)
//! - Health checks and observability

pub mod control;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod proto;
pub mod sink;
pub mod source;
pub mod worker;

pub use control::RecorderService;
pub use error::{SinkError, SourceError, WorkerError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{RecorderLogger, RecorderMetrics};
pub use sink::{MemorySink, PostgresConfig, PostgresSink, RecordSink};
pub use source::{K8sSourceConfig, KubeMetricsSource, MetricsSource};
pub use worker::{SamplingWorker, SamplingWorkerBuilder, WorkerConfig};

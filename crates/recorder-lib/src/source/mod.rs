//! Metrics sources
//!
//! A source reports the current resource usage of a single workload. The
//! Kubernetes implementation reads the `metrics.k8s.io` API.

mod k8s;
mod quantity;

pub use k8s::{usage_from_containers, ContainerUsage, KubeMetricsSource, K8sSourceConfig};
pub use quantity::{parse_quantity, QuantityError};

use crate::error::SourceError;
use crate::models::WorkloadUsage;

pub use async_trait::async_trait;

/// Read-only capability returning current usage for a workload
///
/// Implementations must tolerate repeated and concurrent calls for
/// different workloads. A failure only concerns the workload asked for.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn fetch(&self, workload_id: &str) -> Result<WorkloadUsage, SourceError>;
}

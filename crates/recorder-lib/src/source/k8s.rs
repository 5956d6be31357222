//! Pod metrics from the Kubernetes metrics API
//!
//! Reads `metrics.k8s.io/v1beta1` `PodMetrics` objects served by
//! metrics-server and sums usage across the pod's containers.

use super::{parse_quantity, MetricsSource};
use crate::error::SourceError;
use crate::models::WorkloadUsage;
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

const METRICS_GROUP: &str = "metrics.k8s.io";
const METRICS_VERSION: &str = "v1beta1";
const POD_METRICS_KIND: &str = "PodMetrics";
const POD_METRICS_PLURAL: &str = "pods";

/// Connection settings for the Kubernetes metrics source
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct K8sSourceConfig {
    /// Use the pod's service account instead of a kubeconfig
    pub in_cluster: bool,
    /// Namespace the sampled pods live in
    pub namespace: String,
}

impl Default for K8sSourceConfig {
    fn default() -> Self {
        Self {
            in_cluster: true,
            namespace: "default".to_string(),
        }
    }
}

/// Usage block of one container in a `PodMetrics` object
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerUsage {
    pub name: String,
    #[serde(default)]
    pub usage: BTreeMap<String, Quantity>,
}

#[derive(Debug, Deserialize)]
struct PodMetricsBody {
    #[serde(default)]
    containers: Vec<ContainerUsage>,
}

/// Metrics source backed by the cluster's metrics API
#[derive(Clone)]
pub struct KubeMetricsSource {
    api: Api<DynamicObject>,
    namespace: String,
}

impl KubeMetricsSource {
    /// Build a client from the configured auth mode
    pub async fn connect(config: &K8sSourceConfig) -> Result<Self> {
        let kube_config = if config.in_cluster {
            kube::Config::incluster().context("Failed to load in-cluster Kubernetes config")?
        } else {
            kube::Config::infer()
                .await
                .context("Failed to infer Kubernetes config")?
        };

        let client =
            Client::try_from(kube_config).context("Failed to create Kubernetes client")?;

        info!(
            namespace = %config.namespace,
            in_cluster = config.in_cluster,
            "Connected to Kubernetes metrics API"
        );

        Ok(Self::new(client, &config.namespace))
    }

    pub fn new(client: Client, namespace: &str) -> Self {
        let gvk = GroupVersionKind::gvk(METRICS_GROUP, METRICS_VERSION, POD_METRICS_KIND);
        let resource = ApiResource::from_gvk_with_plural(&gvk, POD_METRICS_PLURAL);

        Self {
            api: Api::namespaced_with(client, namespace, &resource),
            namespace: namespace.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[async_trait]
impl MetricsSource for KubeMetricsSource {
    async fn fetch(&self, workload_id: &str) -> Result<WorkloadUsage, SourceError> {
        let object = self.api.get(workload_id).await.map_err(|e| match e {
            kube::Error::Api(resp) if resp.code == 404 => {
                SourceError::NotFound(workload_id.to_string())
            }
            other => SourceError::Unavailable(other.to_string()),
        })?;

        let body: PodMetricsBody = serde_json::from_value(object.data)
            .map_err(|e| SourceError::Unavailable(format!("malformed pod metrics: {}", e)))?;

        debug!(
            workload_id = %workload_id,
            containers = body.containers.len(),
            "Fetched pod metrics"
        );

        usage_from_containers(&body.containers)
    }
}

/// Sum CPU (cores) and memory (bytes) over all containers of a pod
pub fn usage_from_containers(containers: &[ContainerUsage]) -> Result<WorkloadUsage, SourceError> {
    if containers.is_empty() {
        return Err(SourceError::Unavailable(
            "no container metrics reported yet".to_string(),
        ));
    }

    let mut cpu = 0.0;
    let mut memory = 0.0;

    for container in containers {
        cpu += usage_value(container, "cpu")?;
        memory += usage_value(container, "memory")?;
    }

    if cpu < 0.0 || memory < 0.0 {
        return Err(SourceError::Unavailable("negative usage reported".to_string()));
    }

    Ok(WorkloadUsage {
        cpu_usage: cpu,
        memory_usage: memory.round() as u64,
        power_usage: None,
    })
}

fn usage_value(container: &ContainerUsage, resource: &str) -> Result<f64, SourceError> {
    match container.usage.get(resource) {
        Some(quantity) => parse_quantity(&quantity.0).map_err(|e| {
            SourceError::Unavailable(format!(
                "container {} {} usage: {}",
                container.name, resource, e
            ))
        }),
        None => Ok(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(name: &str, cpu: &str, memory: &str) -> ContainerUsage {
        let mut usage = BTreeMap::new();
        usage.insert("cpu".to_string(), Quantity(cpu.to_string()));
        usage.insert("memory".to_string(), Quantity(memory.to_string()));
        ContainerUsage {
            name: name.to_string(),
            usage,
        }
    }

    #[test]
    fn test_usage_sums_containers() {
        let usage = usage_from_containers(&[
            container("app", "250m", "1Mi"),
            container("sidecar", "250m", "1Mi"),
        ])
        .unwrap();

        assert!((usage.cpu_usage - 0.5).abs() < 1e-9);
        assert_eq!(usage.memory_usage, 2 * 1_048_576);
        assert_eq!(usage.power_usage, None);
    }

    #[test]
    fn test_usage_without_containers_is_unavailable() {
        assert!(matches!(
            usage_from_containers(&[]),
            Err(SourceError::Unavailable(_))
        ));
    }

    #[test]
    fn test_usage_with_bad_quantity() {
        let err = usage_from_containers(&[container("app", "lots", "1Mi")]).unwrap_err();
        assert!(err.to_string().contains("app cpu usage"));
    }

    #[test]
    fn test_pod_metrics_body_deserializes() {
        let raw = serde_json::json!({
            "timestamp": "2024-01-01T00:00:00Z",
            "window": "30s",
            "containers": [
                { "name": "app", "usage": { "cpu": "12345678n", "memory": "2048Ki" } }
            ]
        });

        let body: PodMetricsBody = serde_json::from_value(raw).unwrap();
        let usage = usage_from_containers(&body.containers).unwrap();

        assert!((usage.cpu_usage - 0.012345678).abs() < 1e-12);
        assert_eq!(usage.memory_usage, 2048 * 1024);
    }
}

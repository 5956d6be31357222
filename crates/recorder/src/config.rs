//! Recorder configuration

use anyhow::{bail, Result};
use recorder_lib::{K8sSourceConfig, PostgresConfig, WorkerConfig};
use serde::Deserialize;

const CONFIG_FILE_ENV: &str = "RECORDER_CONFIG_FILE";

/// Recorder configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RecorderConfig {
    /// Node name from Kubernetes downward API
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default)]
    pub grpc: GrpcConfig,

    #[serde(default)]
    pub postgres: PostgresConfig,

    #[serde(default)]
    pub k8s: K8sSourceConfig,

    #[serde(default)]
    pub sink: SinkConfig,

    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Listen address of the control service
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GrpcConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9090,
        }
    }
}

impl GrpcConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Postgres,
    /// Keeps samples in process memory, for local runs
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
}

fn default_node_name() -> String {
    std::env::var("NODE_NAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8080
}

impl RecorderConfig {
    /// Load configuration from an optional file and the environment
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            builder = builder.add_source(config::File::with_name(&path));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("RECORDER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: RecorderConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_port == 0 {
            bail!("api_port must be non-zero");
        }
        if self.grpc.port == 0 {
            bail!("grpc.port must be non-zero");
        }
        if self.postgres.port == 0 {
            bail!("postgres.port must be non-zero");
        }
        if self.worker.max_consecutive_sink_failures == 0 {
            bail!("worker.max_consecutive_sink_failures must be at least 1");
        }
        Ok(())
    }
}

//! Metrics Recorder - remotely controlled workload sampling daemon
//!
//! Waits for `StartRecording` / `StopRecording` calls over gRPC and, while a
//! run is active, periodically samples pod usage from the Kubernetes metrics
//! API into PostgreSQL.

use anyhow::{Context, Result};
use recorder_lib::{
    health::{components, HealthRegistry},
    observability::RecorderLogger,
    proto::MetricsRecorderServer,
    KubeMetricsSource, MemorySink, MetricsSource, PostgresSink, RecordSink, RecorderService,
    SamplingWorker,
};
use std::sync::Arc;
use tonic::transport::Server;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

use config::{RecorderConfig, SinkKind};

const RECORDER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting metrics-recorder");

    let config = RecorderConfig::load().context("Failed to load configuration")?;
    info!(
        node_name = %config.node_name,
        sink = ?config.sink.kind,
        namespace = %config.k8s.namespace,
        "Recorder configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::SAMPLER).await;
    health_registry.register(components::SOURCE).await;
    health_registry.register(components::SINK).await;
    health_registry.register(components::CONTROL).await;

    let logger = RecorderLogger::new(&config.node_name);

    let source: Arc<dyn MetricsSource> = Arc::new(
        KubeMetricsSource::connect(&config.k8s)
            .await
            .context("Failed to create metrics source")?,
    );

    let sink: Arc<dyn RecordSink> = match config.sink.kind {
        SinkKind::Postgres => {
            let sink = PostgresSink::connect(&config.postgres).await?;
            sink.ensure_schema().await?;
            Arc::new(sink)
        }
        SinkKind::Memory => {
            warn!("Using in-memory sink, samples are lost on exit");
            Arc::new(MemorySink::new())
        }
    };

    let worker = Arc::new(
        SamplingWorker::builder()
            .source(source)
            .sink(sink)
            .config(config.worker.clone())
            .logger(logger.clone())
            .health(health_registry.clone())
            .build()?,
    );

    let service = RecorderService::new(worker.clone()).with_health(health_registry.clone());

    // Start health and metrics server
    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        worker.clone(),
    ));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    let grpc_addr = config
        .grpc
        .addr()
        .parse()
        .with_context(|| format!("Invalid gRPC listen address {}", config.grpc.addr()))?;

    logger.log_startup(RECORDER_VERSION, &config.grpc.addr());
    health_registry.set_ready(true).await;

    Server::builder()
        .add_service(MetricsRecorderServer::new(service))
        .serve_with_shutdown(grpc_addr, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await
        .context("gRPC server failed")?;

    health_registry.set_ready(false).await;
    logger.log_shutdown("SIGINT received");

    if let Some(summary) = worker.shutdown().await {
        info!(
            run_id = %summary.run_id,
            samples = summary.samples_recorded,
            "Active run stopped on shutdown"
        );
    }

    api_handle.abort();
    info!("Shutdown complete");

    Ok(())
}

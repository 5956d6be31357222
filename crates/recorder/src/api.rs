//! HTTP API for health checks, run status and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use recorder_lib::{ComponentStatus, HealthRegistry, SamplingWorker};
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub worker: Arc<SamplingWorker>,
}

impl AppState {
    pub fn new(health_registry: HealthRegistry, worker: Arc<SamplingWorker>) -> Self {
        Self {
            health_registry,
            worker,
        }
    }
}

/// Health check response - returns 200 if healthy, 503 if degraded/unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Current worker state
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.worker.state().await)
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/status", get(status))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use recorder_lib::health::components;
    use recorder_lib::{
        MemorySink, MetricsSource, RecorderMetrics, RunSpec, SourceError, WorkloadUsage,
    };
    use recorder_lib::source::async_trait;
    use tower::ServiceExt;

    struct IdleSource;

    #[async_trait]
    impl MetricsSource for IdleSource {
        async fn fetch(&self, _workload_id: &str) -> Result<WorkloadUsage, SourceError> {
            Ok(WorkloadUsage::default())
        }
    }

    async fn setup_test_app() -> (Router, Arc<AppState>) {
        let health_registry = HealthRegistry::new();
        health_registry.register(components::SAMPLER).await;
        health_registry.register(components::SINK).await;

        let worker = SamplingWorker::builder()
            .source(Arc::new(IdleSource))
            .sink(Arc::new(MemorySink::new()))
            .build()
            .unwrap();

        let state = Arc::new(AppState::new(health_registry, Arc::new(worker)));
        let router = create_router(state.clone());

        (router, state)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_healthz_returns_ok_when_healthy() {
        let (app, _state) = setup_test_app().await;

        let (status, health) = get_json(app, "/healthz").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "healthy");
        assert!(health["components"]["sampler"].is_object());
        assert!(health["components"]["sink"].is_object());
    }

    #[tokio::test]
    async fn test_healthz_returns_ok_when_degraded() {
        let (app, state) = setup_test_app().await;
        state
            .health_registry
            .set_degraded(components::SAMPLER, "run r1 aborted")
            .await;

        let (status, health) = get_json(app, "/healthz").await;

        // Degraded still returns 200 (operational)
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "degraded");
    }

    #[tokio::test]
    async fn test_healthz_returns_503_when_sink_unhealthy() {
        let (app, state) = setup_test_app().await;
        state
            .health_registry
            .set_unhealthy(components::SINK, "record sink closed")
            .await;

        let (status, health) = get_json(app, "/healthz").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(health["status"], "unhealthy");
    }

    #[tokio::test]
    async fn test_readyz_follows_ready_flag() {
        let (app, state) = setup_test_app().await;

        let (status, readiness) = get_json(app.clone(), "/readyz").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(readiness["ready"], false);

        state.health_registry.set_ready(true).await;

        let (status, readiness) = get_json(app, "/readyz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(readiness["ready"], true);
    }

    #[tokio::test]
    async fn test_status_reports_worker_state() {
        let (app, state) = setup_test_app().await;

        let (_, idle) = get_json(app.clone(), "/status").await;
        assert_eq!(idle["state"], "idle");

        state
            .worker
            .start(RunSpec::new("r1", 60_000, vec!["pod-a".to_string()]))
            .await
            .unwrap();

        let (status, running) = get_json(app, "/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(running["state"], "running");
        assert_eq!(running["run_id"], "r1");
        assert_eq!(running["interval_ms"], 60_000);

        state.worker.shutdown().await;
    }

    #[tokio::test]
    async fn test_metrics_endpoint_returns_prometheus_format() {
        let (app, _state) = setup_test_app().await;

        let metrics = RecorderMetrics::new();
        metrics.observe_tick_latency(0.004);
        metrics.inc_samples_recorded();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("text/plain"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let metrics_text = String::from_utf8(body.to_vec()).unwrap();

        assert!(metrics_text.contains("recorder_tick_latency_seconds_bucket"));
        assert!(metrics_text.contains("recorder_samples_recorded_total"));
        assert!(metrics_text.contains("recorder_active_run"));
    }
}

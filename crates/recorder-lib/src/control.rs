//! gRPC control surface
//!
//! Maps `StartRecording` / `StopRecording` onto the sampling worker.
//! Business failures are reported in the `Ack` with `status = false`;
//! a gRPC error status is never returned for them.

use crate::health::{components, HealthRegistry};
use crate::models::{RunOutcome, RunSpec, RunSummary};
use crate::proto::{Ack, MetricsRecorder, StartRecordingRequest, StopRecordingRequest};
use crate::worker::SamplingWorker;
use async_trait::async_trait;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{info, warn};

/// Control service handed to the gRPC server
#[derive(Clone)]
pub struct RecorderService {
    worker: Arc<SamplingWorker>,
    health: Option<HealthRegistry>,
}

impl RecorderService {
    pub fn new(worker: Arc<SamplingWorker>) -> Self {
        Self {
            worker,
            health: None,
        }
    }

    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn worker(&self) -> &Arc<SamplingWorker> {
        &self.worker
    }

    /// Handle a start request
    pub async fn start(&self, request: StartRecordingRequest) -> Ack {
        if request.interval_ms <= 0 {
            warn!(
                run_id = %request.run_id,
                interval_ms = request.interval_ms,
                "Rejected start request with non-positive interval"
            );
            return Ack::failure(format!(
                "invalid request: interval_ms must be positive, got {}",
                request.interval_ms
            ));
        }

        let spec = RunSpec::new(
            request.run_id,
            request.interval_ms as u64,
            request.workload_ids,
        );
        let run_id = spec.run_id.clone();

        match self.worker.start(spec).await {
            Ok(()) => {
                self.mark_control_healthy().await;
                Ack::success(format!("recording started for run {}", run_id))
            }
            Err(e) => {
                warn!(run_id = %run_id, error = %e, "Start request rejected");
                Ack::failure(e.to_string())
            }
        }
    }

    /// Handle a stop request
    pub async fn stop(&self, request: StopRecordingRequest) -> Ack {
        match self.worker.stop(&request.run_id).await {
            Ok(None) => Ack::success("no active run"),
            Ok(Some(summary)) => {
                self.mark_control_healthy().await;
                Ack::success(describe_stopped(&summary))
            }
            Err(e) => {
                warn!(run_id = %request.run_id, error = %e, "Stop request rejected");
                Ack::failure(e.to_string())
            }
        }
    }

    async fn mark_control_healthy(&self) {
        if let Some(health) = &self.health {
            health.set_healthy(components::CONTROL).await;
        }
    }
}

fn describe_stopped(summary: &RunSummary) -> String {
    match &summary.outcome {
        RunOutcome::Stopped => format!(
            "recording stopped for run {}: {} ticks, {} samples recorded",
            summary.run_id, summary.ticks, summary.samples_recorded
        ),
        RunOutcome::SinkFailed(reason) => format!(
            "run {} had already ended after a sink failure ({}): {} samples recorded",
            summary.run_id, reason, summary.samples_recorded
        ),
        RunOutcome::TaskFailed(reason) => format!(
            "run {} sampling task failed ({}): {} samples recorded",
            summary.run_id, reason, summary.samples_recorded
        ),
    }
}

#[async_trait]
impl MetricsRecorder for RecorderService {
    async fn start_recording(
        &self,
        request: Request<StartRecordingRequest>,
    ) -> Result<Response<Ack>, Status> {
        let request = request.into_inner();
        info!(
            run_id = %request.run_id,
            interval_ms = request.interval_ms,
            workloads = request.workload_ids.len(),
            "StartRecording received"
        );
        Ok(Response::new(self.start(request).await))
    }

    async fn stop_recording(
        &self,
        request: Request<StopRecordingRequest>,
    ) -> Result<Response<Ack>, Status> {
        let request = request.into_inner();
        info!(run_id = %request.run_id, "StopRecording received");
        Ok(Response::new(self.stop(request).await))
    }
}

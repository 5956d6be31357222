//! Sampling worker
//!
//! Owns the single run slot of the recorder. Transitions (`start`, `stop`)
//! are serialized by one mutex; the sampling loop of the active run never
//! takes it, so a slow fetch cannot block a stop request from being
//! accepted. Readers of the state go through a snapshot updated at each
//! transition and never wait on that mutex.
//!
//! ```text
//!   Idle --start--> Running --stop / persistent sink failure--> Idle
//! ```

mod run;


use crate::error::WorkerError;
use crate::health::{components, HealthRegistry};
use crate::models::{RunOutcome, RunSpec, RunSummary, WorkerState};
use crate::observability::{RecorderLogger, RecorderMetrics};
use crate::sink::RecordSink;
use crate::source::MetricsSource;
use anyhow::Result;
use chrono::Utc;
use run::SamplingLoop;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Worker policy knobs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Transient append failures in a row after which the run is ended
    pub max_consecutive_sink_failures: u32,
    /// Reject stop requests naming a different run than the active one
    pub strict_run_id: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_consecutive_sink_failures: 5,
            strict_run_id: true,
        }
    }
}

struct ActiveRun {
    spec: RunSpec,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<RunSummary>,
}

impl ActiveRun {
    /// The loop ended on its own (sink failure) and awaits reaping
    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Runs at most one sampling run at a time
pub struct SamplingWorker {
    source: Arc<dyn MetricsSource>,
    sink: Arc<dyn RecordSink>,
    config: WorkerConfig,
    metrics: RecorderMetrics,
    logger: RecorderLogger,
    health: Option<HealthRegistry>,
    active: Mutex<Option<ActiveRun>>,
    snapshot: RwLock<WorkerState>,
}

impl SamplingWorker {
    pub fn builder() -> SamplingWorkerBuilder {
        SamplingWorkerBuilder::new()
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Start a run
    ///
    /// Fails with `InvalidRequest` on bad parameters and with
    /// `AlreadyRunning` while another run is active; neither changes state.
    pub async fn start(&self, spec: RunSpec) -> Result<(), WorkerError> {
        spec.validate()?;

        let mut active = self.active.lock().await;

        if let Some(run) = active.as_ref() {
            if !run.is_finished() {
                return Err(WorkerError::AlreadyRunning(run.spec.run_id.clone()));
            }
        }
        if let Some(finished) = active.take() {
            self.reap(finished).await;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sampling = SamplingLoop::new(
            spec.clone(),
            self.source.clone(),
            self.sink.clone(),
            self.config.clone(),
            self.metrics.clone(),
            self.logger.clone(),
            self.health.clone(),
        );
        let handle = tokio::spawn(sampling.run(shutdown_rx));

        self.metrics.run_started(spec.workload_ids.len());
        self.logger
            .log_run_started(&spec.run_id, spec.interval_ms, &spec.workload_ids);
        if let Some(health) = &self.health {
            health.set_healthy(components::SAMPLER).await;
        }

        let started_at = Utc::now();
        *self.snapshot.write().await = WorkerState::Running {
            run_id: spec.run_id.clone(),
            interval_ms: spec.interval_ms,
            workload_ids: spec.workload_ids.clone(),
            started_at,
        };
        *active = Some(ActiveRun {
            spec,
            shutdown: shutdown_tx,
            handle,
        });

        Ok(())
    }

    /// Stop the active run and wait for its in-flight tick
    ///
    /// Returns `Ok(None)` when idle. An empty `run_id` matches any run;
    /// otherwise, with `strict_run_id`, it must name the active run.
    pub async fn stop(&self, run_id: &str) -> Result<Option<RunSummary>, WorkerError> {
        let mut active = self.active.lock().await;

        let run = match active.take() {
            Some(run) => run,
            None => {
                debug!(run_id = %run_id, "Stop requested while idle");
                return Ok(None);
            }
        };

        if self.config.strict_run_id && !run_id.is_empty() && run_id != run.spec.run_id {
            let err = WorkerError::RunIdMismatch {
                requested: run_id.to_string(),
                active: run.spec.run_id.clone(),
            };
            *active = Some(run);
            return Err(err);
        }

        let summary = self.cancel(run).await;
        *self.snapshot.write().await = WorkerState::Idle;
        Ok(Some(summary))
    }

    /// Stop whatever run is active, used on process shutdown
    pub async fn shutdown(&self) -> Option<RunSummary> {
        let mut active = self.active.lock().await;
        let run = active.take()?;
        let summary = self.cancel(run).await;
        *self.snapshot.write().await = WorkerState::Idle;
        Some(summary)
    }

    /// Current state, answered without waiting for a transition
    ///
    /// A run whose loop already ended on its own reports `Idle`. While a
    /// stop is in progress the run is still reported as running.
    pub async fn state(&self) -> WorkerState {
        let snapshot = self.snapshot.read().await.clone();
        if !snapshot.is_running() {
            return snapshot;
        }

        match self.active.try_lock() {
            Ok(active) => match active.as_ref() {
                Some(run) if !run.is_finished() => snapshot,
                _ => WorkerState::Idle,
            },
            Err(_) => snapshot,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.state().await.is_running()
    }

    async fn cancel(&self, run: ActiveRun) -> RunSummary {
        // The receiver is gone if the loop already ended
        let _ = run.shutdown.send(true);
        self.reap(run).await
    }

    /// Wait for a run's task and account for how it ended
    async fn reap(&self, run: ActiveRun) -> RunSummary {
        let run_id = run.spec.run_id.clone();

        let summary = match run.handle.await {
            Ok(summary) => summary,
            Err(e) => {
                error!(run_id = %run_id, error = %e, "Sampling task failed");
                self.metrics.run_ended(true);
                let mut summary = RunSummary::new(run_id);
                summary.outcome = RunOutcome::TaskFailed(e.to_string());
                return summary;
            }
        };

        match &summary.outcome {
            RunOutcome::Stopped => {
                self.metrics.run_ended(false);
                self.logger
                    .log_run_stopped(&run_id, summary.ticks, summary.samples_recorded);
            }
            // Reported by the loop when it happened
            RunOutcome::SinkFailed(reason) => {
                info!(run_id = %run_id, reason = %reason, "Reaped aborted run");
            }
            RunOutcome::TaskFailed(_) => {}
        }

        summary
    }
}

/// Builder for the sampling worker
pub struct SamplingWorkerBuilder {
    source: Option<Arc<dyn MetricsSource>>,
    sink: Option<Arc<dyn RecordSink>>,
    config: WorkerConfig,
    logger: Option<RecorderLogger>,
    health: Option<HealthRegistry>,
}

impl SamplingWorkerBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            sink: None,
            config: WorkerConfig::default(),
            logger: None,
            health: None,
        }
    }

    pub fn source(mut self, source: Arc<dyn MetricsSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_consecutive_sink_failures(mut self, limit: u32) -> Self {
        self.config.max_consecutive_sink_failures = limit;
        self
    }

    pub fn strict_run_id(mut self, strict: bool) -> Self {
        self.config.strict_run_id = strict;
        self
    }

    pub fn logger(mut self, logger: RecorderLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Report run failures to a health registry
    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn build(self) -> Result<SamplingWorker> {
        let source = self
            .source
            .ok_or_else(|| anyhow::anyhow!("Metrics source is required"))?;
        let sink = self
            .sink
            .ok_or_else(|| anyhow::anyhow!("Record sink is required"))?;

        if self.config.max_consecutive_sink_failures == 0 {
            anyhow::bail!("max_consecutive_sink_failures must be at least 1");
        }

        Ok(SamplingWorker {
            source,
            sink,
            config: self.config,
            metrics: RecorderMetrics::new(),
            logger: self
                .logger
                .unwrap_or_else(|| RecorderLogger::new("unknown")),
            health: self.health,
            active: Mutex::new(None),
            snapshot: RwLock::new(WorkerState::Idle),
        })
    }
}

impl Default for SamplingWorkerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

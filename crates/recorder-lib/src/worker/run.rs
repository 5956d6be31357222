//! Sampling loop of a single run
//!
//! One task per run. Each tick reads every workload of the run from the
//! metrics source and appends the samples to the record sink.

use crate::health::{components, HealthRegistry};
use crate::models::{MetricSample, RunOutcome, RunSpec, RunSummary};
use crate::observability::{RecorderLogger, RecorderMetrics};
use crate::sink::RecordSink;
use crate::source::MetricsSource;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use super::WorkerConfig;

enum TickOutcome {
    Continue,
    /// The sink is gone, the run must end
    Abort(String),
}

pub(crate) struct SamplingLoop {
    spec: RunSpec,
    source: Arc<dyn MetricsSource>,
    sink: Arc<dyn RecordSink>,
    config: WorkerConfig,
    metrics: RecorderMetrics,
    logger: RecorderLogger,
    health: Option<HealthRegistry>,
    summary: RunSummary,
    consecutive_sink_failures: u32,
    sink_marked_healthy: bool,
    /// Last source status written to the health registry
    source_degraded: Option<bool>,
}

impl SamplingLoop {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        spec: RunSpec,
        source: Arc<dyn MetricsSource>,
        sink: Arc<dyn RecordSink>,
        config: WorkerConfig,
        metrics: RecorderMetrics,
        logger: RecorderLogger,
        health: Option<HealthRegistry>,
    ) -> Self {
        let summary = RunSummary::new(spec.run_id.clone());
        Self {
            spec,
            source,
            sink,
            config,
            metrics,
            logger,
            health,
            summary,
            consecutive_sink_failures: 0,
            sink_marked_healthy: false,
            source_degraded: None,
        }
    }

    /// Tick until cancelled or the sink fails persistently
    ///
    /// The first tick fires one interval after start. Ticks never overlap;
    /// a tick that overruns the interval causes the missed ticks to be
    /// skipped.
    pub(crate) async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> RunSummary {
        let period = Duration::from_millis(self.spec.interval_ms);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!(
            run_id = %self.spec.run_id,
            interval_ms = self.spec.interval_ms,
            "Sampling loop started"
        );

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    // Err means the worker dropped the sender
                    if changed.is_err() || cancelled(&shutdown) {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if cancelled(&shutdown) {
                        break;
                    }

                    if let TickOutcome::Abort(reason) = self.tick().await {
                        self.abort(reason).await;
                        break;
                    }

                    if cancelled(&shutdown) {
                        break;
                    }
                }
            }
        }

        debug!(
            run_id = %self.spec.run_id,
            ticks = self.summary.ticks,
            "Sampling loop finished"
        );
        self.summary
    }

    /// Sample every workload once
    ///
    /// A failed fetch or transient append only skips that workload.
    async fn tick(&mut self) -> TickOutcome {
        let started = Instant::now();
        let sample_time = Utc::now();
        self.summary.ticks += 1;
        let mut fetch_error: Option<String> = None;

        let outcome = self.sample_workloads(sample_time, &mut fetch_error).await;
        self.report_source_health(fetch_error).await;

        if let TickOutcome::Continue = outcome {
            self.metrics
                .observe_tick_latency(started.elapsed().as_secs_f64());
        }
        outcome
    }

    async fn sample_workloads(
        &mut self,
        sample_time: chrono::DateTime<Utc>,
        fetch_error: &mut Option<String>,
    ) -> TickOutcome {
        for workload_id in &self.spec.workload_ids {
            let usage = match self.source.fetch(workload_id).await {
                Ok(usage) => usage,
                Err(e) => {
                    self.summary.fetch_failures += 1;
                    self.metrics.inc_fetch_errors();
                    self.logger
                        .log_fetch_failed(&self.spec.run_id, workload_id, &e.to_string());
                    *fetch_error = Some(format!("{}: {}", workload_id, e));
                    continue;
                }
            };

            let sample = MetricSample::from_usage(&self.spec, workload_id, sample_time, usage);

            match self.sink.append(&sample).await {
                Ok(()) => {
                    self.summary.samples_recorded += 1;
                    self.consecutive_sink_failures = 0;
                    self.metrics.inc_samples_recorded();
                    if !self.sink_marked_healthy {
                        if let Some(health) = &self.health {
                            health.set_healthy(components::SINK).await;
                        }
                        self.sink_marked_healthy = true;
                    }
                }
                Err(e) => {
                    self.summary.sink_failures += 1;
                    self.consecutive_sink_failures += 1;
                    self.metrics.inc_sink_errors();
                    self.logger
                        .log_append_failed(&self.spec.run_id, workload_id, &e.to_string());

                    if e.is_persistent() {
                        return TickOutcome::Abort(e.to_string());
                    }
                    if self.consecutive_sink_failures >= self.config.max_consecutive_sink_failures {
                        return TickOutcome::Abort(format!(
                            "{} consecutive append failures, last: {}",
                            self.consecutive_sink_failures, e
                        ));
                    }
                }
            }
        }

        TickOutcome::Continue
    }

    /// Degrade the source while any fetch of the tick fails
    ///
    /// Healthy is written only when the source recovers.
    async fn report_source_health(&mut self, fetch_error: Option<String>) {
        let Some(health) = &self.health else {
            return;
        };

        match fetch_error {
            Some(message) => {
                health.set_degraded(components::SOURCE, message).await;
                self.source_degraded = Some(true);
            }
            None if self.source_degraded != Some(false) => {
                health.set_healthy(components::SOURCE).await;
                self.source_degraded = Some(false);
            }
            None => {}
        }
    }

    /// Report a sink failure out-of-band; the control caller is long gone
    async fn abort(&mut self, reason: String) {
        self.logger
            .log_run_aborted(&self.spec.run_id, &reason, self.summary.samples_recorded);
        self.metrics.run_ended(true);

        if let Some(health) = &self.health {
            health.set_unhealthy(components::SINK, reason.clone()).await;
            health
                .set_degraded(
                    components::SAMPLER,
                    format!("run {} aborted", self.spec.run_id),
                )
                .await;
        }

        self.summary.outcome = RunOutcome::SinkFailed(reason);
    }
}

fn cancelled(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

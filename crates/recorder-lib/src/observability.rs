//! Observability infrastructure for the metrics recorder
//!
//! Provides:
//! - Prometheus metrics (tick latency, recorded samples, error counters, run state)
//! - Structured JSON logging of run lifecycle events with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for tick latency (in seconds)
const TICK_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<RecorderMetricsInner> = OnceLock::new();

struct RecorderMetricsInner {
    tick_latency_seconds: Histogram,
    samples_recorded: IntCounter,
    fetch_errors: IntCounter,
    sink_errors: IntCounter,
    runs_started: IntCounter,
    runs_aborted: IntCounter,
    active_run: IntGauge,
    workloads_tracked: IntGauge,
}

impl RecorderMetricsInner {
    fn new() -> Self {
        Self {
            tick_latency_seconds: register_histogram!(
                "recorder_tick_latency_seconds",
                "Time spent sampling all workloads of a run in one tick",
                TICK_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register tick_latency_seconds"),

            samples_recorded: register_int_counter!(
                "recorder_samples_recorded_total",
                "Total number of samples appended to the record sink"
            )
            .expect("Failed to register samples_recorded"),

            fetch_errors: register_int_counter!(
                "recorder_fetch_errors_total",
                "Total number of failed workload fetches from the metrics source"
            )
            .expect("Failed to register fetch_errors"),

            sink_errors: register_int_counter!(
                "recorder_sink_errors_total",
                "Total number of failed appends to the record sink"
            )
            .expect("Failed to register sink_errors"),

            runs_started: register_int_counter!(
                "recorder_runs_started_total",
                "Total number of sampling runs started"
            )
            .expect("Failed to register runs_started"),

            runs_aborted: register_int_counter!(
                "recorder_runs_aborted_total",
                "Total number of sampling runs ended by a persistent sink failure"
            )
            .expect("Failed to register runs_aborted"),

            active_run: register_int_gauge!(
                "recorder_active_run",
                "1 while a sampling run is recording, 0 otherwise"
            )
            .expect("Failed to register active_run"),

            workloads_tracked: register_int_gauge!(
                "recorder_workloads_tracked",
                "Number of workloads sampled by the active run"
            )
            .expect("Failed to register workloads_tracked"),
        }
    }
}

/// Recorder metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct RecorderMetrics {
    _private: (),
}

impl Default for RecorderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(RecorderMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &RecorderMetricsInner {
        GLOBAL_METRICS.get_or_init(RecorderMetricsInner::new)
    }

    pub fn observe_tick_latency(&self, duration_secs: f64) {
        self.inner().tick_latency_seconds.observe(duration_secs);
    }

    pub fn inc_samples_recorded(&self) {
        self.inner().samples_recorded.inc();
    }

    pub fn inc_fetch_errors(&self) {
        self.inner().fetch_errors.inc();
    }

    pub fn inc_sink_errors(&self) {
        self.inner().sink_errors.inc();
    }

    /// Mark a run as started and record how many workloads it samples
    pub fn run_started(&self, workloads: usize) {
        self.inner().runs_started.inc();
        self.inner().active_run.set(1);
        self.inner().workloads_tracked.set(workloads as i64);
    }

    /// Mark the active slot as empty
    pub fn run_ended(&self, aborted: bool) {
        if aborted {
            self.inner().runs_aborted.inc();
        }
        self.inner().active_run.set(0);
        self.inner().workloads_tracked.set(0);
    }
}

/// Structured logger for recorder events
///
/// Emits consistent, machine-readable events for the run lifecycle. Run
/// failures that happen after the control caller disconnected are
/// reported here.
#[derive(Clone)]
pub struct RecorderLogger {
    node_name: String,
}

impl RecorderLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Log recorder startup
    pub fn log_startup(&self, version: &str, grpc_addr: &str) {
        info!(
            event = "recorder_started",
            node = %self.node_name,
            version = %version,
            grpc_addr = %grpc_addr,
            "Metrics recorder started"
        );
    }

    /// Log recorder shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "recorder_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Metrics recorder shutting down"
        );
    }

    pub fn log_run_started(&self, run_id: &str, interval_ms: u64, workloads: &[String]) {
        info!(
            event = "run_started",
            node = %self.node_name,
            run_id = %run_id,
            interval_ms = interval_ms,
            workloads = ?workloads,
            "Sampling run started"
        );
    }

    pub fn log_run_stopped(&self, run_id: &str, ticks: u64, samples: u64) {
        info!(
            event = "run_stopped",
            node = %self.node_name,
            run_id = %run_id,
            ticks = ticks,
            samples_recorded = samples,
            "Sampling run stopped"
        );
    }

    /// Log a run ended by the worker itself
    pub fn log_run_aborted(&self, run_id: &str, reason: &str, samples: u64) {
        error!(
            event = "run_aborted",
            node = %self.node_name,
            run_id = %run_id,
            reason = %reason,
            samples_recorded = samples,
            "Sampling run aborted, record sink is unavailable"
        );
    }

    pub fn log_fetch_failed(&self, run_id: &str, workload_id: &str, error: &str) {
        warn!(
            event = "sample_fetch_failed",
            node = %self.node_name,
            run_id = %run_id,
            workload_id = %workload_id,
            error = %error,
            "Failed to fetch workload metrics, skipping sample"
        );
    }

    pub fn log_append_failed(&self, run_id: &str, workload_id: &str, error: &str) {
        warn!(
            event = "sample_append_failed",
            node = %self.node_name,
            run_id = %run_id,
            workload_id = %workload_id,
            error = %error,
            "Failed to append sample to record sink"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_metrics_creation() {
        // Metrics live in the global registry, so this only checks that the
        // handle can be created repeatedly and observed.
        let metrics = RecorderMetrics::new();
        let again = RecorderMetrics::new();

        metrics.observe_tick_latency(0.01);
        metrics.inc_samples_recorded();
        metrics.inc_fetch_errors();
        again.inc_sink_errors();
        metrics.run_started(2);
        metrics.run_ended(false);
    }

    #[test]
    fn test_recorder_logger_creation() {
        let logger = RecorderLogger::new("test-node");
        assert_eq!(logger.node_name(), "test-node");
    }
}

//! Core data models for the metrics recorder

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WorkerError;

/// One resource-usage observation of a workload, tagged with its run
///
/// `(run_id, workload_id, sample_time)` identifies a logical sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub run_id: String,
    pub workload_id: String,
    pub sample_time: DateTime<Utc>,
    pub interval_ms: u64,
    /// Fractional CPU cores
    pub cpu_usage: f64,
    /// Bytes
    pub memory_usage: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_usage: Option<f64>,
}

impl MetricSample {
    /// Build a sample from a source reading taken during a run's tick
    pub fn from_usage(
        spec: &RunSpec,
        workload_id: &str,
        sample_time: DateTime<Utc>,
        usage: WorkloadUsage,
    ) -> Self {
        Self {
            run_id: spec.run_id.clone(),
            workload_id: workload_id.to_string(),
            sample_time,
            interval_ms: spec.interval_ms,
            cpu_usage: usage.cpu_usage,
            memory_usage: usage.memory_usage,
            power_usage: usage.power_usage,
        }
    }
}

/// Current usage of a single workload as reported by a metrics source
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkloadUsage {
    pub cpu_usage: f64,
    pub memory_usage: u64,
    pub power_usage: Option<f64>,
}

/// Parameters of a sampling run, fixed for its lifetime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSpec {
    pub run_id: String,
    pub interval_ms: u64,
    /// Sampled in this order on every tick
    pub workload_ids: Vec<String>,
}

impl RunSpec {
    pub fn new(run_id: impl Into<String>, interval_ms: u64, workload_ids: Vec<String>) -> Self {
        Self {
            run_id: run_id.into(),
            interval_ms,
            workload_ids,
        }
    }

    /// Check start parameters before any state changes
    pub fn validate(&self) -> Result<(), WorkerError> {
        if self.run_id.trim().is_empty() {
            return Err(WorkerError::InvalidRequest("run_id must not be empty".into()));
        }
        if self.interval_ms == 0 {
            return Err(WorkerError::InvalidRequest(
                "interval_ms must be positive".into(),
            ));
        }
        if self.workload_ids.is_empty() {
            return Err(WorkerError::InvalidRequest(
                "workload_ids must not be empty".into(),
            ));
        }
        if self.workload_ids.iter().any(|w| w.trim().is_empty()) {
            return Err(WorkerError::InvalidRequest(
                "workload_ids must not contain blank entries".into(),
            ));
        }
        Ok(())
    }
}

/// Externally visible state of the sampling worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum WorkerState {
    Idle,
    Running {
        run_id: String,
        interval_ms: u64,
        workload_ids: Vec<String>,
        started_at: DateTime<Utc>,
    },
}

impl WorkerState {
    pub fn is_running(&self) -> bool {
        matches!(self, WorkerState::Running { .. })
    }

    pub fn run_id(&self) -> Option<&str> {
        match self {
            WorkerState::Idle => None,
            WorkerState::Running { run_id, .. } => Some(run_id),
        }
    }
}

/// How a sampling run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Cancelled by a stop request
    Stopped,
    /// Ended by the worker after the record sink failed persistently
    SinkFailed(String),
    /// The sampling task itself died
    TaskFailed(String),
}

/// Counters for a finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub ticks: u64,
    pub samples_recorded: u64,
    pub fetch_failures: u64,
    pub sink_failures: u64,
    pub outcome: RunOutcome,
}

impl RunSummary {
    pub(crate) fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ticks: 0,
            samples_recorded: 0,
            fetch_failures: 0,
            sink_failures: 0,
            outcome: RunOutcome::Stopped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(interval_ms: u64, workloads: &[&str]) -> RunSpec {
        RunSpec::new(
            "r1",
            interval_ms,
            workloads.iter().map(|w| w.to_string()).collect(),
        )
    }

    #[test]
    fn test_validate_accepts_well_formed_spec() {
        assert!(spec(1000, &["pod-a", "pod-b"]).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let err = spec(0, &["pod-a"]).validate().unwrap_err();
        assert!(matches!(err, WorkerError::InvalidRequest(_)));
        assert!(err.to_string().contains("interval_ms"));
    }

    #[test]
    fn test_validate_rejects_empty_workloads() {
        let err = spec(1000, &[]).validate().unwrap_err();
        assert!(err.to_string().contains("workload_ids"));
    }

    #[test]
    fn test_validate_rejects_blank_workload_and_run_id() {
        assert!(spec(1000, &["pod-a", " "]).validate().is_err());

        let mut blank_run = spec(1000, &["pod-a"]);
        blank_run.run_id = String::new();
        assert!(blank_run.validate().is_err());
    }

    #[test]
    fn test_sample_from_usage_carries_run_fields() {
        let spec = spec(500, &["pod-a"]);
        let now = Utc::now();
        let sample = MetricSample::from_usage(
            &spec,
            "pod-a",
            now,
            WorkloadUsage {
                cpu_usage: 0.25,
                memory_usage: 4096,
                power_usage: None,
            },
        );

        assert_eq!(sample.run_id, "r1");
        assert_eq!(sample.interval_ms, 500);
        assert_eq!(sample.sample_time, now);
        assert_eq!(sample.memory_usage, 4096);
    }

    #[test]
    fn test_worker_state_serializes_with_tag() {
        let json = serde_json::to_value(WorkerState::Idle).unwrap();
        assert_eq!(json["state"], "idle");
    }
}

//! In-process record sink

use super::RecordSink;
use crate::error::SinkError;
use crate::models::MetricSample;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Keeps appended samples in memory, in append order
#[derive(Debug, Default)]
pub struct MemorySink {
    samples: RwLock<Vec<MetricSample>>,
    closed: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All samples appended so far
    pub async fn samples(&self) -> Vec<MetricSample> {
        self.samples.read().await.clone()
    }

    /// Samples of one run, ordered by capture time then workload
    pub async fn samples_for_run(&self, run_id: &str) -> Vec<MetricSample> {
        let mut samples: Vec<MetricSample> = self
            .samples
            .read()
            .await
            .iter()
            .filter(|s| s.run_id == run_id)
            .cloned()
            .collect();
        samples.sort_by(|a, b| {
            a.sample_time
                .cmp(&b.sample_time)
                .then_with(|| a.workload_id.cmp(&b.workload_id))
        });
        samples
    }

    pub async fn len(&self) -> usize {
        self.samples.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.samples.read().await.is_empty()
    }

    /// Refuse all further appends
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn append(&self, sample: &MetricSample) -> Result<(), SinkError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SinkError::Closed("memory sink closed".to_string()));
        }

        debug!(
            run_id = %sample.run_id,
            workload_id = %sample.workload_id,
            cpu_usage = sample.cpu_usage,
            memory_usage = sample.memory_usage,
            "Recorded sample"
        );
        self.samples.write().await.push(sample.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn sample(run_id: &str, workload_id: &str, offset_ms: i64) -> MetricSample {
        MetricSample {
            run_id: run_id.to_string(),
            workload_id: workload_id.to_string(),
            sample_time: Utc::now() + Duration::milliseconds(offset_ms),
            interval_ms: 1000,
            cpu_usage: 0.5,
            memory_usage: 1_048_576,
            power_usage: None,
        }
    }

    #[tokio::test]
    async fn test_round_trip_preserves_fields() {
        let sink = MemorySink::new();
        let original = sample("r1", "pod-a", 0);

        sink.append(&original).await.unwrap();

        let stored = sink.samples_for_run("r1").await;
        assert_eq!(stored, vec![original]);
        assert_eq!(stored[0].cpu_usage, 0.5);
        assert_eq!(stored[0].memory_usage, 1_048_576);
    }

    #[tokio::test]
    async fn test_samples_for_run_filters_and_orders() {
        let sink = MemorySink::new();
        sink.append(&sample("r1", "pod-b", 10)).await.unwrap();
        sink.append(&sample("r2", "pod-a", 0)).await.unwrap();
        sink.append(&sample("r1", "pod-a", 0)).await.unwrap();

        let r1 = sink.samples_for_run("r1").await;
        assert_eq!(r1.len(), 2);
        assert_eq!(r1[0].workload_id, "pod-a");
        assert_eq!(r1[1].workload_id, "pod-b");
        assert_eq!(sink.len().await, 3);
    }

    #[tokio::test]
    async fn test_closed_sink_rejects_appends() {
        let sink = MemorySink::new();
        sink.close();

        let err = sink.append(&sample("r1", "pod-a", 0)).await.unwrap_err();
        assert!(err.is_persistent());
        assert!(sink.is_empty().await);
    }
}

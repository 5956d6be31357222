//! Error types for the sampling core

use thiserror::Error;

/// Failure reading one workload from a metrics source
///
/// Always scoped to a single call for a single workload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("workload {0} not found")]
    NotFound(String),
    #[error("metrics source unavailable: {0}")]
    Unavailable(String),
}

/// Failure appending a sample to a record sink
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// Transient, the next append may succeed
    #[error("record sink unavailable: {0}")]
    Unavailable(String),
    /// The sink will not accept further appends
    #[error("record sink closed: {0}")]
    Closed(String),
}

impl SinkError {
    pub fn is_persistent(&self) -> bool {
        matches!(self, SinkError::Closed(_))
    }
}

/// Errors returned by worker state transitions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("run {0} is already recording")]
    AlreadyRunning(String),
    #[error("run id {requested} does not match active run {active}")]
    RunIdMismatch { requested: String, active: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_error_persistence() {
        assert!(SinkError::Closed("pool closed".into()).is_persistent());
        assert!(!SinkError::Unavailable("timeout".into()).is_persistent());
    }

    #[test]
    fn test_worker_error_messages() {
        let err = WorkerError::RunIdMismatch {
            requested: "r2".into(),
            active: "r1".into(),
        };
        assert_eq!(err.to_string(), "run id r2 does not match active run r1");
        assert_eq!(
            WorkerError::AlreadyRunning("r1".into()).to_string(),
            "run r1 is already recording"
        );
    }
}

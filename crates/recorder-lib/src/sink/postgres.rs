//! PostgreSQL record sink
//!
//! One row per sample in `performance_metrics`. Table creation is a
//! bootstrap step (`ensure_schema`) run once at startup, never per sample.

use super::RecordSink;
use crate::error::SinkError;
use crate::models::MetricSample;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS performance_metrics (
    id           BIGSERIAL PRIMARY KEY,
    run_id       TEXT             NOT NULL,
    workload_id  TEXT             NOT NULL,
    sample_time  TIMESTAMPTZ      NOT NULL,
    interval_ms  BIGINT           NOT NULL,
    cpu_usage    DOUBLE PRECISION NOT NULL,
    memory_usage BIGINT           NOT NULL,
    power_usage  DOUBLE PRECISION
)"#;

const CREATE_RUN_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS performance_metrics_run_id_idx ON performance_metrics (run_id)";

const INSERT_SAMPLE: &str = r#"
INSERT INTO performance_metrics
    (run_id, workload_id, sample_time, interval_ms, cpu_usage, memory_usage, power_usage)
VALUES ($1, $2, $3, $4, $5, $6, $7)"#;

const SELECT_RUN: &str = r#"
SELECT run_id, workload_id, sample_time, interval_ms, cpu_usage, memory_usage, power_usage
FROM performance_metrics
WHERE run_id = $1
ORDER BY sample_time, workload_id"#;

/// Connection settings for the PostgreSQL sink
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5432,
            username: "postgres".to_string(),
            password: "password".to_string(),
            database: "postgres".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 10,
        }
    }
}

impl std::fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .finish_non_exhaustive()
    }
}

#[derive(sqlx::FromRow)]
struct SampleRow {
    run_id: String,
    workload_id: String,
    sample_time: DateTime<Utc>,
    interval_ms: i64,
    cpu_usage: f64,
    memory_usage: i64,
    power_usage: Option<f64>,
}

impl From<SampleRow> for MetricSample {
    fn from(row: SampleRow) -> Self {
        Self {
            run_id: row.run_id,
            workload_id: row.workload_id,
            sample_time: row.sample_time,
            interval_ms: row.interval_ms.max(0) as u64,
            cpu_usage: row.cpu_usage,
            memory_usage: row.memory_usage.max(0) as u64,
            power_usage: row.power_usage,
        }
    }
}

/// Record sink writing to PostgreSQL through a connection pool
#[derive(Debug, Clone)]
pub struct PostgresSink {
    pool: PgPool,
}

impl PostgresSink {
    /// Connect and verify the database is reachable
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .password(&config.password)
            .database(&config.database);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to PostgreSQL at {}:{}",
                    config.host, config.port
                )
            })?;

        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "Connected to PostgreSQL"
        );

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the metrics table and its index if missing
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .context("Failed to create performance_metrics table")?;
        sqlx::query(CREATE_RUN_INDEX)
            .execute(&self.pool)
            .await
            .context("Failed to create performance_metrics index")?;
        Ok(())
    }

    /// Read back every sample recorded for a run
    pub async fn samples_for_run(&self, run_id: &str) -> Result<Vec<MetricSample>, SinkError> {
        let rows: Vec<SampleRow> = sqlx::query_as(SELECT_RUN)
            .bind(run_id)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;
        Ok(rows.into_iter().map(MetricSample::from).collect())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl RecordSink for PostgresSink {
    async fn append(&self, sample: &MetricSample) -> Result<(), SinkError> {
        let interval_ms = i64::try_from(sample.interval_ms)
            .map_err(|_| SinkError::Unavailable("interval_ms out of range".to_string()))?;
        let memory_usage = i64::try_from(sample.memory_usage)
            .map_err(|_| SinkError::Unavailable("memory_usage out of range".to_string()))?;

        sqlx::query(INSERT_SAMPLE)
            .bind(&sample.run_id)
            .bind(&sample.workload_id)
            .bind(sample.sample_time)
            .bind(interval_ms)
            .bind(sample.cpu_usage)
            .bind(memory_usage)
            .bind(sample.power_usage)
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        Ok(())
    }
}

/// Map driver errors onto transient and persistent sink failures
fn classify(err: sqlx::Error) -> SinkError {
    match err {
        sqlx::Error::PoolClosed
        | sqlx::Error::Configuration(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_) => SinkError::Closed(err.to_string()),
        other => SinkError::Unavailable(other.to_string()),
    }
}

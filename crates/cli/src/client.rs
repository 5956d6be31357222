//! Clients for the recorder's control and status endpoints

use anyhow::{Context, Result};
use recorder_lib::proto::{Ack, MetricsRecorderClient, StartRecordingRequest, StopRecordingRequest};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tonic::transport::Channel;
use url::Url;

/// gRPC client for StartRecording / StopRecording
pub struct ControlClient {
    inner: MetricsRecorderClient<Channel>,
}

impl ControlClient {
    pub async fn connect(endpoint: &str) -> Result<Self> {
        let inner = MetricsRecorderClient::connect(endpoint.to_string())
            .await
            .with_context(|| format!("Failed to connect to recorder at {}", endpoint))?;
        Ok(Self { inner })
    }

    pub async fn start_recording(
        &mut self,
        run_id: &str,
        interval_ms: i64,
        workload_ids: Vec<String>,
    ) -> Result<Ack> {
        let request = StartRecordingRequest {
            run_id: run_id.to_string(),
            interval_ms,
            workload_ids,
        };

        let response = self
            .inner
            .start_recording(request)
            .await
            .context("StartRecording call failed")?;
        Ok(response.into_inner())
    }

    pub async fn stop_recording(&mut self, run_id: &str) -> Result<Ack> {
        let request = StopRecordingRequest {
            run_id: run_id.to_string(),
        };

        let response = self
            .inner
            .stop_recording(request)
            .await
            .context("StopRecording call failed")?;
        Ok(response.into_inner())
    }
}

/// HTTP client for the recorder's status API
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// GET a JSON document
    ///
    /// Health endpoints answer 503 with a body, so any status is decoded.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        response.json().await.context("Failed to parse response")
    }
}

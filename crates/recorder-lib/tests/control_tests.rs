//! End-to-end tests of the control service over a real gRPC connection

use recorder_lib::proto::{MetricsRecorderClient, MetricsRecorderServer};
use recorder_lib::proto::{StartRecordingRequest, StopRecordingRequest};
use recorder_lib::source::async_trait;
use recorder_lib::{
    MemorySink, MetricsSource, RecorderService, SamplingWorker, SourceError, WorkloadUsage,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Channel, Server};

struct FixedSource;

#[async_trait]
impl MetricsSource for FixedSource {
    async fn fetch(&self, workload_id: &str) -> Result<WorkloadUsage, SourceError> {
        if workload_id == "missing" {
            return Err(SourceError::NotFound(workload_id.to_string()));
        }
        Ok(WorkloadUsage {
            cpu_usage: 0.125,
            memory_usage: 64 * 1024 * 1024,
            power_usage: None,
        })
    }
}

struct TestServer {
    client: MetricsRecorderClient<Channel>,
    sink: Arc<MemorySink>,
    worker: Arc<SamplingWorker>,
    shutdown: oneshot::Sender<()>,
}

async fn start_server() -> TestServer {
    let sink = Arc::new(MemorySink::new());
    let worker = Arc::new(
        SamplingWorker::builder()
            .source(Arc::new(FixedSource))
            .sink(sink.clone())
            .build()
            .unwrap(),
    );
    let service = RecorderService::new(worker.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        Server::builder()
            .add_service(MetricsRecorderServer::new(service))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    let client = MetricsRecorderClient::connect(format!("http://{}", addr))
        .await
        .unwrap();

    TestServer {
        client,
        sink,
        worker,
        shutdown: shutdown_tx,
    }
}

fn start_request(run_id: &str, interval_ms: i64, workloads: &[&str]) -> StartRecordingRequest {
    StartRecordingRequest {
        run_id: run_id.to_string(),
        interval_ms,
        workload_ids: workloads.iter().map(|w| w.to_string()).collect(),
    }
}

fn stop_request(run_id: &str) -> StopRecordingRequest {
    StopRecordingRequest {
        run_id: run_id.to_string(),
    }
}

#[tokio::test]
async fn test_record_run_over_grpc() {
    let mut server = start_server().await;

    let ack = server
        .client
        .start_recording(start_request("r1", 50, &["pod-a", "pod-b"]))
        .await
        .unwrap()
        .into_inner();
    assert!(ack.status, "{}", ack.message);

    tokio::time::sleep(Duration::from_millis(180)).await;

    let ack = server
        .client
        .stop_recording(stop_request("r1"))
        .await
        .unwrap()
        .into_inner();
    assert!(ack.status, "{}", ack.message);

    let samples = server.sink.samples_for_run("r1").await;
    assert!(samples.len() >= 2);
    // Every tick samples both workloads
    assert_eq!(samples.len() % 2, 0);
    assert!(samples.iter().all(|s| s.interval_ms == 50));

    let recorded = server.sink.len().await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(server.sink.len().await, recorded);

    let _ = server.shutdown.send(());
}

#[tokio::test]
async fn test_second_start_is_reported_in_ack() {
    let mut server = start_server().await;

    let first = server
        .client
        .start_recording(start_request("r1", 1000, &["pod-a"]))
        .await
        .unwrap()
        .into_inner();
    assert!(first.status);

    let second = server
        .client
        .start_recording(start_request("r2", 1000, &["pod-a"]))
        .await
        .unwrap()
        .into_inner();
    assert!(!second.status);
    assert!(second.message.contains("r1"));

    assert_eq!(server.worker.state().await.run_id(), Some("r1"));

    server.worker.shutdown().await;
    let _ = server.shutdown.send(());
}

#[tokio::test]
async fn test_invalid_start_and_idle_stop() {
    let mut server = start_server().await;

    let ack = server
        .client
        .start_recording(start_request("r1", 0, &["pod-a"]))
        .await
        .unwrap()
        .into_inner();
    assert!(!ack.status);

    let ack = server
        .client
        .start_recording(start_request("r1", 1000, &[]))
        .await
        .unwrap()
        .into_inner();
    assert!(!ack.status);
    assert!(ack.message.contains("workload_ids"));

    let ack = server
        .client
        .stop_recording(stop_request(""))
        .await
        .unwrap()
        .into_inner();
    assert!(ack.status);
    assert!(!server.worker.is_running().await);

    let _ = server.shutdown.send(());
}

#[tokio::test]
async fn test_missing_workload_does_not_block_others() {
    let mut server = start_server().await;

    server
        .client
        .start_recording(start_request("r1", 40, &["missing", "pod-b"]))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(130)).await;

    server
        .client
        .stop_recording(stop_request("r1"))
        .await
        .unwrap();

    let samples = server.sink.samples_for_run("r1").await;
    assert!(!samples.is_empty());
    assert!(samples.iter().all(|s| s.workload_id == "pod-b"));

    let _ = server.shutdown.send(());
}

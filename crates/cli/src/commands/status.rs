//! Show the recorder's run state and component health

use anyhow::Result;
use colored::Colorize;
use recorder_lib::{HealthResponse, WorkerState};
use serde::Serialize;

use crate::client::ApiClient;
use crate::output::{color_status, print_info, print_json, print_warning, OutputFormat};

#[derive(Serialize)]
struct StatusView {
    worker: WorkerState,
    health: HealthResponse,
}

pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let worker: WorkerState = client.get("status").await?;
    let health: HealthResponse = client.get("healthz").await?;

    if let OutputFormat::Json = format {
        print_json(&StatusView { worker, health });
        return Ok(());
    }

    match &worker {
        WorkerState::Idle => print_info(&format!("Worker: {}", color_status("idle"))),
        WorkerState::Running {
            run_id,
            interval_ms,
            workload_ids,
            started_at,
        } => {
            print_info(&format!("Worker: {}", color_status("running")));
            println!("  {} {}", "Run:".bold(), run_id);
            println!("  {} {}ms", "Interval:".bold(), interval_ms);
            println!("  {} {}", "Workloads:".bold(), workload_ids.join(", "));
            println!("  {} {}", "Started:".bold(), started_at.to_rfc3339());
        }
    }

    let overall = format!("{:?}", health.status).to_lowercase();
    println!();
    println!("{} {}", "Health:".bold(), color_status(&overall));

    let mut names: Vec<_> = health.components.keys().collect();
    names.sort();
    for name in names {
        let component = &health.components[name];
        let status = format!("{:?}", component.status).to_lowercase();
        match &component.message {
            Some(message) => println!("  {:<10} {} ({})", name, color_status(&status), message),
            None => println!("  {:<10} {}", name, color_status(&status)),
        }
    }

    if !health.status.is_operational() {
        print_warning("Recorder reports an unhealthy component");
    }

    Ok(())
}

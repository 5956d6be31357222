//! Metrics Recorder CLI
//!
//! Starts and stops recording runs on a metrics-recorder daemon and shows
//! its current state.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{recording, status};

/// Metrics Recorder CLI
#[derive(Parser)]
#[command(name = "recorderctl")]
#[command(author, version, about = "CLI for the Metrics Recorder", long_about = None)]
pub struct Cli {
    /// gRPC control endpoint (can also be set via RECORDER_ENDPOINT env var)
    #[arg(long, env = "RECORDER_ENDPOINT", default_value = "http://127.0.0.1:9090")]
    pub endpoint: String,

    /// HTTP status endpoint (can also be set via RECORDER_API_URL env var)
    #[arg(long, env = "RECORDER_API_URL", default_value = "http://127.0.0.1:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "text")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a recording run
    Start {
        /// Identifier stamped on every sample of the run
        #[arg(long)]
        run_id: String,

        /// Sampling period in milliseconds
        #[arg(long, default_value_t = 1000, allow_negative_numbers = true)]
        interval_ms: i64,

        /// Workload (pod) to sample, repeatable
        #[arg(long = "workload", short = 'w', required = true)]
        workloads: Vec<String>,
    },

    /// Stop the active recording run
    Stop {
        /// Run to stop; stops any active run when omitted
        #[arg(long, default_value = "")]
        run_id: String,
    },

    /// Show the worker state and component health
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            run_id,
            interval_ms,
            workloads,
        } => {
            let mut client = client::ControlClient::connect(&cli.endpoint).await?;
            recording::start(&mut client, &run_id, interval_ms, workloads, cli.format).await?;
        }
        Commands::Stop { run_id } => {
            let mut client = client::ControlClient::connect(&cli.endpoint).await?;
            recording::stop(&mut client, &run_id, cli.format).await?;
        }
        Commands::Status => {
            let client = client::ApiClient::new(&cli.api_url)?;
            status::show_status(&client, cli.format).await?;
        }
    }

    Ok(())
}

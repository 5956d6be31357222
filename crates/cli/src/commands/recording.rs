//! Start and stop recording runs

use anyhow::{bail, Result};

use crate::client::ControlClient;
use crate::output::{print_ack, OutputFormat};

/// Ask the recorder to start a run
pub async fn start(
    client: &mut ControlClient,
    run_id: &str,
    interval_ms: i64,
    workloads: Vec<String>,
    format: OutputFormat,
) -> Result<()> {
    let ack = client.start_recording(run_id, interval_ms, workloads).await?;
    print_ack(&ack, format);

    if !ack.status {
        bail!("recorder rejected the start request");
    }
    Ok(())
}

/// Ask the recorder to stop a run; an empty run id stops whatever is active
pub async fn stop(client: &mut ControlClient, run_id: &str, format: OutputFormat) -> Result<()> {
    let ack = client.stop_recording(run_id).await?;
    print_ack(&ack, format);

    if !ack.status {
        bail!("recorder rejected the stop request");
    }
    Ok(())
}

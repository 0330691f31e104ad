pub mod cycle;
pub mod ticker;

pub use cycle::{CycleOutcome, CycleReport, MonitoringCycle};
pub use ticker::Ticker;

use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub async fn run(cycle: Arc<MonitoringCycle>, mut ticks: mpsc::Receiver<Instant>) {
    let mut in_flight: Option<JoinHandle<CycleOutcome>> = None;

    while ticks.recv().await.is_some() {
        if cycle.is_running() {
            warn!("Previous cycle still running, dropping timer fire");
            continue;
        }
        if let Some(previous) = in_flight.take() {
            reap(previous).await;
        }
        let cycle = Arc::clone(&cycle);
        in_flight = Some(tokio::spawn(async move { cycle.run_once().await }));
    }

    info!("Ticker stopped, waiting for in-flight cycle");
    if let Some(last) = in_flight {
        reap(last).await;
    }
}

async fn reap(handle: JoinHandle<CycleOutcome>) {
    if let Err(e) = handle.await {
        error!("Monitoring cycle task failed: {}", e);
    }
}

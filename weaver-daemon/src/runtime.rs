use tokio::sync::{broadcast, mpsc};

use weaver_core::ProjectGraph;

use crate::error::DaemonError;
use crate::scheduler::SyncGeneratorScheduler;

/// Feed graph snapshots from the daemon's graph recomputation into the
/// scheduler until the channel closes or shutdown is broadcast.
///
/// A snapshot that cannot be collected (unreadable workspace config) is
/// logged and skipped; the next snapshot retries from scratch.
pub async fn graph_events_task(
    scheduler: SyncGeneratorScheduler,
    mut graph_rx: mpsc::Receiver<ProjectGraph>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_graph = graph_rx.recv() => {
                let Some(graph) = maybe_graph else { break };
                if let Err(err) = scheduler.collect_and_schedule(graph).await {
                    tracing::error!(error = %err, "failed to collect sync generators");
                }
            }
        }
    }

    scheduler.shutdown().await;
    tracing::info!("sync generator scheduler stopped");
    Ok(())
}

use std::sync::Arc;

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinSet,
};
use tracing::{debug, error, info};

use concord_consensus::KeyedSerialQueue;

use super::consensus_driver::CommitEvent;
use crate::storage::CommitStore;

/// Persists commit events until `shutdown` fires, then drains what is buffered.
///
/// Writes go through `queue` keyed by topic, so two commits of the same
/// topic never overlap while different topics are written concurrently.
/// Returns the number of records stored.
pub async fn run_commits<S>(
    store: Arc<S>,
    queue: KeyedSerialQueue<String>,
    mut commits: mpsc::UnboundedReceiver<CommitEvent>,
    mut shutdown: oneshot::Receiver<()>,
) -> usize
where
    S: CommitStore + 'static,
{
    let mut writes = JoinSet::new();
    let mut applied = 0;
    let mut closing = false;

    loop {
        tokio::select! {
            _ = &mut shutdown, if !closing => {
                // Buffered events are still delivered after close.
                commits.close();
                closing = true;
            }
            event = commits.recv() => {
                let Some(event) = event else { break };
                let store = Arc::clone(&store);
                let topic = event.topic.clone();
                let handle = queue.submit(topic.clone(), async move { store.apply(event).await });
                debug!("🧾 Commit of [{}] queued as {}", topic, handle.id());

                writes.spawn(async move {
                    match handle.wait().await {
                        Ok(record) => {
                            tracing::info!(target: "consensus", "EVENT:PERSIST topic={} revision={}", record.topic, record.revision);
                            true
                        }
                        Err(e) => {
                            error!("❌ Failed to persist commit of [{}]: {}", topic, e);
                            false
                        }
                    }
                });
            }
            Some(done) = writes.join_next(), if !writes.is_empty() => {
                if matches!(done, Ok(true)) {
                    applied += 1;
                }
            }
        }
    }

    while let Some(done) = writes.join_next().await {
        if matches!(done, Ok(true)) {
            applied += 1;
        }
    }

    info!("🧾 Commit pipeline stopped after {} writes", applied);
    applied
}

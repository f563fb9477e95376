use std::{path::PathBuf, sync::Arc, time::Duration};

use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{info, warn};

use concord_common::error::{ConcordError, Result};
use concord_consensus::KeyedSerialQueue;

use super::{committer::run_commits, consensus_driver::ConsensusDriver};
use crate::{config::NodeConfig, storage::MemoryStore};

/// A running node: vote intake, commit pipeline and optional topic sweeper.
pub struct NodeRuntime {
    pub driver: Arc<ConsensusDriver>,
    pub store: Arc<MemoryStore>,
    committer: JoinHandle<usize>,
    shutdown_tx: oneshot::Sender<()>,
    sweeper: Option<JoinHandle<()>>,
    snapshot_path: Option<PathBuf>,
}

pub async fn build_runtime(config: NodeConfig) -> Result<NodeRuntime> {
    config.validate()?;

    let store = match &config.snapshot_path {
        Some(path) if path.exists() => MemoryStore::from_snapshot(path)?,
        _ => MemoryStore::new(),
    };
    let store = Arc::new(store);

    let (driver, commits) = ConsensusDriver::new(&config)?;
    let driver = Arc::new(driver);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let committer = tokio::spawn(run_commits(
        Arc::clone(&store),
        KeyedSerialQueue::new(),
        commits,
        shutdown_rx,
    ));

    let sweeper = config
        .quorum
        .topic_ttl()
        .map(|ttl| spawn_sweeper(Arc::clone(&driver), ttl));

    info!(
        "🚀 Node [{}] ready (members: {}, limit: {}, reduce: {:?})",
        config.node_id,
        driver.member_count().await,
        config.quorum.limit,
        config.reduce
    );

    Ok(NodeRuntime {
        driver,
        store,
        committer,
        shutdown_tx,
        sweeper,
        snapshot_path: config.snapshot_path,
    })
}

impl NodeRuntime {
    /// Stops intake of new commits, waits for pending writes and exports the snapshot.
    /// Returns the number of commits persisted during this run.
    pub async fn shutdown(self) -> Result<usize> {
        if let Some(sweeper) = self.sweeper {
            sweeper.abort();
        }

        if self.shutdown_tx.send(()).is_err() {
            warn!("⚠️ Commit pipeline already stopped");
        }
        let applied = self
            .committer
            .await
            .map_err(|e| ConcordError::Task(format!("commit pipeline crashed: {e}")))?;

        if let Some(path) = &self.snapshot_path {
            self.store.export(path).await?;
            info!("📦 Snapshot written to {}", path.display());
        }
        Ok(applied)
    }
}

fn spawn_sweeper(driver: Arc<ConsensusDriver>, ttl: Duration) -> JoinHandle<()> {
    info!("⌛ Expiring unresolved topics after {:?}", ttl);
    tokio::spawn(async move {
        let mut tick = interval(ttl / 2);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            driver.expire_stale(ttl).await;
        }
    })
}

//! storage.rs
//!
//! Destination for committed topic values.
//!
//! The consensus core only announces commits; durability is the job of a
//! `CommitStore`. `MemoryStore` keeps records in process memory and can
//! export them to a JSON snapshot so committed results survive a restart.
//! In-flight votes are never persisted.

pub mod snapshot;

use std::{collections::HashMap, path::Path};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::info;

use concord_common::error::Result;

use crate::runtime::consensus_driver::CommitEvent;
use snapshot::Snapshot;

/// Stored result of a committed topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub topic: String,
    pub value: Value,
    pub committed_at: DateTime<Utc>,
    /// Starts at 1; bumped each time the topic commits again after being reclaimed.
    pub revision: u64,
}

#[async_trait]
pub trait CommitStore: Send + Sync {
    /// Persists a commit. Calls for the same topic are expected to be serialized.
    async fn apply(&self, event: CommitEvent) -> Result<CommitRecord>;

    async fn get(&self, topic: &str) -> Result<Option<CommitRecord>>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, CommitRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot<P: AsRef<Path>>(path: P) -> Result<Self> {
        let snapshot = snapshot::load_snapshot(path.as_ref())?;
        info!("📂 Restored {} committed topics from {}", snapshot.records.len(), path.as_ref().display());
        let records = snapshot
            .records
            .into_iter()
            .map(|record| (record.topic.clone(), record))
            .collect();
        Ok(Self {
            records: RwLock::new(records),
        })
    }

    pub async fn export<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut records: Vec<CommitRecord> = self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.topic.cmp(&b.topic));
        snapshot::save_snapshot(path.as_ref(), &Snapshot { records })?;
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CommitStore for MemoryStore {
    async fn apply(&self, event: CommitEvent) -> Result<CommitRecord> {
        // Read and write happen under separate locks; per-topic callers
        // must not overlap or revisions get lost.
        let revision = self
            .records
            .read()
            .await
            .get(&event.topic)
            .map_or(1, |previous| previous.revision + 1);

        let record = CommitRecord {
            topic: event.topic,
            value: event.value,
            committed_at: event.committed_at,
            revision,
        };
        self.records
            .write()
            .await
            .insert(record.topic.clone(), record.clone());

        info!("💾 Stored [{}] revision {}", record.topic, record.revision);
        Ok(record)
    }

    async fn get(&self, topic: &str) -> Result<Option<CommitRecord>> {
        Ok(self.records.read().await.get(topic).cloned())
    }
}

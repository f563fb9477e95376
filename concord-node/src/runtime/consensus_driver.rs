use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use concord_common::{
    env::ClusterMessage,
    error::Result,
    utils::MemberId,
};
use concord_consensus::{ClusterMembership, CommitCallback, QuorumVoteAggregator, VoteOutcome};

use crate::config::NodeConfig;

/// Emitted by the aggregator's commit callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitEvent {
    pub topic: String,
    pub value: Value,
    pub committed_at: DateTime<Utc>,
}

/// Feeds inbound cluster messages into the vote aggregator.
pub struct ConsensusDriver {
    local_id: MemberId,
    aggregator: Arc<Mutex<QuorumVoteAggregator<Value>>>,
}

impl ConsensusDriver {
    /// Builds the aggregator from `config` and returns the stream of commits it will announce.
    pub fn new(config: &NodeConfig) -> Result<(Self, mpsc::UnboundedReceiver<CommitEvent>)> {
        let (commit_tx, commit_rx) = mpsc::unbounded_channel();

        let notifier: CommitCallback<Value> = Arc::new(move |topic: &str, value: &Value| {
            let event = CommitEvent {
                topic: topic.to_string(),
                value: value.clone(),
                committed_at: Utc::now(),
            };
            if commit_tx.send(event).is_err() {
                warn!("⚠️ Commit pipeline closed; commit of [{}] not persisted", topic);
            }
        });

        let membership = ClusterMembership::with_members(config.quorum.clone(), config.members())?;
        let aggregator = QuorumVoteAggregator::new(membership, config.reduce.reducer(), notifier);

        let driver = Self {
            local_id: config.node_id.clone(),
            aggregator: Arc::new(Mutex::new(aggregator)),
        };
        Ok((driver, commit_rx))
    }

    /// Decodes one JSON message and applies it.
    pub async fn handle_line(&self, line: &str) -> Result<Option<VoteOutcome>> {
        let message = ClusterMessage::from_json(line)?;
        self.handle_message(message).await
    }

    /// Applies a message. Only votes produce an outcome.
    pub async fn handle_message(&self, message: ClusterMessage) -> Result<Option<VoteOutcome>> {
        let mut aggregator = self.aggregator.lock().await;

        match message {
            ClusterMessage::Vote { topic, member, value } => {
                if !aggregator.members().contains(&member) {
                    debug!("Vote on [{}] from [{}], which is not in the membership view", topic, member);
                }
                let outcome = aggregator.vote(member, &topic, value)?;
                Ok(Some(outcome))
            }
            ClusterMessage::Join { member } => {
                aggregator.add_member(member);
                Ok(None)
            }
            ClusterMessage::Leave { member } => {
                if member == self.local_id {
                    warn!("⚠️ Ignoring leave for the local node [{}]", member);
                } else {
                    aggregator.del_member(&member);
                }
                Ok(None)
            }
        }
    }

    pub async fn expire_stale(&self, ttl: Duration) -> Vec<String> {
        let expired = self.aggregator.lock().await.expire_stale(ttl);
        if !expired.is_empty() {
            info!("⌛ Expired {} stale topics", expired.len());
        }
        expired
    }

    pub async fn pending_topics(&self) -> usize {
        self.aggregator.lock().await.pending_topics()
    }

    pub async fn member_count(&self) -> usize {
        self.aggregator.lock().await.members().len()
    }
}

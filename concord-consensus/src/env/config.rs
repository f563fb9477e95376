use std::time::Duration;

use serde::{Deserialize, Serialize};

use concord_common::error::{ConcordError, Result};

use crate::consensus::DuplicateVotePolicy;

/// Quorum settings handed to the membership view at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuorumConfig {
    /// Number of recorded votes a topic needs before it commits.
    pub limit: usize,
    pub duplicate_votes: DuplicateVotePolicy,
    /// Age after which an unresolved topic may be swept. `None` disables expiry.
    pub topic_ttl_secs: Option<u64>,
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self {
            limit: 2,
            duplicate_votes: DuplicateVotePolicy::Count,
            topic_ttl_secs: None,
        }
    }
}

impl QuorumConfig {
    pub fn with_limit(limit: usize) -> Self {
        Self { limit, ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        validate_limit(self.limit)?;
        if self.topic_ttl_secs == Some(0) {
            return Err(ConcordError::Config("topic_ttl_secs must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn topic_ttl(&self) -> Option<Duration> {
        self.topic_ttl_secs.map(Duration::from_secs)
    }
}

pub(crate) fn validate_limit(limit: usize) -> Result<()> {
    if limit == 0 {
        return Err(ConcordError::Config("quorum limit must be at least 1".into()));
    }
    Ok(())
}

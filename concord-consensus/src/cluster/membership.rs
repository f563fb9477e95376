use std::collections::HashSet;

use tracing::{debug, info};

use concord_common::{error::Result, utils::MemberId};

use crate::{
    consensus::DuplicateVotePolicy,
    env::config::{validate_limit, QuorumConfig},
};

/// Known peers plus the quorum threshold they vote against.
///
/// `len()` is the bound used to reclaim a topic once every known member
/// could have voted.
#[derive(Debug, Clone)]
pub struct ClusterMembership {
    members: HashSet<MemberId>,
    config: QuorumConfig,
}

impl ClusterMembership {
    pub fn new(config: QuorumConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            members: HashSet::new(),
            config,
        })
    }

    /// Seeds the view from a static entry-node list.
    pub fn with_members<I>(config: QuorumConfig, members: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<MemberId>,
    {
        let mut view = Self::new(config)?;
        for member in members {
            view.add_member(member.into());
        }
        Ok(view)
    }

    /// Returns `false` if the member was already known.
    pub fn add_member(&mut self, member: MemberId) -> bool {
        let added = self.members.insert(member.clone());
        if added {
            info!("➕ Member joined: [{}] (members: {})", member, self.members.len());
        } else {
            debug!("Member [{}] already known", member);
        }
        added
    }

    /// Returns `false` if the member was not known.
    pub fn del_member(&mut self, member: &MemberId) -> bool {
        let removed = self.members.remove(member);
        if removed {
            info!("➖ Member left: [{}] (members: {})", member, self.members.len());
        }
        removed
    }

    pub fn contains(&self, member: &MemberId) -> bool {
        self.members.contains(member)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.config.limit
    }

    pub fn set_limit(&mut self, limit: usize) -> Result<()> {
        validate_limit(limit)?;
        info!("🎚️ Quorum limit changed: {} -> {}", self.config.limit, limit);
        self.config.limit = limit;
        Ok(())
    }

    pub fn duplicate_votes(&self) -> DuplicateVotePolicy {
        self.config.duplicate_votes
    }
}

use std::time::{Duration, Instant};

use concord_common::utils::MemberId;

/// Vote bookkeeping for a single topic.
#[derive(Debug, Clone)]
pub struct VoteTopic<V> {
    /// Seeded by the first vote, then folded through the reducer until commit.
    pub aggregated_value: V,
    /// Every recorded vote in arrival order.
    pub voted_members: Vec<MemberId>,
    /// Set once, never cleared.
    pub committed: bool,
    opened_at: Instant,
}

impl<V> VoteTopic<V> {
    pub(crate) fn open(value: V) -> Self {
        Self {
            aggregated_value: value,
            voted_members: Vec::new(),
            committed: false,
            opened_at: Instant::now(),
        }
    }

    pub fn votes(&self) -> usize {
        self.voted_members.len()
    }

    pub fn has_voted(&self, member: &MemberId) -> bool {
        self.voted_members.contains(member)
    }

    pub fn age(&self) -> Duration {
        self.opened_at.elapsed()
    }
}

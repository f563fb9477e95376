use serde::{Deserialize, Serialize};

/// How repeated votes from the same member on one topic are treated.
///
/// `Count` trusts the transport to deliver each vote once: a member voting
/// twice is recorded twice, counting toward both quorum and the cleanup
/// bound. `Ignore` drops a repeat vote entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateVotePolicy {
    #[default]
    Count,
    Ignore,
}

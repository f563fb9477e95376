//! consensus.rs
//!
//! Leaderless quorum voting.
//!
//! Peers vote on topics; each vote is merged into the topic's aggregated
//! value with a caller-supplied reducer, and the topic commits once the
//! number of recorded votes reaches the quorum limit. The commit callback
//! fires exactly once per topic. Topics are reclaimed once the vote count
//! reaches the size of the known membership, committed or not.

mod aggregator;
mod policy;
mod topic;

pub use aggregator::{CommitCallback, QuorumVoteAggregator, Reducer, VoteOutcome};
pub use policy::DuplicateVotePolicy;
pub use topic::VoteTopic;

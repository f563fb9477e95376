pub mod cluster;
pub mod consensus;
pub mod env;
pub mod jobs;

pub use cluster::membership::ClusterMembership;
pub use consensus::{
    CommitCallback, DuplicateVotePolicy, QuorumVoteAggregator, Reducer, VoteOutcome, VoteTopic,
};
pub use env::config::QuorumConfig;
pub use jobs::keyed_queue::{KeyedSerialQueue, TaskHandle};

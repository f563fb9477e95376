pub mod builder;
pub mod committer;
pub mod consensus_driver;

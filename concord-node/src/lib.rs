pub mod cli;
pub mod config;
pub mod reduce;
pub mod runtime;
pub mod setup;
pub mod storage;

pub use config::NodeConfig;
pub use runtime::builder::{build_runtime, NodeRuntime};

pub mod message;

pub use message::ClusterMessage;

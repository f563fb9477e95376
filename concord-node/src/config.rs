use std::{collections::BTreeSet, fs, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};
use tracing::warn;

use concord_common::{
    error::{ConcordError, Result},
    utils::MemberId,
};
use concord_consensus::QuorumConfig;

use crate::reduce::ReduceStrategy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub node_id: MemberId,
    /// Static entry-node list seeding the membership view.
    #[serde(default)]
    pub entry_nodes: Vec<MemberId>,
    #[serde(default)]
    pub quorum: QuorumConfig,
    #[serde(default)]
    pub reduce: ReduceStrategy,
    /// Where committed results are exported on shutdown and restored on start.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

impl NodeConfig {
    pub fn new(node_id: impl Into<MemberId>) -> Self {
        Self {
            node_id: node_id.into(),
            entry_nodes: Vec::new(),
            quorum: QuorumConfig::default(),
            reduce: ReduceStrategy::default(),
            snapshot_path: None,
        }
    }

    /// Entry nodes plus the local node, deduplicated.
    pub fn members(&self) -> BTreeSet<MemberId> {
        self.entry_nodes
            .iter()
            .cloned()
            .chain(std::iter::once(self.node_id.clone()))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_id.is_empty() {
            return Err(ConcordError::Config("node_id must not be empty".into()));
        }
        if self.entry_nodes.iter().any(MemberId::is_empty) {
            return Err(ConcordError::Config("entry_nodes contains an empty id".into()));
        }
        self.quorum.validate()?;

        let members = self.members().len();
        if self.quorum.limit > members {
            warn!(
                "⚠️ Quorum limit {} exceeds the {} configured members; topics will be reclaimed before they can commit",
                self.quorum.limit, members
            );
        }
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let config = serde_json::from_str::<NodeConfig>(&data)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_consensus::DuplicateVotePolicy;

    #[test]
    fn test_members_include_local_node_once() {
        let mut config = NodeConfig::new("node-a");
        config.entry_nodes = vec!["node-a".into(), "node-b".into(), "node-c".into()];

        let members = config.members();
        assert_eq!(members.len(), 3);
        assert!(members.contains(&MemberId::from("node-a")));
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let config: NodeConfig = serde_json::from_str(r#"{"node_id": "solo"}"#).unwrap();
        assert_eq!(config, NodeConfig::new("solo"));
        assert_eq!(config.reduce, ReduceStrategy::Sum);
        assert_eq!(config.quorum.duplicate_votes, DuplicateVotePolicy::Count);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(NodeConfig::new("").validate().is_err());

        let mut config = NodeConfig::new("node-a");
        config.quorum.limit = 0;
        assert!(matches!(config.validate(), Err(ConcordError::Config(_))));

        let mut config = NodeConfig::new("node-a");
        config.entry_nodes = vec![MemberId::default()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = NodeConfig::new("node-a");
        config.entry_nodes = vec!["node-b".into()];
        config.reduce = ReduceStrategy::Max;
        config.quorum.topic_ttl_secs = Some(30);
        config.save_to_file(&path).unwrap();

        assert_eq!(NodeConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"node_id": "a", "quorum": {"limit": 0}}"#).unwrap();

        assert!(NodeConfig::load_from_file(&path).is_err());
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::MemberId;

/// Peer-to-peer message understood by the consensus core.
///
/// Encoded as internally tagged JSON, e.g.
/// `{"type":"vote","topic":"orders/42","member":"node-a","value":5}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClusterMessage<V = Value> {
    /// A member's vote for `topic`.
    Vote {
        topic: String,
        member: MemberId,
        value: V,
    },
    /// A peer became known through discovery or bootstrap.
    Join { member: MemberId },
    /// A peer left the cluster view.
    Leave { member: MemberId },
}

impl<V> ClusterMessage<V>
where
    V: Serialize + for<'de> Deserialize<'de>,
{
    pub fn vote(member: impl Into<MemberId>, topic: impl Into<String>, value: V) -> Self {
        ClusterMessage::Vote {
            topic: topic.into(),
            member: member.into(),
            value,
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_vote_shape() {
        let raw = r#"{"type":"vote","topic":"t","member":"A","value":5}"#;
        let msg: ClusterMessage = ClusterMessage::from_json(raw).unwrap();

        assert_eq!(msg, ClusterMessage::vote("A", "t", json!(5)));
    }

    #[test]
    fn test_decode_membership_messages() {
        let join: ClusterMessage = ClusterMessage::from_json(r#"{"type":"join","member":"C"}"#).unwrap();
        let leave: ClusterMessage = ClusterMessage::from_json(r#"{"type":"leave","member":"C"}"#).unwrap();

        assert_eq!(join, ClusterMessage::Join { member: "C".into() });
        assert_eq!(leave, ClusterMessage::Leave { member: "C".into() });
    }

    #[test]
    fn test_encode_carries_type_tag() {
        let msg: ClusterMessage<u64> = ClusterMessage::vote("B", "orders/1", 7);
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();

        assert_eq!(value["type"], "vote");
        assert_eq!(value["member"], "B");
        assert_eq!(value["value"], 7);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let res: serde_json::Result<ClusterMessage> =
            ClusterMessage::from_json(r#"{"type":"subscribe","topic":"t"}"#);
        assert!(res.is_err());
    }
}

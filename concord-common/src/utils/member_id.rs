use serde::{Deserialize, Serialize};

/// Identity of a peer taking part in cluster voting.
///
/// `MemberId` is an opaque wrapper around `String`, designed to:
/// - Keep member identities apart from topic keys in APIs
/// - Serve as a `HashSet` key for the membership view
/// - Format directly into log lines
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub String);

impl MemberId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MemberId {
    /// Example:
    /// ```rust
    /// use concord_common::MemberId;
    /// let id: MemberId = "node-a".into();
    /// assert_eq!(id.as_str(), "node-a");
    /// ```
    fn from(s: &str) -> Self {
        MemberId(s.to_string())
    }
}

impl From<String> for MemberId {
    fn from(s: String) -> Self {
        MemberId(s)
    }
}

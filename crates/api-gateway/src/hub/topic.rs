//! Push topics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A push channel category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    /// New blocks; keeps a snapshot for onboarding
    Block,
    /// New peers; no snapshot
    Peer,
}

impl Topic {
    pub const ALL: [Topic; 2] = [Topic::Block, Topic::Peer];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::Block => "block",
            Topic::Peer => "peer",
        }
    }

    /// Whether the latest message is kept and replayed to new subscribers
    pub fn keeps_snapshot(self) -> bool {
        matches!(self, Topic::Block)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown topic: {0}")]
pub struct UnknownTopic(pub String);

impl FromStr for Topic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "block" => Ok(Topic::Block),
            "peer" => Ok(Topic::Peer),
            other => Err(UnknownTopic(other.to_string())),
        }
    }
}

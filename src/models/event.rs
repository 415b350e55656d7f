//! Domain events published to the broker

use serde::{Deserialize, Serialize};

use super::Contest;

/// Event envelope: `{ "type": <variant>, "data": <payload> }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ContestEvent {
    ContestCreated(Contest),
}

impl ContestEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ContestCreated(_) => "ContestCreated",
        }
    }

    /// Wire encoding of the event
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChannelError;

/// Correlates exactly one `Reply` with the `Poll` that asked for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplyAddress(pub Uuid);

impl ReplyAddress {
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ReplyAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Poll,
    Reply,
    StatusUpdate,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Envelope {
    /// Client asks for the current count. Answered by exactly one `Reply`.
    Poll { reply_to: ReplyAddress },
    /// Current count, or [`crate::domain::NOT_STARTED`].
    Reply { in_reply_to: ReplyAddress, count: i64 },
    /// Display text the service should render into its status surface.
    StatusUpdate { text: String },
    #[serde(other)]
    Unknown,
}

const KNOWN_TYPES: [&str; 3] = ["poll", "reply", "status_update"];

impl Envelope {
    pub fn poll() -> (Self, ReplyAddress) {
        let reply_to = ReplyAddress::fresh();
        (Envelope::Poll { reply_to }, reply_to)
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Envelope::Poll { .. } => MessageKind::Poll,
            Envelope::Reply { .. } => MessageKind::Reply,
            Envelope::StatusUpdate { .. } => MessageKind::StatusUpdate,
            Envelope::Unknown => MessageKind::Unknown,
        }
    }

    pub fn reply_to(&self) -> Option<ReplyAddress> {
        match self {
            Envelope::Poll { reply_to } => Some(*reply_to),
            _ => None,
        }
    }

    pub fn encode(&self) -> Result<String, ChannelError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Frames whose `type` is not one this build understands decode to
    /// [`Envelope::Unknown`] regardless of their payload.
    pub fn decode(frame: &str) -> Result<Self, ChannelError> {
        let value: serde_json::Value = serde_json::from_str(frame)?;
        let known = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .is_some_and(|ty| KNOWN_TYPES.contains(&ty));
        if !known {
            return Ok(Envelope::Unknown);
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;

use serde::{Deserialize, Serialize};

use crate::errors::WakeError;
use crate::shared::context::SyncState;

pub const PROTOCOL_VERSION: u32 = 1;

fn default_version() -> u32 {
    PROTOCOL_VERSION
}

/// Closed set of message kinds. Names used by earlier releases are accepted as aliases.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    #[serde(alias = "wake-lock-sync", alias = "wake-lock-initial-sync")]
    Sync,
    #[serde(alias = "pip-closed", alias = "closed")]
    PeerClosed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncMessage {
    #[serde(default = "default_version")]
    pub v: u32,
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<SyncState>,
}

impl SyncMessage {
    pub fn sync(state: SyncState) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            kind: MessageKind::Sync,
            state: Some(state),
        }
    }

    pub fn peer_closed(final_state: Option<SyncState>) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            kind: MessageKind::PeerClosed,
            state: final_state,
        }
    }

    pub fn encode(&self) -> Result<String, WakeError> {
        serde_json::to_string(self).map_err(|e| WakeError::MalformedMessage {
            message: e.to_string(),
        })
    }

    pub fn decode(raw: &str) -> Result<Self, WakeError> {
        let message: SyncMessage =
            serde_json::from_str(raw).map_err(|e| WakeError::MalformedMessage {
                message: e.to_string(),
            })?;

        if message.v != PROTOCOL_VERSION {
            return Err(WakeError::UnsupportedProtocolVersion { version: message.v });
        }
        if message.kind == MessageKind::Sync && message.state.is_none() {
            return Err(WakeError::MalformedMessage {
                message: "sync message without state".to_string(),
            });
        }
        Ok(message)
    }
}

/// A message as delivered by the host channel: the sender's origin, the link it travelled
/// over, and the serialized payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub origin: String,
    pub source: String,
    pub data: String,
}

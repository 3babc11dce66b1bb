use serde::{Deserialize, Serialize};

/// Which side of a main / detached-surface relationship this execution context is.
/// Fixed at construction for the lifetime of the context.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ContextRole {
    Main,
    DetachedChild,
}

impl ContextRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextRole::Main => "main",
            ContextRole::DetachedChild => "detached-child",
        }
    }

    pub fn is_detached(&self) -> bool {
        matches!(self, ContextRole::DetachedChild)
    }
}

/// The three fields exchanged between peers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub is_active: bool,
    pub timer_active: bool,
    pub remaining_seconds: u64,
}

impl SyncState {
    pub fn inactive() -> Self {
        Self::default()
    }
}

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::WakeError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    Screen,
}

pub type RevocationCallback = Box<dyn FnOnce() + Send + 'static>;

/// A held "keep display on" obligation.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Releases the obligation. Releasing an already released or revoked capability is a no-op.
    async fn release(&self) -> Result<(), WakeError>;

    /// Registers the callback invoked at most once if the platform revokes the capability
    /// outside of an explicit `release`. Registering after revocation invokes it immediately.
    fn on_revoked(&self, callback: RevocationCallback);
}

#[async_trait]
pub trait CapabilityAdapter: Send + Sync {
    fn is_supported(&self) -> bool;

    async fn request(&self, kind: CapabilityKind) -> Result<Box<dyn Capability>, WakeError>;
}

#[derive(Default)]
struct SlotState {
    callback: Option<RevocationCallback>,
    revoked: bool,
    released: bool,
}

/// Bookkeeping shared by capability implementations: guarantees the revocation callback
/// fires at most once and never after an explicit release.
#[derive(Default)]
pub struct RevocationSlot {
    state: Mutex<SlotState>,
}

impl RevocationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&self, callback: RevocationCallback) {
        let mut state = self.lock();
        if state.released {
            return;
        }
        if state.revoked {
            drop(state);
            callback();
            return;
        }
        state.callback = Some(callback);
    }

    /// Marks the capability revoked and fires the callback. Returns false if it was already
    /// released or revoked.
    pub fn revoke(&self) -> bool {
        let callback = {
            let mut state = self.lock();
            if state.released || state.revoked {
                return false;
            }
            state.revoked = true;
            state.callback.take()
        };
        if let Some(callback) = callback {
            callback();
        }
        true
    }

    /// Marks the capability released. Returns false if it was already released or revoked.
    pub fn mark_released(&self) -> bool {
        let mut state = self.lock();
        if state.released || state.revoked {
            return false;
        }
        state.released = true;
        state.callback = None;
        true
    }

    pub fn is_held(&self) -> bool {
        let state = self.lock();
        !state.released && !state.revoked
    }
}

/// Adapter for contexts without any keep-awake primitive.
pub struct UnsupportedAdapter {
    platform: String,
}

impl UnsupportedAdapter {
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
        }
    }
}

#[async_trait]
impl CapabilityAdapter for UnsupportedAdapter {
    fn is_supported(&self) -> bool {
        false
    }

    async fn request(&self, _kind: CapabilityKind) -> Result<Box<dyn Capability>, WakeError> {
        Err(WakeError::CapabilityUnavailable {
            platform: self.platform.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_callback(counter: &Arc<AtomicUsize>) -> RevocationCallback {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn revocation_fires_once() {
        let slot = RevocationSlot::new();
        let fired = Arc::new(AtomicUsize::new(0));
        slot.register(counting_callback(&fired));

        assert!(slot.revoke());
        assert!(!slot.revoke());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!slot.is_held());
    }

    #[test]
    fn release_suppresses_revocation() {
        let slot = RevocationSlot::new();
        let fired = Arc::new(AtomicUsize::new(0));
        slot.register(counting_callback(&fired));

        assert!(slot.mark_released());
        assert!(!slot.revoke());
        assert!(!slot.mark_released());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn late_registration_after_revocation_fires_immediately() {
        let slot = RevocationSlot::new();
        assert!(slot.revoke());

        let fired = Arc::new(AtomicUsize::new(0));
        slot.register(counting_callback(&fired));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsupported_adapter_always_fails() {
        let adapter = UnsupportedAdapter::new("test-os");
        assert!(!adapter.is_supported());
        let err = adapter.request(CapabilityKind::Screen).await.err().unwrap();
        assert_eq!(
            err,
            WakeError::CapabilityUnavailable {
                platform: "test-os".into()
            }
        );
    }
}

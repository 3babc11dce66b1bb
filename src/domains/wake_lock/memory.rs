use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::capability::{
    Capability, CapabilityAdapter, CapabilityKind, RevocationCallback, RevocationSlot,
};
use crate::errors::WakeError;

#[derive(Default)]
struct MemoryPlatform {
    supported: AtomicBool,
    deny: AtomicBool,
    request_delay_ms: AtomicU64,
    requests: AtomicUsize,
    releases: AtomicUsize,
    slots: Mutex<Vec<Arc<RevocationSlot>>>,
}

impl MemoryPlatform {
    fn slots(&self) -> std::sync::MutexGuard<'_, Vec<Arc<RevocationSlot>>> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// In-memory keep-awake primitive. Cloned handles share one simulated platform, so two
/// contexts built from the same adapter compete for the same display, as they would in a
/// real host. Used by the detach demo and by tests.
#[derive(Clone)]
pub struct MemoryAdapter {
    platform: Arc<MemoryPlatform>,
}

impl MemoryAdapter {
    pub fn new(supported: bool) -> Self {
        let platform = MemoryPlatform::default();
        platform.supported.store(supported, Ordering::SeqCst);
        Self {
            platform: Arc::new(platform),
        }
    }

    pub fn set_supported(&self, supported: bool) {
        self.platform.supported.store(supported, Ordering::SeqCst);
    }

    /// While set, every request fails as if the user or platform denied it.
    pub fn set_deny(&self, deny: bool) {
        self.platform.deny.store(deny, Ordering::SeqCst);
    }

    pub fn set_request_delay(&self, delay: Duration) {
        self.platform.request_delay_ms.store(
            u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            Ordering::SeqCst,
        );
    }

    pub fn request_count(&self) -> usize {
        self.platform.requests.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.platform.releases.load(Ordering::SeqCst)
    }

    /// Number of granted capabilities that are neither released nor revoked.
    pub fn held_count(&self) -> usize {
        self.platform
            .slots()
            .iter()
            .filter(|slot| slot.is_held())
            .count()
    }

    /// Revokes every held capability, as a platform does when the surface loses visibility.
    pub fn revoke_all(&self) -> usize {
        let held: Vec<Arc<RevocationSlot>> = self
            .platform
            .slots()
            .iter()
            .filter(|slot| slot.is_held())
            .cloned()
            .collect();
        held.iter().filter(|slot| slot.revoke()).count()
    }
}

#[async_trait]
impl CapabilityAdapter for MemoryAdapter {
    fn is_supported(&self) -> bool {
        self.platform.supported.load(Ordering::SeqCst)
    }

    async fn request(&self, _kind: CapabilityKind) -> Result<Box<dyn Capability>, WakeError> {
        self.platform.requests.fetch_add(1, Ordering::SeqCst);

        let delay = self.platform.request_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if !self.is_supported() {
            return Err(WakeError::CapabilityUnavailable {
                platform: "memory".to_string(),
            });
        }
        if self.platform.deny.load(Ordering::SeqCst) {
            return Err(WakeError::denied("NotAllowedError"));
        }

        let slot = Arc::new(RevocationSlot::new());
        self.platform.slots().push(Arc::clone(&slot));
        Ok(Box::new(MemoryCapability {
            slot,
            platform: Arc::clone(&self.platform),
        }))
    }
}

struct MemoryCapability {
    slot: Arc<RevocationSlot>,
    platform: Arc<MemoryPlatform>,
}

#[async_trait]
impl Capability for MemoryCapability {
    async fn release(&self) -> Result<(), WakeError> {
        self.platform.releases.fetch_add(1, Ordering::SeqCst);
        self.slot.mark_released();
        Ok(())
    }

    fn on_revoked(&self, callback: RevocationCallback) {
        self.slot.register(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn grants_and_releases() {
        let adapter = MemoryAdapter::new(true);
        let capability = adapter.request(CapabilityKind::Screen).await.ok().unwrap();
        assert_eq!(adapter.held_count(), 1);

        capability.release().await.unwrap();
        capability.release().await.unwrap();
        assert_eq!(adapter.held_count(), 0);
        assert_eq!(adapter.release_count(), 2);
    }

    #[tokio::test]
    async fn denial_and_unsupported_are_errors() {
        let adapter = MemoryAdapter::new(true);
        adapter.set_deny(true);
        assert!(matches!(
            adapter.request(CapabilityKind::Screen).await,
            Err(WakeError::CapabilityDenied { .. })
        ));

        adapter.set_deny(false);
        adapter.set_supported(false);
        assert!(matches!(
            adapter.request(CapabilityKind::Screen).await,
            Err(WakeError::CapabilityUnavailable { .. })
        ));
        assert_eq!(adapter.request_count(), 2);
        assert_eq!(adapter.held_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_request_delay_saturates() {
        let adapter = MemoryAdapter::new(true);
        // Just past u64::MAX milliseconds; a truncating cast would wrap to 384 ms.
        adapter.set_request_delay(Duration::from_secs(18_446_744_073_709_552));

        let pending = tokio::time::timeout(
            Duration::from_secs(3_600),
            adapter.request(CapabilityKind::Screen),
        )
        .await;
        assert!(pending.is_err());
        assert_eq!(adapter.held_count(), 0);
    }

    #[tokio::test]
    async fn revoke_all_fires_registered_callbacks() {
        let adapter = MemoryAdapter::new(true);
        let capability = adapter.request(CapabilityKind::Screen).await.ok().unwrap();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        capability.on_revoked(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(adapter.revoke_all(), 1);
        assert_eq!(adapter.revoke_all(), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Releasing after revocation is tolerated.
        capability.release().await.unwrap();
    }
}

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, warn};

use super::message::{Envelope, SyncMessage};
use super::origin::AppOrigin;
use crate::errors::WakeError;
use crate::shared::context::{ContextRole, SyncState};

/// A non-owning handle to the other context. Holders must re-check liveness before every use.
pub trait PeerPort: Send + Sync {
    fn label(&self) -> &str;
    fn is_alive(&self) -> bool;
    fn post(&self, data: String) -> Result<(), WakeError>;
}

/// Typed, origin-checked channel between a context and its single direct peer.
pub struct CrossContextMessenger {
    role: ContextRole,
    origin: AppOrigin,
    parent: Option<Arc<dyn PeerPort>>,
    child: Mutex<Option<Arc<dyn PeerPort>>>,
}

impl CrossContextMessenger {
    pub fn for_main(origin: AppOrigin) -> Self {
        Self {
            role: ContextRole::Main,
            origin,
            parent: None,
            child: Mutex::new(None),
        }
    }

    pub fn for_detached_child(origin: AppOrigin, parent: Arc<dyn PeerPort>) -> Self {
        Self {
            role: ContextRole::DetachedChild,
            origin,
            parent: Some(parent),
            child: Mutex::new(None),
        }
    }

    pub fn role(&self) -> ContextRole {
        self.role
    }

    pub fn origin(&self) -> &AppOrigin {
        &self.origin
    }

    fn child_slot(&self) -> MutexGuard<'_, Option<Arc<dyn PeerPort>>> {
        self.child
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers the detached surface. Returns the handle it replaced, if any.
    pub fn attach_child(&self, port: Arc<dyn PeerPort>) -> Option<Arc<dyn PeerPort>> {
        debug!("[messenger] attaching detached peer {}", port.label());
        self.child_slot().replace(port)
    }

    /// Clears the peer handle. Returns whether one was registered.
    pub fn detach_child(&self) -> bool {
        let previous = self.child_slot().take();
        if let Some(port) = &previous {
            debug!("[messenger] detached peer {}", port.label());
        }
        previous.is_some()
    }

    pub fn child_label(&self) -> Option<String> {
        self.child_slot()
            .as_ref()
            .map(|port| port.label().to_string())
    }

    pub fn has_child(&self) -> bool {
        self.child_slot().is_some()
    }

    pub fn has_live_child(&self) -> bool {
        self.child_slot()
            .as_ref()
            .is_some_and(|port| port.is_alive())
    }

    /// For main: a live detached child. For a detached child: a reachable parent.
    pub fn has_live_peer(&self) -> bool {
        match self.role {
            ContextRole::Main => self.has_live_child(),
            ContextRole::DetachedChild => self.parent.as_ref().is_some_and(|port| port.is_alive()),
        }
    }

    /// Sends the state to the single current target. Returns `Ok(false)` when there is none.
    pub fn broadcast_sync(&self, state: SyncState) -> Result<bool, WakeError> {
        let message = SyncMessage::sync(state);
        match self.role {
            ContextRole::DetachedChild => {
                self.send_to_parent(&message)?;
                Ok(true)
            }
            ContextRole::Main => {
                let target = self
                    .child_slot()
                    .as_ref()
                    .filter(|port| port.is_alive())
                    .cloned();
                match target {
                    Some(port) => {
                        post(port.as_ref(), &message)?;
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
        }
    }

    pub fn send_to_child(&self, message: &SyncMessage) -> Result<(), WakeError> {
        let port = self
            .child_slot()
            .clone()
            .ok_or_else(|| WakeError::unreachable("child", "no detached surface attached"))?;
        post(port.as_ref(), message)
    }

    pub fn send_to_parent(&self, message: &SyncMessage) -> Result<(), WakeError> {
        let port = self
            .parent
            .as_ref()
            .ok_or_else(|| WakeError::unreachable("parent", "context has no parent"))?;
        post(port.as_ref(), message)
    }

    /// Tells a surface that was replaced by a newer one to drop its obligation.
    pub fn release_replaced(&self, port: &dyn PeerPort) -> Result<(), WakeError> {
        post(port, &SyncMessage::sync(SyncState::inactive()))
    }

    /// Final message of a detached child: tells the parent it is going away, with its last state.
    pub fn notify_peer_closed(&self, final_state: SyncState) -> Result<(), WakeError> {
        self.send_to_parent(&SyncMessage::peer_closed(Some(final_state)))
    }

    /// Validates origin and decodes an incoming envelope. Mismatched origins are never decoded.
    pub fn receive(&self, envelope: &Envelope) -> Result<SyncMessage, WakeError> {
        if !self.origin.matches(&envelope.origin) {
            warn!(
                "[messenger] dropping message from unexpected origin {:?} (expected {})",
                envelope.origin, self.origin
            );
            return Err(WakeError::OriginMismatch {
                expected: self.origin.to_string(),
                actual: envelope.origin.clone(),
            });
        }
        SyncMessage::decode(&envelope.data)
    }
}

fn post(port: &dyn PeerPort, message: &SyncMessage) -> Result<(), WakeError> {
    if !port.is_alive() {
        return Err(WakeError::unreachable(port.label(), "peer closed"));
    }
    port.post(message.encode()?)
}

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use uuid::Uuid;

use super::message::Envelope;
use super::messenger::PeerPort;
use crate::errors::WakeError;

/// Shared "is the detached surface still open" flag for one main / child link.
#[derive(Debug, Clone, Default)]
pub struct SurfaceHandle {
    closed: Arc<AtomicBool>,
}

impl SurfaceHandle {
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// One direction of an in-process structured-message channel. Every envelope posted through
/// it is stamped with the sender's origin and the link label.
pub struct ChannelPort {
    label: String,
    origin: String,
    tx: mpsc::UnboundedSender<Envelope>,
    surface: SurfaceHandle,
}

impl ChannelPort {
    pub fn new(
        label: impl Into<String>,
        origin: impl Into<String>,
        tx: mpsc::UnboundedSender<Envelope>,
        surface: SurfaceHandle,
    ) -> Self {
        Self {
            label: label.into(),
            origin: origin.into(),
            tx,
            surface,
        }
    }
}

impl PeerPort for ChannelPort {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_alive(&self) -> bool {
        !self.surface.is_closed() && !self.tx.is_closed()
    }

    fn post(&self, data: String) -> Result<(), WakeError> {
        if self.surface.is_closed() {
            return Err(WakeError::unreachable(&self.label, "surface closed"));
        }
        self.tx
            .send(Envelope {
                origin: self.origin.clone(),
                source: self.label.clone(),
                data,
            })
            .map_err(|_| WakeError::unreachable(&self.label, "receiver dropped"))
    }
}

/// One context's half of a link: a port towards the peer and the inbox fed by the peer.
pub struct Endpoint {
    pub port: Arc<ChannelPort>,
    pub inbox: mpsc::UnboundedReceiver<Envelope>,
    pub surface: SurfaceHandle,
}

impl Endpoint {
    pub fn label(&self) -> &str {
        self.port.label()
    }
}

/// Creates a linked pair of endpoints `(main_side, child_side)` sharing one surface handle.
pub fn link(main_origin: &str, child_origin: &str) -> (Endpoint, Endpoint) {
    let label = format!("surface-{}", Uuid::new_v4());
    let surface = SurfaceHandle::default();
    let (to_child_tx, child_inbox) = mpsc::unbounded_channel();
    let (to_main_tx, main_inbox) = mpsc::unbounded_channel();

    let main_side = Endpoint {
        port: Arc::new(ChannelPort::new(
            label.clone(),
            main_origin,
            to_child_tx,
            surface.clone(),
        )),
        inbox: main_inbox,
        surface: surface.clone(),
    };
    let child_side = Endpoint {
        port: Arc::new(ChannelPort::new(label, child_origin, to_main_tx, surface.clone())),
        inbox: child_inbox,
        surface,
    };
    (main_side, child_side)
}

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::errors::WakeError;
use crate::events::WakeEvent;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmittedEvent {
    pub name: String,
    pub payload: serde_json::Value,
}

/// Destination for state and lifecycle notifications raised by a context.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EmittedEvent) -> Result<(), WakeError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: EmittedEvent) -> Result<(), WakeError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<EmittedEvent>,
}

impl BroadcastSink {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EmittedEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, event: EmittedEvent) -> Result<(), WakeError> {
        // No subscribers is not an error; the event is simply dropped.
        let _ = self.sender.send(event);
        Ok(())
    }
}

pub fn emit_event<T: Serialize>(
    sink: &dyn EventSink,
    event: WakeEvent,
    payload: &T,
) -> Result<(), WakeError> {
    let payload = serde_json::to_value(payload).map_err(|e| WakeError::InvalidInput {
        field: event.as_str().to_string(),
        message: e.to_string(),
    })?;
    sink.emit(EmittedEvent {
        name: event.as_str().to_string(),
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_sink_delivers_to_subscribers() {
        let sink = BroadcastSink::new();
        let mut rx = sink.subscribe();

        emit_event(&sink, WakeEvent::PeerClosed, &serde_json::json!({ "final": true })).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.name, "wakelink:peer-closed");
        assert_eq!(received.payload["final"], true);
    }

    #[test]
    fn emitting_without_subscribers_is_ok() {
        let sink = BroadcastSink::new();
        assert!(emit_event(&sink, WakeEvent::StateChanged, &1u8).is_ok());
        assert!(emit_event(&NullSink, WakeEvent::StateChanged, &1u8).is_ok());
    }
}

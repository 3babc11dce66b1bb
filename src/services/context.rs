use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use log::{debug, info};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::presentation::PresentationAdapter;
use crate::domains::messaging::{CrossContextMessenger, Endpoint, Envelope, PeerPort};
use crate::domains::wake_lock::{CapabilityAdapter, CoreOptions, WakeLockCore, WakeSnapshot};
use crate::errors::WakeError;
use crate::infrastructure::config::WakeConfig;
use crate::infrastructure::events::{BroadcastSink, EmittedEvent};
use crate::shared::context::ContextRole;

/// One execution context: the state machine plus the background tasks feeding it.
pub struct WakeLockContext {
    core: Arc<WakeLockCore>,
    events: Arc<BroadcastSink>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl WakeLockContext {
    /// Context for the main view. Starts the peer liveness watchdog.
    pub async fn main(
        config: &WakeConfig,
        adapter: Arc<dyn CapabilityAdapter>,
    ) -> Result<Arc<Self>, WakeError> {
        config.validate()?;
        let messenger = CrossContextMessenger::for_main(config.app_origin()?);
        let context = Self::build(config, adapter, messenger).await;

        let watchdog = tokio::spawn(watchdog_loop(
            Arc::downgrade(&context.core),
            config.peer_watch_interval(),
        ));
        context.track(watchdog);
        Ok(context)
    }

    /// Context running inside a detached surface, talking to its parent through `endpoint`.
    pub async fn detached_child(
        config: &WakeConfig,
        adapter: Arc<dyn CapabilityAdapter>,
        endpoint: Endpoint,
    ) -> Result<Arc<Self>, WakeError> {
        config.validate()?;
        let Endpoint { port, inbox, .. } = endpoint;
        let label = port.label().to_string();
        let messenger = CrossContextMessenger::for_detached_child(config.app_origin()?, port);
        let context = Self::build(config, adapter, messenger).await;

        let pump = tokio::spawn(message_pump(Arc::downgrade(&context.core), inbox, label));
        context.track(pump);
        Ok(context)
    }

    async fn build(
        config: &WakeConfig,
        adapter: Arc<dyn CapabilityAdapter>,
        messenger: CrossContextMessenger,
    ) -> Arc<Self> {
        let events = Arc::new(BroadcastSink::new());
        let core = WakeLockCore::new(
            adapter,
            messenger,
            events.clone(),
            CoreOptions {
                tick_interval: config.tick_interval(),
                force_unsupported: config.force_unsupported,
            },
        );
        core.initialize().await;
        Arc::new(Self {
            core,
            events,
            tasks: Mutex::new(Vec::new()),
        })
    }

    fn track(&self, task: JoinHandle<()>) {
        let mut tasks = self
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        tasks.retain(|task| !task.is_finished());
        tasks.push(task);
    }

    pub fn core(&self) -> &Arc<WakeLockCore> {
        &self.core
    }

    pub fn role(&self) -> ContextRole {
        self.core.role()
    }

    pub async fn snapshot(&self) -> WakeSnapshot {
        self.core.snapshot().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EmittedEvent> {
        self.events.subscribe()
    }

    pub fn presentation(&self) -> PresentationAdapter {
        PresentationAdapter::new(Arc::clone(&self.core))
    }

    /// Main side: hands the obligation to a newly opened detached surface and starts
    /// listening to it. Returns false when the surface could not take over.
    pub async fn hand_off(&self, endpoint: Endpoint) -> bool {
        let Endpoint { port, inbox, .. } = endpoint;
        let label = port.label().to_string();
        if !self.core.hand_off(port).await {
            return false;
        }
        let pump = tokio::spawn(message_pump(Arc::downgrade(&self.core), inbox, label));
        self.track(pump);
        true
    }

    /// Stops background tasks and tears the core down.
    pub async fn shutdown(&self) {
        self.core.shutdown().await;
        self.abort_tasks();
        info!("[wake-lock] context {} shut down", self.core.id());
    }

    /// Stops background tasks without notifying the peer.
    pub(crate) fn abort_tasks(&self) {
        let tasks: Vec<JoinHandle<()>> = self
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .collect();
        for task in tasks {
            task.abort();
        }
    }
}

impl Drop for WakeLockContext {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

/// Delivers envelopes from the peer until the channel closes. A closed channel means the peer
/// context is gone.
async fn message_pump(
    core: Weak<WakeLockCore>,
    mut inbox: tokio::sync::mpsc::UnboundedReceiver<Envelope>,
    label: String,
) {
    while let Some(envelope) = inbox.recv().await {
        let Some(core) = core.upgrade() else {
            return;
        };
        core.handle_envelope(&envelope).await;
    }

    debug!("[messenger] channel {label} closed");
    if let Some(core) = core.upgrade() {
        if core.role() == ContextRole::Main {
            core.handle_peer_gone(&label).await;
        }
    }
}

async fn watchdog_loop(core: Weak<WakeLockCore>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        let Some(core) = core.upgrade() else {
            return;
        };
        if let Some(outcome) = core.check_peer_liveness().await {
            info!("[wake-lock] watchdog recovered from closed peer: {outcome:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::messaging::link;
    use crate::domains::wake_lock::MemoryAdapter;
    use crate::events::WakeEvent;

    fn config() -> WakeConfig {
        WakeConfig::default()
    }

    #[tokio::test]
    async fn main_context_is_initialised() {
        let context = WakeLockContext::main(&config(), Arc::new(MemoryAdapter::new(true)))
            .await
            .unwrap();

        let snapshot = context.snapshot().await;
        assert_eq!(snapshot.role, ContextRole::Main);
        assert!(!snapshot.is_loading);
        assert!(snapshot.is_supported);
    }

    #[tokio::test]
    async fn invalid_origin_is_a_config_error() {
        let config = WakeConfig {
            origin: "not an origin".into(),
            ..WakeConfig::default()
        };
        let result = WakeLockContext::main(&config, Arc::new(MemoryAdapter::new(true))).await;
        assert!(matches!(result, Err(WakeError::ConfigError { .. })));
    }

    #[tokio::test]
    async fn zero_intervals_are_rejected_before_any_task_starts() {
        let ticking = WakeConfig {
            tick_interval_ms: 0,
            ..WakeConfig::default()
        };
        let result = WakeLockContext::main(&ticking, Arc::new(MemoryAdapter::new(true))).await;
        assert!(matches!(result, Err(WakeError::ConfigError { .. })));

        let watching = WakeConfig {
            peer_watch_interval_ms: 0,
            ..WakeConfig::default()
        };
        let result = WakeLockContext::main(&watching, Arc::new(MemoryAdapter::new(true))).await;
        assert!(matches!(result, Err(WakeError::ConfigError { .. })));

        let origin = ticking.origin.clone();
        let (_main_side, child_side) = link(&origin, &origin);
        let result =
            WakeLockContext::detached_child(&ticking, Arc::new(MemoryAdapter::new(true)), child_side)
                .await;
        assert!(matches!(result, Err(WakeError::ConfigError { .. })));
    }

    #[tokio::test]
    async fn subscribers_receive_state_changes() {
        let context = WakeLockContext::main(&config(), Arc::new(MemoryAdapter::new(true)))
            .await
            .unwrap();
        let mut events = context.subscribe();

        assert!(context.core().acquire().await);

        let event = events.recv().await.unwrap();
        assert_eq!(event.name, WakeEvent::StateChanged.as_str());
        assert_eq!(event.payload["isActive"], true);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_child_triggers_recovery_through_pump() {
        let config = config();
        let adapter = MemoryAdapter::new(true);
        let main = WakeLockContext::main(&config, Arc::new(adapter.clone()))
            .await
            .unwrap();
        assert!(main.core().acquire().await);

        let origin = config.origin.clone();
        let (main_side, child_side) = link(&origin, &origin);
        let child = WakeLockContext::detached_child(&config, Arc::new(adapter.clone()), child_side)
            .await
            .unwrap();
        assert!(main.hand_off(main_side).await);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(child.snapshot().await.is_active);

        child.shutdown().await;
        drop(child);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let snapshot = main.snapshot().await;
        assert!(snapshot.is_active);
        assert!(!snapshot.has_live_peer);
        assert_eq!(adapter.held_count(), 1);
    }
}

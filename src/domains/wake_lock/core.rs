use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::capability::{Capability, CapabilityAdapter, CapabilityKind};
use super::timer::{CountdownTimer, TickFlow};
use super::types::{TimerState, WakeLockSession, WakeSnapshot};
use crate::domains::messaging::CrossContextMessenger;
use crate::errors::WakeError;
use crate::events::WakeEvent;
use crate::infrastructure::events::{EventSink, emit_event};
use crate::shared::context::{ContextRole, SyncState};

#[derive(Debug, Clone)]
pub struct CoreOptions {
    pub tick_interval: Duration,
    pub force_unsupported: bool,
}

impl Default for CoreOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            force_unsupported: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReleaseOutcome {
    Released,
    Busy,
    Passive,
}

pub(crate) struct HeldCapability {
    pub(crate) lease: u64,
    pub(crate) handle: Box<dyn Capability>,
}

pub(crate) struct CoreState {
    pub(crate) session: WakeLockSession,
    pub(crate) timer: TimerState,
    pub(crate) is_loading: bool,
    pub(crate) capability: Option<HeldCapability>,
    pub(crate) next_lease: u64,
    pub(crate) countdown: CountdownTimer,
    pub(crate) last_emitted: Option<WakeSnapshot>,
}

impl CoreState {
    /// Stops the countdown and zeroes the timer fields.
    pub(crate) fn clear_timer(&mut self) {
        self.countdown.stop();
        self.timer.reset();
    }

    pub(crate) fn sync_state(&self) -> SyncState {
        SyncState {
            is_active: self.session.is_active,
            timer_active: self.timer.timer_active,
            remaining_seconds: self.timer.remaining_seconds,
        }
    }
}

/// Releases the in-flight flag when an acquire/release critical section ends.
pub(crate) struct OperationGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RevokedPayload {
    had_timer: bool,
    deactivated: bool,
}

/// Owner of activation state, timer state and context role for one execution context.
pub struct WakeLockCore {
    pub(crate) id: Uuid,
    pub(crate) role: ContextRole,
    pub(crate) weak_self: Weak<WakeLockCore>,
    adapter: Arc<dyn CapabilityAdapter>,
    pub(crate) messenger: CrossContextMessenger,
    events: Arc<dyn EventSink>,
    force_unsupported: bool,
    tick_interval: Duration,
    in_flight: AtomicBool,
    pub(crate) state: Mutex<CoreState>,
}

impl WakeLockCore {
    pub fn new(
        adapter: Arc<dyn CapabilityAdapter>,
        messenger: CrossContextMessenger,
        events: Arc<dyn EventSink>,
        options: CoreOptions,
    ) -> Arc<Self> {
        let role = messenger.role();
        Arc::new_cyclic(|weak_self| Self {
            id: Uuid::new_v4(),
            role,
            weak_self: weak_self.clone(),
            adapter,
            messenger,
            events,
            force_unsupported: options.force_unsupported,
            tick_interval: options.tick_interval,
            in_flight: AtomicBool::new(false),
            state: Mutex::new(CoreState {
                session: WakeLockSession::default(),
                timer: TimerState::default(),
                is_loading: true,
                capability: None,
                next_lease: 0,
                countdown: CountdownTimer::new(options.tick_interval),
                last_emitted: None,
            }),
        })
    }

    /// Probes capability support and leaves the loading state.
    pub async fn initialize(&self) {
        {
            let mut guard = self.state.lock().await;
            guard.session.is_supported = !self.force_unsupported && self.adapter.is_supported();
            guard.is_loading = false;
            info!(
                "[wake-lock] context {} initialised as {} (supported={})",
                self.id,
                self.role.as_str(),
                guard.session.is_supported
            );
        }
        self.emit_state_if_changed().await;
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn role(&self) -> ContextRole {
        self.role
    }

    pub fn messenger(&self) -> &CrossContextMessenger {
        &self.messenger
    }

    pub fn has_live_peer(&self) -> bool {
        self.messenger.has_live_peer()
    }

    /// True while this is the main context and a live detached child owns the obligation.
    pub fn is_main_with_live_peer(&self) -> bool {
        self.role == ContextRole::Main && self.messenger.has_live_child()
    }

    pub async fn snapshot(&self) -> WakeSnapshot {
        let guard = self.state.lock().await;
        self.snapshot_locked(&guard)
    }

    pub async fn sync_state(&self) -> SyncState {
        self.state.lock().await.sync_state()
    }

    pub(crate) fn snapshot_locked(&self, state: &CoreState) -> WakeSnapshot {
        WakeSnapshot {
            role: self.role,
            is_active: state.session.is_active,
            is_loading: state.is_loading,
            is_supported: state.session.is_supported,
            timer_active: state.timer.timer_active,
            duration_minutes: state.timer.duration_minutes,
            remaining_seconds: state.timer.remaining_seconds,
            has_live_peer: self.messenger.has_live_peer(),
        }
    }

    pub(crate) fn begin_operation(&self, operation: &str) -> Option<OperationGuard<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(
                "[wake-lock] {}",
                WakeError::ConcurrentOperation {
                    operation: operation.to_string()
                }
            );
            return None;
        }
        Some(OperationGuard {
            flag: &self.in_flight,
        })
    }

    pub async fn acquire(&self) -> bool {
        let Some(_operation) = self.begin_operation("acquire") else {
            return false;
        };
        self.acquire_guarded().await
    }

    /// Body of `acquire`; the caller holds the operation guard.
    pub(crate) async fn acquire_guarded(&self) -> bool {
        if self.is_main_with_live_peer() {
            debug!("[wake-lock] acquire ignored: main context mirrors a live detached peer");
            return false;
        }

        if !self.state.lock().await.session.is_supported {
            debug!(
                "[wake-lock] acquire rejected: {}",
                WakeError::CapabilityUnavailable {
                    platform: std::env::consts::OS.to_string()
                }
            );
            return false;
        }

        let capability = match self.adapter.request(CapabilityKind::Screen).await {
            Ok(capability) => capability,
            Err(err) => {
                warn!("[wake-lock] failed to acquire keep-awake capability: {err}");
                self.emit(WakeEvent::AcquireFailed, &err);
                return false;
            }
        };

        let stale = {
            let mut guard = self.state.lock().await;
            guard.next_lease += 1;
            let lease = guard.next_lease;
            guard.session.is_active = true;
            let weak = self.weak_self.clone();
            capability.on_revoked(Box::new(move || schedule_revocation(weak, lease)));
            guard.capability.replace(HeldCapability {
                lease,
                handle: capability,
            })
        };
        if let Some(stale) = stale {
            debug!("[wake-lock] replacing capability lease {}", stale.lease);
            if let Err(err) = stale.handle.release().await {
                warn!("[wake-lock] failed to release replaced capability: {err}");
            }
        }

        info!("[wake-lock] display kept awake ({})", self.role.as_str());
        if self.role == ContextRole::DetachedChild {
            self.broadcast().await;
        }
        self.emit_state_if_changed().await;
        true
    }

    pub async fn release(&self) {
        let _ = self.release_with_outcome().await;
    }

    pub(crate) async fn release_with_outcome(&self) -> ReleaseOutcome {
        let Some(_operation) = self.begin_operation("release") else {
            return ReleaseOutcome::Busy;
        };
        if self.is_main_with_live_peer() {
            debug!("[wake-lock] release ignored: main context mirrors a live detached peer");
            return ReleaseOutcome::Passive;
        }

        let held = self.state.lock().await.capability.take();
        if let Some(held) = held {
            if let Err(err) = held.handle.release().await {
                warn!("[wake-lock] failed to release keep-awake capability: {err}");
            }
        }

        {
            let mut guard = self.state.lock().await;
            guard.session.is_active = false;
            guard.clear_timer();
        }
        info!("[wake-lock] display allowed to sleep ({})", self.role.as_str());

        self.broadcast().await;
        self.emit_state_if_changed().await;
        ReleaseOutcome::Released
    }

    pub async fn toggle(&self) {
        let is_active = self.state.lock().await.session.is_active;
        if is_active {
            self.release().await;
        } else {
            self.acquire().await;
        }
    }

    /// Starts a countdown of `minutes`, acquiring first if needed.
    pub async fn start_timer(&self, minutes: i64) -> bool {
        if minutes <= 0 {
            debug!("[wake-lock] start_timer rejected: minutes must be positive, got {minutes}");
            return false;
        }
        let Ok(minutes) = u32::try_from(minutes) else {
            warn!("[wake-lock] start_timer rejected: {minutes} minutes is out of range");
            return false;
        };
        if self.is_main_with_live_peer() {
            debug!("[wake-lock] start_timer ignored: main context mirrors a live detached peer");
            return false;
        }

        let is_active = self.state.lock().await.session.is_active;
        if !is_active && !self.acquire().await {
            return false;
        }

        {
            let mut guard = self.state.lock().await;
            if !guard.session.is_active {
                debug!("[wake-lock] start_timer aborted: session was released meanwhile");
                return false;
            }
            guard.timer.start(minutes);
            self.start_countdown_locked(&mut guard);
        }
        info!("[wake-lock] timer started for {minutes} minute(s)");

        self.broadcast().await;
        self.emit_state_if_changed().await;
        true
    }

    pub async fn stop_timer(&self) {
        if self.is_main_with_live_peer() {
            debug!("[wake-lock] stop_timer ignored: main context mirrors a live detached peer");
            return;
        }
        self.state.lock().await.clear_timer();
        self.broadcast().await;
        self.emit_state_if_changed().await;
    }

    pub(crate) fn start_countdown_locked(&self, state: &mut CoreState) {
        let weak = self.weak_self.clone();
        state.countdown.start(move |generation| {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(core) => core.on_tick(generation).await,
                    None => TickFlow::Stop,
                }
            }
        });
    }

    async fn on_tick(&self, generation: u64) -> TickFlow {
        let expired = {
            let mut guard = self.state.lock().await;
            if !guard.countdown.is_current(generation) || !guard.timer.timer_active {
                return TickFlow::Stop;
            }
            let expired = guard.timer.tick();
            if expired {
                // This tick task finishes on its own; release must not abort it mid-flight.
                guard.countdown.detach();
            }
            expired
        };

        if expired {
            self.expire().await;
            return TickFlow::Stop;
        }

        if self.role == ContextRole::DetachedChild {
            self.broadcast().await;
        }
        self.emit_state_if_changed().await;
        TickFlow::Continue
    }

    /// Timer ran out: release exactly as a user-initiated release would.
    async fn expire(&self) {
        info!("[wake-lock] timer expired, releasing");
        self.emit(WakeEvent::TimerExpired, &self.sync_state().await);
        loop {
            match self.release_with_outcome().await {
                ReleaseOutcome::Released => break,
                ReleaseOutcome::Passive => {
                    self.state.lock().await.clear_timer();
                    self.emit_state_if_changed().await;
                    break;
                }
                ReleaseOutcome::Busy => {
                    debug!("[wake-lock] expiry release deferred: operation in flight");
                    tokio::time::sleep(self.tick_interval).await;
                    let guard = self.state.lock().await;
                    if guard.countdown.is_running() || !guard.timer.timer_active {
                        debug!("[wake-lock] expiry superseded by a newer timer state");
                        break;
                    }
                }
            }
        }
    }

    /// Platform revoked the capability identified by `lease`.
    pub(crate) async fn handle_revoked(&self, lease: u64) {
        let (had_timer, deactivated) = {
            let mut guard = self.state.lock().await;
            if guard.capability.as_ref().map(|held| held.lease) != Some(lease) {
                debug!("[wake-lock] ignoring revocation of stale lease {lease}");
                return;
            }
            guard.capability = None;
            let had_timer = guard.timer.timer_active;
            if self.is_main_with_live_peer() {
                // The mirrored value reflects the detached peer, not this context's capability.
                (had_timer, false)
            } else {
                guard.session.is_active = false;
                guard.clear_timer();
                (had_timer, true)
            }
        };

        warn!(
            "[wake-lock] keep-awake capability revoked by the platform (timer={had_timer}, deactivated={deactivated})"
        );
        self.emit(
            WakeEvent::CapabilityRevoked,
            &RevokedPayload {
                had_timer,
                deactivated,
            },
        );
        if deactivated {
            self.broadcast().await;
        }
        self.emit_state_if_changed().await;
    }

    /// Sends the current state to the peer, if there is one.
    pub(crate) async fn broadcast(&self) {
        let state = self.sync_state().await;
        match self.messenger.broadcast_sync(state) {
            Ok(true) => debug!("[messenger] sent sync {state:?}"),
            Ok(false) => {}
            Err(err) => self.handle_send_failure(err),
        }
    }

    /// Posting failed: for main, behave as if the peer had already closed.
    pub(crate) fn handle_send_failure(&self, err: WakeError) {
        match self.role {
            ContextRole::DetachedChild => {
                debug!("[messenger] parent unreachable, continuing standalone: {err}");
            }
            ContextRole::Main => {
                warn!("[messenger] detached peer unreachable, recovering: {err}");
                let Some(core) = self.weak_self.upgrade() else {
                    return;
                };
                if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                    runtime.spawn(async move {
                        core.handle_peer_closed(None).await;
                    });
                }
            }
        }
    }

    pub(crate) fn emit<T: Serialize>(&self, event: WakeEvent, payload: &T) {
        if let Err(e) = emit_event(self.events.as_ref(), event, payload) {
            debug!("Failed to emit {} event: {e}", event.as_str());
        }
    }

    /// Emits a state-changed event when the observable snapshot differs from the last one sent.
    pub(crate) async fn emit_state_if_changed(&self) {
        let next = {
            let mut guard = self.state.lock().await;
            let next = self.snapshot_locked(&guard);
            if guard.last_emitted.as_ref() == Some(&next) {
                return;
            }
            guard.last_emitted = Some(next);
            next
        };
        self.emit(WakeEvent::StateChanged, &next);
    }
}

fn schedule_revocation(core: Weak<WakeLockCore>, lease: u64) {
    let Some(core) = core.upgrade() else {
        return;
    };
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn(async move {
                core.handle_revoked(lease).await;
            });
        }
        Err(_) => warn!("[wake-lock] revocation observed outside of a runtime; ignoring"),
    }
}

use std::sync::Arc;

use log::{debug, info, warn};

use super::core::WakeLockCore;
use crate::domains::messaging::{Envelope, MessageKind, PeerPort, SyncMessage};
use crate::events::{OriginRejectedPayload, RecoveryOutcome, RecoveryPayload, WakeEvent};
use crate::errors::WakeError;
use crate::shared::context::{ContextRole, SyncState};

impl WakeLockCore {
    /// Entry point for everything the host channel delivers to this context.
    pub async fn handle_envelope(&self, envelope: &Envelope) {
        let message = match self.messenger.receive(envelope) {
            Ok(message) => message,
            Err(WakeError::OriginMismatch { expected, actual }) => {
                self.emit(
                    WakeEvent::OriginRejected,
                    &OriginRejectedPayload { expected, actual },
                );
                return;
            }
            Err(err) => {
                warn!("[messenger] dropping undecodable message from {}: {err}", envelope.source);
                return;
            }
        };

        if self.role == ContextRole::Main
            && self.messenger.child_label().as_deref() != Some(envelope.source.as_str())
        {
            debug!(
                "[messenger] ignoring {:?} from {} which is not the current peer",
                message.kind, envelope.source
            );
            return;
        }

        self.handle_message(message).await;
    }

    pub async fn handle_message(&self, message: SyncMessage) {
        match (message.kind, self.role) {
            (MessageKind::Sync, ContextRole::DetachedChild) => {
                if let Some(desired) = message.state {
                    self.reconcile(desired).await;
                }
            }
            (MessageKind::Sync, ContextRole::Main) => {
                if let Some(truth) = message.state {
                    self.mirror(truth).await;
                }
            }
            (MessageKind::PeerClosed, ContextRole::Main) => {
                self.handle_peer_closed(message.state).await;
            }
            (MessageKind::PeerClosed, ContextRole::DetachedChild) => {
                debug!("[messenger] detached context ignores peer-closed");
            }
        }
    }

    /// Detached side: treat the incoming state as the desired target and converge on it.
    async fn reconcile(&self, desired: SyncState) {
        let (duplicate, is_active) = {
            let guard = self.state.lock().await;
            let duplicate = guard.countdown.is_running()
                && desired.timer_active == guard.timer.timer_active
                && desired.remaining_seconds == guard.timer.remaining_seconds;
            (duplicate, guard.session.is_active)
        };
        if duplicate {
            debug!("[wake-lock] ignoring duplicate sync {desired:?}");
            return;
        }

        if desired.is_active && !is_active {
            if !self.acquire().await {
                return;
            }
        } else if !desired.is_active && is_active {
            self.release().await;
            return;
        }

        if desired.timer_active && desired.remaining_seconds > 0 {
            let started = {
                let mut guard = self.state.lock().await;
                if guard.countdown.is_running() || !guard.session.is_active {
                    false
                } else {
                    guard.timer.resume(desired.remaining_seconds);
                    self.start_countdown_locked(&mut guard);
                    true
                }
            };
            if started {
                info!(
                    "[wake-lock] adopted timer with {}s remaining",
                    desired.remaining_seconds
                );
                self.broadcast().await;
            }
        }
        self.emit_state_if_changed().await;
    }

    /// Main side: the detached peer is authoritative, copy its state verbatim.
    async fn mirror(&self, truth: SyncState) {
        {
            let mut guard = self.state.lock().await;
            if !self.messenger.has_child() {
                debug!("[wake-lock] ignoring sync received without a registered peer");
                return;
            }
            guard.session.is_active = truth.is_active;
            guard.timer.timer_active = truth.is_active && truth.timer_active;
            guard.timer.remaining_seconds = truth.remaining_seconds;
            if guard.timer.timer_active {
                guard.timer.duration_minutes =
                    u32::try_from(truth.remaining_seconds.div_ceil(60)).unwrap_or(u32::MAX);
            }
        }
        self.emit_state_if_changed().await;
    }

    /// Main side: register the detached surface, send it the current state and give up local
    /// ownership so only the child holds the capability and runs the countdown.
    pub async fn hand_off(&self, port: Arc<dyn PeerPort>) -> bool {
        if self.role != ContextRole::Main {
            warn!("[wake-lock] hand_off is only valid from the main context");
            return false;
        }
        let Some(_operation) = self.begin_operation("hand_off") else {
            return false;
        };

        let previous = self.messenger.attach_child(port);
        if let Some(previous) = &previous {
            warn!(
                "[wake-lock] replacing detached surface {} with a new one",
                previous.label()
            );
        }

        let state = self.sync_state().await;
        if let Err(err) = self.messenger.send_to_child(&SyncMessage::sync(state)) {
            warn!("[wake-lock] initial sync to detached surface failed, keeping ownership: {err}");
            match previous {
                Some(previous) => {
                    self.messenger.attach_child(previous);
                }
                None => {
                    self.messenger.detach_child();
                }
            }
            return false;
        }

        // The replaced surface no longer owns anything; its later messages are dropped by label.
        if let Some(previous) = previous {
            if let Err(err) = self.messenger.release_replaced(previous.as_ref()) {
                debug!(
                    "[messenger] could not tell replaced surface {} to release: {err}",
                    previous.label()
                );
            }
        }

        let held = {
            let mut guard = self.state.lock().await;
            guard.countdown.stop();
            guard.timer.reset();
            guard.timer.duration_minutes = 0;
            guard.capability.take()
        };
        if let Some(held) = held {
            if let Err(err) = held.handle.release().await {
                warn!("[wake-lock] failed to release main capability during hand-off: {err}");
            }
        }

        info!("[wake-lock] handed off to detached surface with {state:?}");
        self.emit(WakeEvent::Handoff, &state);
        self.emit_state_if_changed().await;
        true
    }

    /// Main side: the detached peer is gone. Takes back ownership exactly once.
    pub async fn handle_peer_closed(&self, final_state: Option<SyncState>) -> Option<RecoveryOutcome> {
        if self.role != ContextRole::Main {
            return None;
        }
        if !self.messenger.detach_child() {
            debug!("[wake-lock] peer-closed ignored: no peer registered");
            return None;
        }

        let (was_active, had_timer, time_remaining) = {
            let mut guard = self.state.lock().await;
            let captured = final_state.unwrap_or_else(|| guard.sync_state());
            guard.timer.timer_active = captured.timer_active;
            guard.timer.remaining_seconds = captured.remaining_seconds;
            (
                captured.is_active,
                captured.timer_active,
                captured.remaining_seconds,
            )
        };
        info!(
            "[wake-lock] detached peer closed (active={was_active}, timer={had_timer}, remaining={time_remaining}s)"
        );
        self.emit(
            WakeEvent::PeerClosed,
            &SyncState {
                is_active: was_active,
                timer_active: had_timer,
                remaining_seconds: time_remaining,
            },
        );

        // Let the teardown that reported the closure finish before taking over.
        tokio::task::yield_now().await;

        let outcome = if was_active {
            if self.acquire().await {
                let mut guard = self.state.lock().await;
                if had_timer && time_remaining > 0 {
                    guard.timer.resume(time_remaining);
                    self.start_countdown_locked(&mut guard);
                } else {
                    guard.clear_timer();
                }
                RecoveryOutcome::Reacquired
            } else {
                let stale = {
                    let mut guard = self.state.lock().await;
                    guard.session.is_active = false;
                    guard.clear_timer();
                    guard.capability.take()
                };
                if let Some(stale) = stale {
                    if let Err(err) = stale.handle.release().await {
                        warn!("[wake-lock] failed to clean up stale capability: {err}");
                    }
                }
                RecoveryOutcome::ReacquireFailed
            }
        } else {
            let stale = {
                let mut guard = self.state.lock().await;
                guard.session.is_active = false;
                guard.clear_timer();
                guard.capability.take()
            };
            if let Some(stale) = stale {
                if let Err(err) = stale.handle.release().await {
                    warn!("[wake-lock] failed to clean up stale capability: {err}");
                }
            }
            RecoveryOutcome::Cleared
        };

        info!("[wake-lock] recovery finished: {outcome:?}");
        self.emit(
            WakeEvent::RecoveryCompleted,
            &RecoveryPayload {
                was_active,
                had_timer,
                time_remaining,
                outcome: outcome.clone(),
            },
        );
        self.emit_state_if_changed().await;
        Some(outcome)
    }

    /// The channel identified by `label` stopped delivering. Recovers if it was the current peer.
    pub async fn handle_peer_gone(&self, label: &str) -> Option<RecoveryOutcome> {
        if self.messenger.child_label().as_deref() != Some(label) {
            return None;
        }
        self.handle_peer_closed(None).await
    }

    /// Watchdog probe: recovers when the registered peer is observed closed.
    pub async fn check_peer_liveness(&self) -> Option<RecoveryOutcome> {
        if self.role != ContextRole::Main
            || !self.messenger.has_child()
            || self.messenger.has_live_child()
        {
            return None;
        }
        warn!("[wake-lock] detached peer observed closed without notice");
        self.handle_peer_closed(None).await
    }

    /// Detached side teardown: report the final state to the parent, then drop local ownership.
    pub async fn notify_closing(&self) {
        if self.role != ContextRole::DetachedChild {
            return;
        }
        let final_state = self.sync_state().await;
        if let Err(err) = self.messenger.notify_peer_closed(final_state) {
            debug!("[messenger] could not send peer-closed to parent: {err}");
        }

        let held = {
            let mut guard = self.state.lock().await;
            guard.clear_timer();
            guard.session.is_active = false;
            guard.capability.take()
        };
        if let Some(held) = held {
            if let Err(err) = held.handle.release().await {
                warn!("[wake-lock] failed to release capability on teardown: {err}");
            }
        }
        self.emit_state_if_changed().await;
    }

    /// Context teardown. Main releases what it holds; a detached child notifies its parent.
    pub async fn shutdown(&self) {
        match self.role {
            ContextRole::DetachedChild => self.notify_closing().await,
            ContextRole::Main => {
                if self.is_main_with_live_peer() {
                    self.state.lock().await.clear_timer();
                } else {
                    self.release().await;
                }
            }
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::shared::context::{ContextRole, SyncState};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WakeLockSession {
    pub is_active: bool,
    pub is_supported: bool,
}

/// Countdown bound to a session. `timer_active` implies the owning session is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerState {
    pub timer_active: bool,
    pub duration_minutes: u32,
    pub remaining_seconds: u64,
}

impl TimerState {
    pub fn start(&mut self, minutes: u32) {
        self.timer_active = true;
        self.duration_minutes = minutes;
        self.remaining_seconds = u64::from(minutes) * 60;
    }

    /// Resumes at an arbitrary remaining value; the duration is derived by rounding up.
    pub fn resume(&mut self, remaining_seconds: u64) {
        self.timer_active = true;
        self.remaining_seconds = remaining_seconds;
        self.duration_minutes = u32::try_from(remaining_seconds.div_ceil(60)).unwrap_or(u32::MAX);
    }

    pub fn reset(&mut self) {
        self.timer_active = false;
        self.remaining_seconds = 0;
    }

    /// Decrements by one second, floored at zero. Returns true once the countdown has run out.
    pub fn tick(&mut self) -> bool {
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        self.remaining_seconds == 0
    }
}

/// Read-only view of a context, as exposed to presentation and emitted with state events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WakeSnapshot {
    pub role: ContextRole,
    pub is_active: bool,
    pub is_loading: bool,
    pub is_supported: bool,
    pub timer_active: bool,
    pub duration_minutes: u32,
    pub remaining_seconds: u64,
    pub has_live_peer: bool,
}

impl WakeSnapshot {
    pub fn sync_state(&self) -> SyncState {
        SyncState {
            is_active: self.is_active,
            timer_active: self.timer_active,
            remaining_seconds: self.remaining_seconds,
        }
    }
}

use std::sync::Arc;

use serde::Serialize;

use crate::domains::wake_lock::{WakeLockCore, format_time};

pub const STATUS_AWAKE: &str = "Device awake";
pub const STATUS_SLEEPING: &str = "Device sleeping";
pub const BUTTON_FOCUS_PEER: &str = "Focus floating window";
pub const BUTTON_AWAKE: &str = "Device awake";
pub const BUTTON_KEEP_AWAKE: &str = "Click to keep awake";

/// Everything a view needs to render one context.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PresentationView {
    pub is_active: bool,
    pub is_loading: bool,
    pub is_supported: bool,
    pub timer_active: bool,
    pub duration_minutes: u32,
    pub remaining_seconds: u64,
    pub has_live_peer: bool,
    pub status_text: &'static str,
    pub button_text: &'static str,
    pub remaining_text: Option<String>,
}

/// Read-only fields plus the user operations. Failures surface only as unchanged state or a
/// `false` return.
#[derive(Clone)]
pub struct PresentationAdapter {
    core: Arc<WakeLockCore>,
}

impl PresentationAdapter {
    pub fn new(core: Arc<WakeLockCore>) -> Self {
        Self { core }
    }

    pub async fn view(&self) -> PresentationView {
        let snapshot = self.core.snapshot().await;
        let mirrors_peer = self.core.is_main_with_live_peer();

        PresentationView {
            is_active: snapshot.is_active,
            is_loading: snapshot.is_loading,
            is_supported: snapshot.is_supported,
            timer_active: snapshot.timer_active,
            duration_minutes: snapshot.duration_minutes,
            remaining_seconds: snapshot.remaining_seconds,
            has_live_peer: snapshot.has_live_peer,
            status_text: if snapshot.is_active {
                STATUS_AWAKE
            } else {
                STATUS_SLEEPING
            },
            button_text: if mirrors_peer {
                BUTTON_FOCUS_PEER
            } else if snapshot.is_active {
                BUTTON_AWAKE
            } else {
                BUTTON_KEEP_AWAKE
            },
            remaining_text: snapshot
                .timer_active
                .then(|| format_time(snapshot.remaining_seconds)),
        }
    }

    pub async fn acquire(&self) -> bool {
        self.core.acquire().await
    }

    pub async fn release(&self) {
        self.core.release().await;
    }

    pub async fn toggle(&self) {
        self.core.toggle().await;
    }

    pub async fn start_timer(&self, minutes: i64) -> bool {
        self.core.start_timer(minutes).await
    }

    pub async fn stop_timer(&self) {
        self.core.stop_timer().await;
    }

    pub fn format_time(&self, seconds: u64) -> String {
        format_time(seconds)
    }
}

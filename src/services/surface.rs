use std::sync::Arc;

use log::{info, warn};

use super::context::WakeLockContext;
use crate::domains::messaging::{SurfaceHandle, link};
use crate::domains::wake_lock::CapabilityAdapter;
use crate::errors::WakeError;
use crate::infrastructure::config::WakeConfig;

/// In-process floating surface: a detached child context linked to a main context.
pub struct DetachedSurface {
    context: Arc<WakeLockContext>,
    handle: SurfaceHandle,
    label: String,
}

impl DetachedSurface {
    /// Opens a detached surface next to `main` and hands the wake obligation to it.
    pub async fn open(
        main: &WakeLockContext,
        config: &WakeConfig,
        adapter: Arc<dyn CapabilityAdapter>,
    ) -> Result<Self, WakeError> {
        let origin = config.app_origin()?.to_string();
        let (main_side, child_side) = link(&origin, &origin);
        let handle = child_side.surface.clone();
        let label = child_side.label().to_string();

        let context = WakeLockContext::detached_child(config, adapter, child_side).await?;
        if !main.hand_off(main_side).await {
            warn!("[wake-lock] hand-off to {label} rejected, closing surface");
            handle.close();
            context.abort_tasks();
            return Err(WakeError::unreachable(&label, "hand-off rejected"));
        }

        info!("[wake-lock] opened detached surface {label}");
        Ok(Self {
            context,
            handle,
            label,
        })
    }

    pub fn context(&self) -> &Arc<WakeLockContext> {
        &self.context
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    /// Orderly close: the child reports its final state to the parent before going away.
    pub async fn close(self) {
        self.context.shutdown().await;
        self.handle.close();
        info!("[wake-lock] closed detached surface {}", self.label);
    }

    /// Close without any teardown message, as when the surface is killed by the host.
    /// The parent only learns about it through its liveness checks.
    pub async fn close_abruptly(self) {
        self.handle.close();
        self.context.abort_tasks();
        self.context.core().release().await;
        warn!("[wake-lock] detached surface {} vanished", self.label);
    }
}

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::process::Child;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::platform::{PlatformAdapter, default_adapter};
use crate::domains::wake_lock::capability::{
    Capability, CapabilityAdapter, CapabilityKind, RevocationCallback, RevocationSlot,
};
use crate::errors::WakeError;

const STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// Keeps the display awake by running the platform inhibitor for as long as the
/// capability is held. An inhibitor that exits on its own counts as a revocation.
pub struct InhibitorAdapter {
    platform: Option<Arc<dyn PlatformAdapter>>,
    reason: String,
}

impl InhibitorAdapter {
    /// Uses the inhibitor available on this host. Without one the adapter reports itself
    /// unsupported instead of failing.
    pub fn detect(reason: impl Into<String>) -> Self {
        let platform = match default_adapter() {
            Ok(platform) => {
                info!("[inhibitor] using {} to keep the display awake", platform.name());
                Some(Arc::from(platform))
            }
            Err(e) => {
                info!("[inhibitor] no keep-awake inhibitor available: {e}");
                None
            }
        };
        Self {
            platform,
            reason: reason.into(),
        }
    }

    pub fn with_platform(platform: Arc<dyn PlatformAdapter>, reason: impl Into<String>) -> Self {
        Self {
            platform: Some(platform),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl CapabilityAdapter for InhibitorAdapter {
    fn is_supported(&self) -> bool {
        self.platform.is_some()
    }

    async fn request(&self, _kind: CapabilityKind) -> Result<Box<dyn Capability>, WakeError> {
        let Some(platform) = &self.platform else {
            return Err(WakeError::CapabilityUnavailable {
                platform: std::env::consts::OS.to_string(),
            });
        };

        let std_cmd = platform.build_command(&self.reason)?;
        let command_line = format!("{std_cmd:?}");
        let mut cmd = tokio::process::Command::from(std_cmd);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| WakeError::io("spawn_inhibitor", &command_line, e))?;
        let pid = child.id();
        info!("[inhibitor] spawned inhibitor pid={pid:?} ({})", platform.name());

        let slot = Arc::new(RevocationSlot::new());
        let (stop_tx, stop_rx) = oneshot::channel();
        let watcher = tokio::spawn(watch_inhibitor(child, Arc::clone(&slot), stop_rx));

        Ok(Box::new(InhibitorCapability {
            slot,
            stop: Mutex::new(Some(stop_tx)),
            watcher: Mutex::new(Some(watcher)),
        }))
    }
}

async fn watch_inhibitor(mut child: Child, slot: Arc<RevocationSlot>, stop: oneshot::Receiver<()>) {
    tokio::select! {
        status = child.wait() => {
            match status {
                Ok(status) => warn!("[inhibitor] inhibitor exited unexpectedly: {status}"),
                Err(e) => warn!("[inhibitor] failed to wait for inhibitor: {e}"),
            }
            slot.revoke();
        }
        // A dropped sender means the capability was dropped without release.
        _ = stop => terminate(&mut child).await,
    }
}

async fn terminate(child: &mut Child) {
    let Some(pid) = child.id() else {
        return;
    };

    if let Err(e) = nix::sys::signal::kill(
        nix::unistd::Pid::from_raw(pid as i32),
        nix::sys::signal::Signal::SIGTERM,
    ) {
        debug!("[inhibitor] SIGTERM to inhibitor pid={pid} failed: {e}");
    }

    match tokio::time::timeout(STOP_TIMEOUT, child.wait()).await {
        Ok(_) => info!("[inhibitor] stopped inhibitor pid={pid}"),
        Err(_) => {
            warn!("[inhibitor] inhibitor pid={pid} ignored SIGTERM, killing");
            if let Err(e) = child.kill().await {
                warn!("[inhibitor] failed to kill inhibitor pid={pid}: {e}");
            }
        }
    }
}

struct InhibitorCapability {
    slot: Arc<RevocationSlot>,
    stop: Mutex<Option<oneshot::Sender<()>>>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl Capability for InhibitorCapability {
    async fn release(&self) -> Result<(), WakeError> {
        self.slot.mark_released();

        let stop = self
            .stop
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(stop) = stop {
            // The watcher is gone already when the inhibitor exited on its own.
            let _ = stop.send(());
        }

        let watcher = self
            .watcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(watcher) = watcher {
            if let Err(e) = watcher.await {
                debug!("[inhibitor] inhibitor watcher ended abnormally: {e}");
            }
        }
        Ok(())
    }

    fn on_revoked(&self, callback: RevocationCallback) {
        self.slot.register(callback);
    }
}

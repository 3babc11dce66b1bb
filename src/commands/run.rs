use std::sync::Arc;

use anyhow::{Result, bail};
use log::{debug, info, warn};
use tokio::sync::broadcast::error::RecvError;

use wakelink::WakeConfig;
use wakelink::WakeLockContext;
use wakelink::domains::power::InhibitorAdapter;
use wakelink::events::WakeEvent;

use super::describe;

/// Holds the native keep-awake capability until Ctrl-C or until the timer expires.
pub async fn keep_awake(config: &WakeConfig, minutes: Option<u32>) -> Result<()> {
    let adapter = Arc::new(InhibitorAdapter::detect(config.inhibitor.reason.clone()));
    let context = WakeLockContext::main(config, adapter).await?;
    let presentation = context.presentation();

    if !presentation.view().await.is_supported {
        bail!("keeping the display awake is not supported on this host");
    }

    let mut events = context.subscribe();
    let started = match minutes {
        Some(minutes) => presentation.start_timer(i64::from(minutes)).await,
        None => presentation.acquire().await,
    };
    if !started {
        bail!("could not keep the display awake");
    }
    println!("{}", describe("main", &presentation.view().await));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("[wake-lock] interrupted, releasing");
                break;
            }
            event = events.recv() => match event {
                Ok(event) if event.name == WakeEvent::StateChanged.as_str() => {
                    let view = presentation.view().await;
                    println!("{}", describe("main", &view));
                    if !view.is_active {
                        break;
                    }
                }
                Ok(event) if event.name == WakeEvent::CapabilityRevoked.as_str() => {
                    warn!("[wake-lock] keep-awake was revoked by the system");
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => debug!("[wake-lock] skipped {skipped} events"),
                Err(RecvError::Closed) => break,
            }
        }
    }

    context.shutdown().await;
    Ok(())
}

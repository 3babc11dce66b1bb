use std::sync::Arc;

use anyhow::{Result, bail};

use wakelink::domains::wake_lock::MemoryAdapter;
use wakelink::{DetachedSurface, WakeConfig, WakeLockContext};

use super::describe;

/// Walks through hand-off, mirroring and recovery between a main context and a floating
/// surface sharing one simulated display.
pub async fn detach_demo(
    config: &WakeConfig,
    minutes: u32,
    close_after: u64,
    abrupt: bool,
) -> Result<()> {
    let adapter = MemoryAdapter::new(true);
    let main = WakeLockContext::main(config, Arc::new(adapter.clone())).await?;
    let main_view = main.presentation();

    if !main_view.start_timer(i64::from(minutes)).await {
        bail!("main context could not start a {minutes} minute timer");
    }
    println!("{}", describe("main", &main_view.view().await));

    let surface = DetachedSurface::open(&main, config, Arc::new(adapter.clone())).await?;
    println!("opened floating surface {}", surface.label());
    let child_view = surface.context().presentation();

    for _ in 0..close_after {
        tokio::time::sleep(config.tick_interval()).await;
        println!("{}", describe("surface", &child_view.view().await));
        println!("{}", describe("main", &main_view.view().await));
    }

    if abrupt {
        println!("floating surface crashes");
        surface.close_abruptly().await;
        tokio::time::sleep(config.peer_watch_interval() * 2).await;
    } else {
        println!("floating surface closes");
        surface.close().await;
        tokio::time::sleep(config.tick_interval() / 4).await;
    }

    println!("{}", describe("main", &main_view.view().await));
    println!("held capabilities: {}", adapter.held_count());
    main.shutdown().await;
    Ok(())
}

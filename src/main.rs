mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use mimalloc::MiMalloc;

use wakelink::WakeConfig;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let config = WakeConfig::load().context("failed to load configuration")?;
    init_logging(&config);
    log::debug!("wakelink {} starting", cli::VERSION);

    cli::dispatch(cli, config).await
}

fn init_logging(config: &WakeConfig) {
    let default_level = config.log_level.as_deref().unwrap_or("info");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

use anyhow::Result;

use wakelink::WakeConfig;
pub use wakelink::shared::cli::{Cli, Commands, VERSION};

use crate::commands;

pub async fn dispatch(cli: Cli, config: WakeConfig) -> Result<()> {
    match cli.command {
        Commands::Run { minutes } => commands::run::keep_awake(&config, minutes).await,
        Commands::DetachDemo {
            minutes,
            close_after,
            abrupt,
        } => {
            let minutes = minutes.unwrap_or(config.default_timer_minutes);
            commands::demo::detach_demo(&config, minutes, close_after, abrupt).await
        }
        Commands::FormatTime { seconds } => {
            println!("{}", wakelink::format_time(seconds));
            Ok(())
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

use clap::{Parser, Subcommand};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(
    name = "wakelink",
    about = "Keep the display awake, handing the obligation between a main view and a floating surface",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Commands {
    /// Keep the display awake until interrupted, or until the timer runs out.
    Run {
        /// Release automatically after this many minutes.
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// Run a main context and an in-process floating surface and show the hand-off protocol.
    DetachDemo {
        /// Timer started in the main context before the surface opens (default from config).
        #[arg(long)]
        minutes: Option<u32>,
        /// Close the floating surface after this many ticks.
        #[arg(long, default_value_t = 3)]
        close_after: u64,
        /// Close the surface without a teardown message.
        #[arg(long)]
        abrupt: bool,
    },
    /// Print a number of seconds the way timers are displayed.
    FormatTime { seconds: u64 },
    /// Print the effective configuration as TOML.
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_minutes() {
        let cli = Cli::try_parse_from(["wakelink", "run", "--minutes", "15"]).unwrap();
        assert_eq!(cli.command, Commands::Run { minutes: Some(15) });
    }

    #[test]
    fn detach_demo_defaults() {
        let cli = Cli::try_parse_from(["wakelink", "detach-demo"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::DetachDemo {
                minutes: None,
                close_after: 3,
                abrupt: false,
            }
        );
    }

    #[test]
    fn rejects_negative_seconds() {
        assert!(Cli::try_parse_from(["wakelink", "format-time", "-5"]).is_err());
    }
}

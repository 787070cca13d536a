use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::AppConfig;

mod fetch;
mod list_channels;
mod serve;

pub use fetch::FetchCommand;
pub use list_channels::ListChannelsCommand;
pub use serve::ServeCommand;

#[derive(Parser, Debug)]
#[command(name = "vidswitch")]
#[command(about = "Live channel switcher with periodic manifest refresh")]
pub struct Args {
    /// Configuration file (YAML). Uses the built-in defaults when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend bearer token, overrides the configured one
    #[arg(long, env = "VIDSWITCH_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the channel session and its HTTP control surface (default)
    Serve(ServeCommand),
    /// List configured channels and exit
    ListChannels(ListChannelsCommand),
    /// Request the manifest URL for one channel and exit
    Fetch(FetchCommand),
}

impl Args {
    pub async fn run(self) -> Result<()> {
        init_logging(self.verbose);

        let config = AppConfig::load(self.config.as_deref())?.with_token(self.token);
        let command = self
            .command
            .unwrap_or(Command::Serve(ServeCommand::default()));

        match command {
            Command::Serve(cmd) => cmd.run(config).await,
            Command::ListChannels(cmd) => cmd.run(config).await,
            Command::Fetch(cmd) => cmd.run(config).await,
        }
    }
}

fn init_logging(verbose: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(log_filter(verbose, rust_log.as_deref()))
        .init();
}

/// `--verbose` wins, then `RUST_LOG`, then plain `info`.
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

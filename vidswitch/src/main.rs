use anyhow::Result;
use clap::Parser;

mod backend;
mod channel;
mod cli;
mod config;
mod playback;
mod server;
mod session;
mod util;

#[tokio::main]
async fn main() -> Result<()> {
    cli::Args::parse().run().await
}

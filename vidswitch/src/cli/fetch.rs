use anyhow::{Result, bail};
use clap::Parser;

use crate::backend::{ManifestFetcher, ManifestSource};
use crate::channel::ChannelId;
use crate::config::AppConfig;

#[derive(Parser, Debug)]
pub struct FetchCommand {
    /// Channel id
    pub channel: String,
}

impl FetchCommand {
    pub async fn run(self, config: AppConfig) -> Result<()> {
        let registry = config.registry()?;
        let id = ChannelId::new(self.channel);
        let Some(channel) = registry.get(&id) else {
            bail!("Channel '{}' is not configured", id);
        };

        tracing::info!(target: "fetch", channel = %id, name = %channel.name, "Requesting manifest");
        let fetcher = ManifestFetcher::new(&config.backend.url, &config.backend.token);
        let url = fetcher.fetch_manifest(&id).await?;

        println!("{}", url);
        Ok(())
    }
}

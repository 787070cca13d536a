use anyhow::Result;
use clap::Parser;

use crate::config::AppConfig;

#[derive(Parser, Debug)]
pub struct ListChannelsCommand;

impl ListChannelsCommand {
    pub async fn run(self, config: AppConfig) -> Result<()> {
        let registry = config.registry()?;
        println!("Configured channels:");
        for (i, ch) in registry.list().iter().enumerate() {
            println!("  {:>3}. [{}] {} (id: {})", i + 1, ch.badge(), ch.name, ch.id);
        }
        Ok(())
    }
}

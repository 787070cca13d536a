use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Parser;
use tokio::{signal, sync::watch};

use crate::backend::{ManifestFetcher, ManifestSource};
use crate::channel::ChannelId;
use crate::config::AppConfig;
use crate::playback::EngineFactory;
use crate::session::Controller;
use crate::util::time;

#[derive(Parser, Debug, Default)]
pub struct ServeCommand {
    /// HTTP listen address, overrides the configured one
    #[arg(short, long)]
    pub listen: Option<SocketAddr>,

    /// Channel to select at startup instead of the first configured one
    #[arg(long)]
    pub channel: Option<String>,

    /// Do not select any channel at startup
    #[arg(long)]
    pub no_autoplay: bool,
}

impl ServeCommand {
    pub async fn run(self, config: AppConfig) -> Result<()> {
        let registry = config.registry()?;

        let startup_channel = match self.channel {
            Some(id) => {
                let id = ChannelId::new(id);
                if !registry.contains(&id) {
                    bail!("Channel '{}' is not configured", id);
                }
                Some(id)
            }
            None if config.autoplay && !self.no_autoplay => {
                registry.first().map(|ch| ch.id.clone())
            }
            None => None,
        };

        if config.backend.token.is_empty() {
            tracing::warn!(target: "serve", "No backend token configured, requests will be unauthenticated");
        }

        // Shutdown signal
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let fetcher = ManifestFetcher::new(&config.backend.url, &config.backend.token);
        let controller = Controller::new(
            registry,
            Arc::new(fetcher) as Arc<dyn ManifestSource>,
            Arc::new(config.engine.clone()) as Arc<dyn EngineFactory>,
            config.refresh_interval(),
        );

        tracing::info!(
            target: "serve",
            channels = controller.channels().len(),
            refresh = %time::describe_interval(controller.refresh_interval()),
            "Session ready"
        );

        let addr = self.listen.unwrap_or(config.server.listen);
        let server_handle = {
            let controller = controller.clone();
            tokio::spawn(async move {
                if let Err(e) = crate::server::run_server(addr, controller, shutdown_rx).await {
                    tracing::error!(target: "server", error = %e, "Server stopped");
                }
            })
        };

        if let Some(id) = startup_channel {
            let controller = controller.clone();
            tokio::spawn(async move {
                // Failures are already logged and retried by the refresh timer.
                let _ = controller.select_channel(&id).await;
            });
        }

        // Wait for Ctrl+C
        signal::ctrl_c().await?;
        tracing::info!(target: "serve", "Shutting down...");
        let _ = shutdown_tx.send(true);

        controller.shutdown().await;
        let _ = server_handle.await;

        tracing::info!(target: "serve", "Done.");
        Ok(())
    }
}

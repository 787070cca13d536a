use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::broadcast;

use super::engine::{EVENT_CAPACITY, EngineError, EngineEvent, PlaybackEngine, emit};

/**
    Headless engine that keeps a live session warm without rendering video.

    A load downloads the manifest and checks that it is a DASH or HLS
    document. The content itself is not interpreted.
*/
pub struct ProbeEngine {
    client: Client,
    events: broadcast::Sender<EngineEvent>,
}

impl ProbeEngine {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { client, events }
    }

    async fn probe(&self, manifest_url: &str) -> Result<(), EngineError> {
        let response = self.client.get(manifest_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Load(format!(
                "manifest request returned {}",
                status
            )));
        }

        let body = response.text().await?;
        if !looks_like_manifest(&body) {
            return Err(EngineError::Load(
                "response is not a DASH or HLS manifest".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ProbeEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn looks_like_manifest(body: &str) -> bool {
    let trimmed = body.trim_start();
    trimmed.starts_with("#EXTM3U") || trimmed.contains("<MPD")
}

#[async_trait]
impl PlaybackEngine for ProbeEngine {
    async fn load(&self, manifest_url: &str) -> Result<(), EngineError> {
        emit(&self.events, EngineEvent::Loading);
        emit(&self.events, EngineEvent::Buffering { active: true });

        let result = self.probe(manifest_url).await;
        emit(&self.events, EngineEvent::Buffering { active: false });

        match &result {
            Ok(()) => emit(&self.events, EngineEvent::Loaded),
            Err(e) => emit(
                &self.events,
                EngineEvent::Error {
                    message: e.to_string(),
                },
            ),
        }
        result
    }

    async fn destroy(&self) -> Result<(), EngineError> {
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}

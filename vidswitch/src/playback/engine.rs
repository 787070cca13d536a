use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

/// Capacity of each engine's event channel.
pub const EVENT_CAPACITY: usize = 64;

/// Lifecycle notifications emitted by a playback engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    Loading,
    Loaded,
    Buffering { active: bool },
    Error { message: String },
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine could not be created.
    #[error("playback engine unavailable: {0}")]
    Unavailable(String),

    /// The engine rejected the manifest or failed while loading it.
    #[error("playback failed: {0}")]
    Load(String),

    #[error("playback I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("playback HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/**
    External adaptive-streaming player.

    `load` is authoritative for success or failure. Events from `subscribe`
    are informational only.
*/
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    async fn load(&self, manifest_url: &str) -> Result<(), EngineError>;

    async fn destroy(&self) -> Result<(), EngineError>;

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;
}

/// Creates engine instances on demand.
pub trait EngineFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn PlaybackEngine>, EngineError>;
}

/// Send an event, ignoring the case where nobody is listening.
pub(crate) fn emit(events: &broadcast::Sender<EngineEvent>, event: EngineEvent) {
    let _ = events.send(event);
}

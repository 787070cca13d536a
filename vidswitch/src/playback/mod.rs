pub mod command;
pub mod engine;
pub mod probe;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use command::CommandEngine;
pub use engine::{EngineError, EngineEvent, EngineFactory, PlaybackEngine};
pub use probe::ProbeEngine;

const DEFAULT_STARTUP_GRACE_MS: u64 = 2000;

fn default_startup_grace_ms() -> u64 {
    DEFAULT_STARTUP_GRACE_MS
}

/// Which playback engine to drive, and how.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineConfig {
    /// Launch an external player with the manifest URL appended to `command`.
    Command {
        command: Vec<String>,
        #[serde(default = "default_startup_grace_ms")]
        startup_grace_ms: u64,
    },
    /// Headless: only check that the manifest is reachable.
    #[default]
    Probe,
}

impl EngineFactory for EngineConfig {
    fn create(&self) -> Result<Arc<dyn PlaybackEngine>, EngineError> {
        match self {
            EngineConfig::Command {
                command,
                startup_grace_ms,
            } => {
                let engine =
                    CommandEngine::new(command.clone(), Duration::from_millis(*startup_grace_ms))?;
                Ok(Arc::new(engine))
            }
            EngineConfig::Probe => Ok(Arc::new(ProbeEngine::new())),
        }
    }
}

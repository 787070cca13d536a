use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, broadcast};

use super::engine::{EVENT_CAPACITY, EngineError, EngineEvent, PlaybackEngine, emit};

/**
    Playback engine backed by an external player process.

    Each load replaces the running player. A load counts as successful once
    the player has survived the startup grace period.
*/
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    startup_grace: Duration,
    child: Mutex<Option<Child>>,
    events: broadcast::Sender<EngineEvent>,
}

impl CommandEngine {
    pub fn new(command: Vec<String>, startup_grace: Duration) -> Result<Self, EngineError> {
        let mut parts = command.into_iter();
        let program = parts
            .next()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| EngineError::Unavailable("player command is empty".to_string()))?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            program,
            args: parts.collect(),
            startup_grace,
            child: Mutex::new(None),
            events,
        })
    }

    fn fail(&self, message: String) -> EngineError {
        emit(
            &self.events,
            EngineEvent::Error {
                message: message.clone(),
            },
        );
        EngineError::Load(message)
    }
}

async fn stop_child(program: &str, child: &mut Child) -> Result<(), EngineError> {
    if child.try_wait()?.is_some() {
        return Ok(());
    }
    tracing::debug!(target: "player", program, "Stopping player process");
    child.kill().await?;
    Ok(())
}

#[async_trait]
impl PlaybackEngine for CommandEngine {
    async fn load(&self, manifest_url: &str) -> Result<(), EngineError> {
        emit(&self.events, EngineEvent::Loading);

        let mut slot = self.child.lock().await;
        if let Some(mut previous) = slot.take() {
            if let Err(e) = stop_child(&self.program, &mut previous).await {
                tracing::warn!(target: "player", error = %e, "Failed to stop previous player");
            }
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(manifest_url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.fail(format!("failed to launch '{}': {}", self.program, e)))?;

        match tokio::time::timeout(self.startup_grace, child.wait()).await {
            Ok(Ok(status)) => Err(self.fail(format!(
                "player exited during startup ({})",
                status
            ))),
            Ok(Err(e)) => Err(self.fail(format!("failed to watch player: {}", e))),
            Err(_still_running) => {
                tracing::debug!(
                    target: "player",
                    program = %self.program,
                    pid = ?child.id(),
                    "Player running"
                );
                *slot = Some(child);
                emit(&self.events, EngineEvent::Loaded);
                Ok(())
            }
        }
    }

    async fn destroy(&self) -> Result<(), EngineError> {
        let mut slot = self.child.lock().await;
        match slot.take() {
            Some(mut child) => stop_child(&self.program, &mut child).await,
            None => Ok(()),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn engine(command: &[&str], grace_ms: u64) -> CommandEngine {
        CommandEngine::new(
            command.iter().map(|s| s.to_string()).collect(),
            Duration::from_millis(grace_ms),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_player_that_keeps_running_is_loaded() {
        // `sh -c <script> <$0> <$1>`: the manifest URL lands in $1.
        let engine = engine(&["sh", "-c", "sleep 30", "player"], 150);
        let mut events = engine.subscribe();

        engine.load("https://x/a.mpd").await.unwrap();
        assert_eq!(events.recv().await.unwrap(), EngineEvent::Loading);
        assert_eq!(events.recv().await.unwrap(), EngineEvent::Loaded);
        assert!(engine.child.lock().await.is_some());

        engine.destroy().await.unwrap();
        assert!(engine.child.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_player_that_exits_early_fails() {
        let engine = engine(&["sh", "-c", "exit 3", "player"], 2000);
        let mut events = engine.subscribe();

        let err = engine.load("https://x/a.mpd").await.unwrap_err();
        assert!(matches!(err, EngineError::Load(_)));
        assert_eq!(events.recv().await.unwrap(), EngineEvent::Loading);
        assert!(matches!(
            events.recv().await.unwrap(),
            EngineEvent::Error { .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_load() {
        let engine = engine(&["/nonexistent/vidswitch-player"], 100);
        let err = engine.load("https://x/a.mpd").await.unwrap_err();
        assert!(err.to_string().contains("failed to launch"));
    }

    #[tokio::test]
    async fn test_destroy_without_player_is_ok() {
        let engine = engine(&["sh"], 100);
        engine.destroy().await.unwrap();
    }
}

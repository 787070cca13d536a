use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::backend::ManifestUrl;
use crate::channel::ChannelId;
use crate::playback::{EngineEvent, PlaybackEngine};

/// Lifecycle status of the playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Loading,
    Playing,
    Refreshing,
    Error,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Loading => "loading",
            SessionStatus::Playing => "playing",
            SessionStatus::Refreshing => "refreshing",
            SessionStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// On/off status lights for observers. Never drive transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Indicators {
    pub api: bool,
    pub player: bool,
    pub refresh: bool,
    pub stream: bool,
}

/// Result of a select, refresh or reset call that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The manifest was loaded and the session is playing.
    Playing(ManifestUrl),
    /// Nothing to do: unknown channel, or no channel selected.
    Skipped,
    /// A newer sequence started before this one finished; its result was dropped.
    Superseded,
}

/// Notification published on every session transition and engine event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusEvent {
    Session {
        status: SessionStatus,
        channel: Option<ChannelId>,
        message: String,
    },
    Engine {
        event: EngineEvent,
    },
}

/// Point-in-time copy of the session state.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub channel: Option<ChannelId>,
    pub manifest_url: Option<ManifestUrl>,
    pub last_error: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
    pub next_refresh: Option<DateTime<Utc>>,
    pub refresh_interval_ms: u64,
    pub refresh_interval: String,
    pub indicators: Indicators,
    pub generation: u64,
}

pub(super) struct ActiveEngine {
    pub engine: Arc<dyn PlaybackEngine>,
    pub watcher: JoinHandle<()>,
}

pub(super) struct RefreshTimer {
    pub id: u64,
    pub deadline: Instant,
    pub fires_at: DateTime<Utc>,
    pub handle: JoinHandle<()>,
}

/// Mutable session state owned by one controller.
pub(super) struct SessionState {
    pub status: SessionStatus,
    pub channel: Option<ChannelId>,
    pub engine: Option<ActiveEngine>,
    pub timer: Option<RefreshTimer>,
    pub generation: u64,
    pub next_timer_id: u64,
    pub manifest_url: Option<ManifestUrl>,
    pub last_error: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
    pub indicators: Indicators,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Idle,
            channel: None,
            engine: None,
            timer: None,
            generation: 0,
            next_timer_id: 0,
            manifest_url: None,
            last_error: None,
            last_update: None,
            indicators: Indicators::default(),
        }
    }

    /// Abort the armed timer, if any.
    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
            tracing::debug!(
                target: "session",
                remaining = ?timer.deadline.saturating_duration_since(Instant::now()),
                "Refresh timer cancelled"
            );
        }
        self.indicators.refresh = false;
    }

    /// Detach the active engine and stop forwarding its events.
    pub fn take_engine(&mut self) -> Option<Arc<dyn PlaybackEngine>> {
        let active = self.engine.take()?;
        active.watcher.abort();
        self.indicators.player = false;
        self.indicators.stream = false;
        Some(active.engine)
    }
}

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::backend::{ManifestSource, ManifestUrl};
use crate::channel::{ChannelId, ChannelRegistry};
use crate::playback::{EngineError, EngineEvent, EngineFactory, PlaybackEngine};
use crate::util::time;

use super::error::SessionError;
use super::state::{
    ActiveEngine, Outcome, RefreshTimer, SessionSnapshot, SessionState, SessionStatus, StatusEvent,
};

const STATUS_CAPACITY: usize = 128;

/// What started a fetch-and-load sequence.
#[derive(Debug, Clone, Copy)]
enum Trigger {
    Select,
    Manual,
    Timer,
}

impl Trigger {
    fn status(self) -> SessionStatus {
        match self {
            Trigger::Select => SessionStatus::Loading,
            Trigger::Manual | Trigger::Timer => SessionStatus::Refreshing,
        }
    }

    fn message(self) -> &'static str {
        match self {
            Trigger::Select => "Fetching stream info...",
            Trigger::Manual | Trigger::Timer => "Refreshing stream...",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Trigger::Select => "select",
            Trigger::Manual => "manual",
            Trigger::Timer => "auto",
        }
    }
}

/// One in-flight sequence, tagged with the generation it started under.
struct Ticket {
    generation: u64,
    channel: ChannelId,
    trigger: Trigger,
}

struct Inner {
    channels: ChannelRegistry,
    source: Arc<dyn ManifestSource>,
    engines: Arc<dyn EngineFactory>,
    refresh_interval: Duration,
    state: Mutex<SessionState>,
    status_tx: broadcast::Sender<StatusEvent>,
}

/**
    Playback session controller.

    Owns the session state, runs fetch-then-load sequences for channel
    switches and refreshes, and keeps exactly one refresh timer armed after
    every completed sequence, whether it succeeded or not.

    Every sequence records the generation it started under. A sequence whose
    generation has been overtaken when its fetch or load resolves is dropped
    without touching the session.

    Cheap to clone; all clones drive the same session.
*/
#[derive(Clone)]
pub struct Controller {
    inner: Arc<Inner>,
}

impl Controller {
    pub fn new(
        channels: ChannelRegistry,
        source: Arc<dyn ManifestSource>,
        engines: Arc<dyn EngineFactory>,
        refresh_interval: Duration,
    ) -> Self {
        let (status_tx, _) = broadcast::channel(STATUS_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                channels,
                source,
                engines,
                refresh_interval,
                state: Mutex::new(SessionState::new()),
                status_tx,
            }),
        }
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.inner.channels
    }

    pub fn refresh_interval(&self) -> Duration {
        self.inner.refresh_interval
    }

    /// Status feed: session transitions and forwarded engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.inner.status_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.state.lock();
        let interval = self.inner.refresh_interval;
        SessionSnapshot {
            status: state.status,
            channel: state.channel.clone(),
            manifest_url: state.manifest_url.clone(),
            last_error: state.last_error.clone(),
            last_update: state.last_update,
            next_refresh: state.timer.as_ref().map(|t| t.fires_at),
            refresh_interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            refresh_interval: time::describe_interval(interval),
            indicators: state.indicators,
            generation: state.generation,
        }
    }

    /// Monotonic deadline of the armed refresh timer.
    #[cfg(test)]
    fn next_refresh_deadline(&self) -> Option<Instant> {
        self.inner.state.lock().timer.as_ref().map(|t| t.deadline)
    }

    /**
        Switch to `id` and run a full fetch-and-load sequence.

        Unknown ids are ignored. Selecting the current channel again still
        runs the whole sequence.
    */
    pub async fn select_channel(&self, id: &ChannelId) -> Result<Outcome, SessionError> {
        let Some(channel) = self.inner.channels.get(id) else {
            tracing::warn!(target: "session", channel = %id, "Ignoring unknown channel");
            return Ok(Outcome::Skipped);
        };
        tracing::info!(target: "session", channel = %id, name = %channel.name, "Loading channel");

        let ticket = {
            let mut state = self.inner.state.lock();
            self.begin(&mut state, id.clone(), Trigger::Select)
        };
        self.run(ticket).await
    }

    /// Re-fetch and reload the current channel on request.
    pub async fn refresh(&self) -> Result<Outcome, SessionError> {
        self.refresh_with(Trigger::Manual).await
    }

    /**
        Tear down the playback engine and reload the current channel.

        A failing `destroy` is logged and ignored. With no channel selected
        this does nothing.
    */
    pub async fn reset(&self) -> Result<Outcome, SessionError> {
        let (engine, channel) = {
            let mut state = self.inner.state.lock();
            let Some(channel) = state.channel.clone() else {
                tracing::debug!(target: "session", "Reset with no channel selected");
                return Ok(Outcome::Skipped);
            };
            state.generation += 1;
            state.cancel_timer();
            (state.take_engine(), channel)
        };

        tracing::info!(target: "session", channel = %channel, "Resetting player");
        if let Some(engine) = engine {
            destroy_engine(engine).await;
        }
        self.select_channel(&channel).await
    }

    /// Cancel the refresh timer and release the engine.
    pub async fn shutdown(&self) {
        let engine = {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            state.cancel_timer();
            state.take_engine()
        };
        if let Some(engine) = engine {
            destroy_engine(engine).await;
        }
    }

    async fn refresh_with(&self, trigger: Trigger) -> Result<Outcome, SessionError> {
        let ticket = {
            let mut state = self.inner.state.lock();
            let Some(channel) = state.channel.clone() else {
                tracing::warn!(target: "session", "No channel selected to refresh");
                return Ok(Outcome::Skipped);
            };
            self.begin(&mut state, channel, trigger)
        };
        tracing::info!(
            target: "session",
            channel = %ticket.channel,
            trigger = ticket.trigger.label(),
            "Refreshing stream"
        );
        self.run(ticket).await
    }

    fn begin(&self, state: &mut SessionState, channel: ChannelId, trigger: Trigger) -> Ticket {
        state.generation += 1;
        state.status = trigger.status();
        state.channel = Some(channel.clone());
        self.publish(state, trigger.message());
        Ticket {
            generation: state.generation,
            channel,
            trigger,
        }
    }

    async fn run(&self, ticket: Ticket) -> Result<Outcome, SessionError> {
        let url = match self.inner.source.fetch_manifest(&ticket.channel).await {
            Ok(url) => url,
            Err(e) => return self.fail(&ticket, e.into()),
        };

        let engine = match self.prepare_load(&ticket) {
            Ok(Some(engine)) => engine,
            Ok(None) => return Ok(superseded(&ticket)),
            Err(e) => return self.fail(&ticket, e.into()),
        };

        tracing::debug!(target: "session", channel = %ticket.channel, url = %url, "Loading manifest into player");
        match engine.load(url.as_str()).await {
            Ok(()) => Ok(self.succeed(&ticket, url)),
            Err(e) => self.fail(&ticket, e.into()),
        }
    }

    /// Hand out the engine for a fresh manifest, creating it on first use.
    fn prepare_load(
        &self,
        ticket: &Ticket,
    ) -> Result<Option<Arc<dyn PlaybackEngine>>, EngineError> {
        let mut state = self.inner.state.lock();
        if state.generation != ticket.generation {
            return Ok(None);
        }
        state.indicators.api = true;

        let engine = match &state.engine {
            Some(active) => Arc::clone(&active.engine),
            None => {
                let engine = self.inner.engines.create()?;
                let watcher = self.watch_engine(&engine);
                state.engine = Some(ActiveEngine {
                    engine: Arc::clone(&engine),
                    watcher,
                });
                state.indicators.player = true;
                tracing::info!(target: "session", "Playback engine created");
                engine
            }
        };

        self.publish(&state, "Loading stream...");
        Ok(Some(engine))
    }

    fn succeed(&self, ticket: &Ticket, url: ManifestUrl) -> Outcome {
        let mut state = self.inner.state.lock();
        if state.generation != ticket.generation {
            return superseded(ticket);
        }

        state.status = SessionStatus::Playing;
        state.manifest_url = Some(url.clone());
        state.last_error = None;
        state.last_update = Some(time::now());
        state.indicators.stream = true;
        self.arm_timer(&mut state);
        self.publish(&state, format!("Channel {} playing", ticket.channel));

        tracing::info!(
            target: "session",
            channel = %ticket.channel,
            trigger = ticket.trigger.label(),
            "Channel playing"
        );
        Outcome::Playing(url)
    }

    fn fail(&self, ticket: &Ticket, error: SessionError) -> Result<Outcome, SessionError> {
        let mut state = self.inner.state.lock();
        if state.generation != ticket.generation {
            return Ok(superseded(ticket));
        }

        state.status = SessionStatus::Error;
        state.last_error = Some(error.to_string());
        match &error {
            SessionError::Fetch(_) => state.indicators.api = false,
            SessionError::Playback(_) => state.indicators.stream = false,
        }
        self.arm_timer(&mut state);
        self.publish(&state, error.to_string());

        tracing::warn!(
            target: "session",
            channel = %ticket.channel,
            trigger = ticket.trigger.label(),
            kind = ?error.kind(),
            error = %error,
            "Load failed, retrying at next refresh"
        );
        Err(error)
    }

    /// Replace any armed timer with one firing `refresh_interval` from now.
    fn arm_timer(&self, state: &mut SessionState) {
        state.cancel_timer();
        state.next_timer_id += 1;

        let id = state.next_timer_id;
        let interval = self.inner.refresh_interval;
        let deadline = Instant::now() + interval;
        let weak = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let controller = Controller { inner };
            // Clear our own slot first so the refresh can arm its successor.
            if controller.disarm(id) {
                tracing::info!(target: "session", "Auto-refresh triggered");
                let _ = controller.refresh_with(Trigger::Timer).await;
            }
        });

        let fires_at = time::after(interval);
        tracing::debug!(target: "session", next_refresh = %fires_at, "Refresh timer armed");
        state.timer = Some(RefreshTimer {
            id,
            deadline,
            fires_at,
            handle,
        });
        state.indicators.refresh = true;
    }

    fn disarm(&self, id: u64) -> bool {
        let mut state = self.inner.state.lock();
        if state.timer.as_ref().map(|t| t.id) != Some(id) {
            return false;
        }
        state.timer = None;
        state.indicators.refresh = false;
        true
    }

    fn watch_engine(&self, engine: &Arc<dyn PlaybackEngine>) -> JoinHandle<()> {
        let mut events = engine.subscribe();
        let weak = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(target: "player", skipped, "Dropped player events");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                Controller { inner }.observe(event);
            }
        })
    }

    /// Record an engine event for observers. Never changes the session status.
    fn observe(&self, event: EngineEvent) {
        match &event {
            EngineEvent::Loading => tracing::debug!(target: "player", "Loading"),
            EngineEvent::Loaded => tracing::debug!(target: "player", "Loaded"),
            EngineEvent::Buffering { active: true } => {
                tracing::debug!(target: "player", "Buffering")
            }
            EngineEvent::Buffering { active: false } => {
                tracing::debug!(target: "player", "Buffering finished")
            }
            EngineEvent::Error { message } => {
                tracing::warn!(target: "player", message = %message, "Player error")
            }
        }

        {
            let mut state = self.inner.state.lock();
            match event {
                EngineEvent::Loaded => state.indicators.stream = true,
                EngineEvent::Error { .. } => state.indicators.stream = false,
                _ => {}
            }
        }
        let _ = self.inner.status_tx.send(StatusEvent::Engine { event });
    }

    fn publish(&self, state: &SessionState, message: impl Into<String>) {
        let _ = self.inner.status_tx.send(StatusEvent::Session {
            status: state.status,
            channel: state.channel.clone(),
            message: message.into(),
        });
    }
}

fn superseded(ticket: &Ticket) -> Outcome {
    tracing::debug!(
        target: "session",
        channel = %ticket.channel,
        generation = ticket.generation,
        "Dropping result of superseded sequence"
    );
    Outcome::Superseded
}

async fn destroy_engine(engine: Arc<dyn PlaybackEngine>) {
    if let Err(e) = engine.destroy().await {
        tracing::warn!(target: "session", error = %e, "Error destroying player");
    }
}

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;

use crate::session::StatusEvent;

use super::{AppState, shutdown_signal};

/// Server-sent events feed of session transitions and player events.
///
/// The stream ends when the server starts shutting down so graceful
/// shutdown is not held open by connected clients.
pub async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.controller.subscribe()).filter_map(|msg| async move {
        // Lagging subscribers just miss events; the snapshot stays authoritative.
        let event = msg.ok()?;
        let name = match &event {
            StatusEvent::Session { .. } => "session",
            StatusEvent::Engine { .. } => "engine",
        };
        Event::default()
            .event(name)
            .json_data(&event)
            .ok()
            .map(Ok::<_, Infallible>)
    })
    .take_until(shutdown_signal(state.shutdown.clone()));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

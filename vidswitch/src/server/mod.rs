pub mod events;
pub mod routes;

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::{net::TcpListener, sync::watch};

use crate::session::Controller;

#[derive(Clone)]
pub struct AppState {
    pub controller: Controller,
    /// Flips to true when the server is shutting down; ends open event streams.
    pub shutdown: watch::Receiver<bool>,
}

/// Build the control surface router.
pub fn router(controller: Controller, shutdown: watch::Receiver<bool>) -> Router {
    Router::new()
        .route("/", get(routes::status))
        .route("/status", get(routes::status))
        .route("/channels", get(routes::list_channels))
        .route("/channels/{channel_id}/select", post(routes::select_channel))
        .route("/refresh", post(routes::refresh))
        .route("/reset", post(routes::reset))
        .route("/events", get(events::stream_events))
        .with_state(AppState {
            controller,
            shutdown,
        })
}

/// Resolve once `rx` reads true or its sender is gone.
pub(crate) async fn shutdown_signal(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            break;
        }
    }
}

/// Run the HTTP server until `shutdown_rx` flips to true.
pub async fn run_server(
    addr: SocketAddr,
    controller: Controller,
    shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, controller, shutdown_rx).await
}

/// Serve on an already bound listener until `shutdown_rx` flips to true.
pub async fn serve_on(
    listener: TcpListener,
    controller: Controller,
    shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let local_addr = listener.local_addr()?;
    tracing::info!(target: "server", "Listening on http://{}", local_addr);

    axum::serve(listener, router(controller, shutdown_rx.clone()))
        .with_graceful_shutdown(shutdown_signal(shutdown_rx))
        .await?;

    tracing::info!(target: "server", "Server shut down");
    Ok(())
}

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::channel::ChannelId;
use crate::session::{Outcome, SessionError};

use super::AppState;

/// Current session snapshot.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.controller.snapshot())
}

/// Configured channels, in configuration order.
pub async fn list_channels(State(state): State<AppState>) -> impl IntoResponse {
    let selected = state.controller.snapshot().channel;
    let channels: Vec<serde_json::Value> = state
        .controller
        .channels()
        .list()
        .iter()
        .map(|ch| {
            json!({
                "id": ch.id,
                "name": ch.name,
                "slug": ch.slug,
                "logo": ch.logo,
                "badge": ch.badge(),
                "selected": selected.as_ref() == Some(&ch.id),
            })
        })
        .collect();

    Json(json!({ "channels": channels }))
}

pub async fn select_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Response {
    let id = ChannelId::new(channel_id);
    if !state.controller.channels().contains(&id) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Unknown channel '{}'", id) })),
        )
            .into_response();
    }

    let result = state.controller.select_channel(&id).await;
    outcome_response(&state, result)
}

pub async fn refresh(State(state): State<AppState>) -> Response {
    let result = state.controller.refresh().await;
    outcome_response(&state, result)
}

pub async fn reset(State(state): State<AppState>) -> Response {
    let result = state.controller.reset().await;
    outcome_response(&state, result)
}

/// Map a controller result to a JSON response carrying the new snapshot.
fn outcome_response(state: &AppState, result: Result<Outcome, SessionError>) -> Response {
    let session = state.controller.snapshot();
    match result {
        Ok(Outcome::Playing(url)) => Json(json!({
            "outcome": "playing",
            "manifest_url": url,
            "session": session,
        }))
        .into_response(),
        Ok(Outcome::Skipped) => Json(json!({
            "outcome": "skipped",
            "session": session,
        }))
        .into_response(),
        Ok(Outcome::Superseded) => Json(json!({
            "outcome": "superseded",
            "session": session,
        }))
        .into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "outcome": "error",
                "kind": e.kind(),
                "error": e.to_string(),
                "session": session,
            })),
        )
            .into_response(),
    }
}

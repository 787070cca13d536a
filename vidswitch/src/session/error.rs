use serde::Serialize;
use thiserror::Error;

use crate::backend::FetchError;
use crate::playback::EngineError;

/// Why a load or refresh attempt ended in the error state.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Playback(#[from] EngineError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Backend,
    MalformedResponse,
    PlaybackEngine,
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Fetch(FetchError::Network(_)) => ErrorKind::Network,
            SessionError::Fetch(FetchError::Backend { .. }) => ErrorKind::Backend,
            SessionError::Fetch(FetchError::MalformedResponse(_)) => ErrorKind::MalformedResponse,
            SessionError::Playback(_) => ErrorKind::PlaybackEngine,
        }
    }
}

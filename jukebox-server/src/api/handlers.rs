//! Public HTTP handlers
//!
//! Submission, pending list, now-playing and health.

use crate::api::AppContext;
use crate::error::Error;
use crate::model::PendingTrack;
use crate::playback::{AddOutcome, NowPlayingInfo, Rejection};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// Generic status body used for errors and simple acknowledgements
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

impl StatusResponse {
    pub fn new(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: message.into(),
        }
    }
}

pub type ApiError = (StatusCode, Json<StatusResponse>);

#[derive(Debug, Deserialize)]
pub struct AddTrackRequest {
    /// Free-text `"Artist - Title"` query
    #[serde(default)]
    pub song: Option<String>,
    #[serde(default)]
    pub submitted_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddTrackResponse {
    pub status: String,
    pub entry_id: Uuid,
    pub track: PendingTrack,
    /// started | queued | deferred | failed
    pub playback: String,
    pub message: String,
    /// Set when this submission started playback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub now_playing: Option<NowPlayingInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueueResponse {
    pub count: usize,
    pub queue: Vec<PendingTrack>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NowPlayingResponse {
    pub is_active: bool,
    pub now_playing: Option<NowPlayingInfo>,
}

// ============================================================================
// Error mapping
// ============================================================================

/// Map an engine error to its HTTP status
pub fn error_response(err: Error) -> ApiError {
    let (status, label) = match &err {
        Error::InputRejected(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
        Error::CatalogMiss(_) => (StatusCode::NOT_FOUND, "not_found"),
        Error::Catalog(_) => (StatusCode::BAD_GATEWAY, "catalog_unavailable"),
        Error::NothingPlaying => (StatusCode::CONFLICT, "nothing_playing"),
        Error::EngineStopped => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "error"),
    };
    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        debug!("Request refused: {}", err);
    }
    (status, Json(StatusResponse::new(label, err.to_string())))
}

fn rejection_response(rejection: Rejection) -> ApiError {
    match rejection {
        Rejection::DuplicateTrack(id) => (
            StatusCode::CONFLICT,
            Json(StatusResponse::new(
                "duplicate",
                format!("{} is already in playlist", id),
            )),
        ),
        Rejection::GenreNotAllowed(genre) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(StatusResponse::new(
                "genre_not_allowed",
                format!("Genre '{}' is not allowed right now", genre),
            )),
        ),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "jukebox-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/v1/queue
pub async fn list_queue(State(ctx): State<AppContext>) -> Json<QueueResponse> {
    let queue = ctx.engine.list_pending();
    Json(QueueResponse {
        count: queue.len(),
        queue,
    })
}

/// POST /api/v1/queue
pub async fn add_track(
    State(ctx): State<AppContext>,
    Json(req): Json<AddTrackRequest>,
) -> Result<(StatusCode, Json<AddTrackResponse>), ApiError> {
    let song = req.song.unwrap_or_default();
    let outcome = ctx
        .engine
        .add_track(&song, req.submitted_by.as_deref())
        .await
        .map_err(error_response)?;

    match outcome {
        AddOutcome::Accepted {
            entry,
            playback,
            now_playing,
        } => {
            info!(
                track_id = %entry.track.id,
                playback = playback.as_str(),
                "Submission accepted"
            );
            let message = match &now_playing {
                Some(started) if started.id != entry.track.id => format!(
                    "{} added to playlist. Now playing {} - {}",
                    entry.track.display_name(),
                    started.artist,
                    started.title
                ),
                _ => format!(
                    "{} added to playlist. {}",
                    entry.track.display_name(),
                    playback.message()
                ),
            };
            Ok((
                StatusCode::CREATED,
                Json(AddTrackResponse {
                    status: "added".to_string(),
                    entry_id: entry.entry_id,
                    track: entry.to_pending(),
                    playback: playback.as_str().to_string(),
                    message,
                    now_playing,
                }),
            ))
        }
        AddOutcome::Rejected(rejection) => Err(rejection_response(rejection)),
    }
}

/// GET /api/v1/now-playing
pub async fn now_playing(State(ctx): State<AppContext>) -> Json<NowPlayingResponse> {
    let now_playing = ctx.engine.now_playing();
    Json(NowPlayingResponse {
        is_active: now_playing.is_some(),
        now_playing,
    })
}

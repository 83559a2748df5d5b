//! Administrative HTTP handlers and the admin token gate

use crate::api::handlers::{error_response, ApiError, StatusResponse};
use crate::api::AppContext;
use crate::playback::{PlaybackOutcome, StatusReport};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Header carrying the admin token
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

#[derive(Debug, Deserialize)]
pub struct GenresRequest {
    pub genres: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenresResponse {
    pub allowed_genres: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaybackResponse {
    pub playback: String,
    pub message: String,
}

impl From<PlaybackOutcome> for PlaybackResponse {
    fn from(outcome: PlaybackOutcome) -> Self {
        Self {
            playback: outcome.as_str().to_string(),
            message: outcome.message(),
        }
    }
}

/// Reject admin requests whose `X-Admin-Token` does not match
///
/// A context without a token lets every request through.
pub async fn require_admin_token(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = ctx.admin_token.as_deref() else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(token) if token == expected => next.run(request).await,
        Some(_) => {
            warn!(path = %request.uri().path(), "Admin request with wrong token");
            (
                StatusCode::UNAUTHORIZED,
                Json(StatusResponse::new("unauthorized", "Invalid admin token")),
            )
                .into_response()
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(StatusResponse::new("unauthorized", "Missing X-Admin-Token header")),
        )
            .into_response(),
    }
}

/// GET /api/v1/admin/status
pub async fn get_status(State(ctx): State<AppContext>) -> Json<StatusReport> {
    Json(ctx.engine.get_status())
}

/// PUT /api/v1/admin/genres
pub async fn set_allowed_genres(
    State(ctx): State<AppContext>,
    Json(req): Json<GenresRequest>,
) -> Result<Json<GenresResponse>, ApiError> {
    let allowed_genres = ctx
        .engine
        .set_allowed_genres(req.genres)
        .await
        .map_err(error_response)?;
    info!(allowed = ?allowed_genres, "Genre allow-list updated via API");
    Ok(Json(GenresResponse { allowed_genres }))
}

/// POST /api/v1/admin/playback/skip
pub async fn skip(State(ctx): State<AppContext>) -> Result<Json<PlaybackResponse>, ApiError> {
    let outcome = ctx.engine.skip().await.map_err(error_response)?;
    Ok(Json(outcome.into()))
}

/// POST /api/v1/admin/playback/resume
pub async fn resume(State(ctx): State<AppContext>) -> Result<Json<PlaybackResponse>, ApiError> {
    let outcome = ctx.engine.resume().await.map_err(error_response)?;
    Ok(Json(outcome.into()))
}

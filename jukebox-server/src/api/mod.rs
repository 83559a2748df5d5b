//! HTTP API for jukebox-server
//!
//! Public routes serve submissions, the pending list, now-playing and the SSE
//! stream. Admin routes sit behind the `X-Admin-Token` gate.

pub mod admin;
pub mod handlers;
pub mod sse;

use crate::playback::PlaybackEngine;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub engine: PlaybackEngine,
    /// Required admin header value; `None` disables the admin gate
    pub admin_token: Option<Arc<str>>,
}

impl AppContext {
    pub fn new(engine: PlaybackEngine, admin_token: Option<String>) -> Self {
        let admin_token = admin_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(Arc::from);
        Self {
            engine,
            admin_token,
        }
    }
}

/// Build the application router
pub fn create_router(ctx: AppContext) -> Router {
    let admin = Router::new()
        .route("/api/v1/admin/status", get(admin::get_status))
        .route("/api/v1/admin/genres", put(admin::set_allowed_genres))
        .route("/api/v1/admin/playback/skip", post(admin::skip))
        .route("/api/v1/admin/playback/resume", post(admin::resume))
        .layer(middleware::from_fn_with_state(
            ctx.clone(),
            admin::require_admin_token,
        ));

    let public = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/queue",
            get(handlers::list_queue).post(handlers::add_track),
        )
        .route("/api/v1/now-playing", get(handlers::now_playing))
        .route("/api/v1/events", get(sse::event_stream));

    Router::new()
        .merge(admin)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

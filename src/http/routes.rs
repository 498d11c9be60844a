use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let audio_assets = ServeDir::new(&state.audio_assets_dir);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Credentials
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        // Attempt control
        .route("/exam/begin", post(handlers::begin))
        .route("/exam/status", get(handlers::status))
        .route("/exam/answer", post(handlers::answer))
        .route("/exam/advance", post(handlers::advance))
        .route("/exam/back", post(handlers::back))
        .route("/exam/audio/play", post(handlers::audio_play))
        .route("/exam/audio/pause", post(handlers::audio_pause))
        // Administrator views
        .route("/admin/results", get(handlers::admin_results))
        .route("/admin/candidates", get(handlers::admin_candidates))
        // Listening tracks and chart images
        .nest_service("/audio", audio_assets)
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

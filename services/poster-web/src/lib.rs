//! Poster web service library.
//!
//! HTTP endpoints for theme and paper listings, reverse geocoding, poster
//! generation with cancellation, and downloads of generated files.

pub mod handlers;
pub mod state;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;

use state::AppState;

/// All routes, with the state attached.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/themes", get(handlers::themes_handler))
        .route("/api/formats", get(handlers::formats_handler))
        .route("/api/geocode", post(handlers::geocode_handler))
        .route("/api/generate", post(handlers::generate_handler))
        .route("/api/cancel", post(handlers::cancel_handler))
        .route("/api/download/:filename", get(handlers::download_handler))
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(Extension(state))
}

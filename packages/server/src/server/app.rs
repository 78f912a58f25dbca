//! Application setup and server configuration.

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::common::AppState;
use crate::server::routes::{health_handler, scrape_webhook_handler};

/// Build the axum application with routes and shared state.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/webhook/scrape-job", post(scrape_webhook_handler))
        .layer(Extension(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

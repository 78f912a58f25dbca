use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::common::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    relay: RelayHealth,
}

#[derive(Serialize)]
pub struct RelayHealth {
    connected: bool,
    reconnect_attempts: u32,
}

/// Health check endpoint
///
/// Reports process liveness plus relay connection state. A disconnected
/// relay is not fatal (the client reconnects on its own), so this returns
/// 200 once the process is up.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            relay: RelayHealth {
                connected: state.relay.is_connected(),
                reconnect_attempts: state.relay.reconnect_attempts(),
            },
        }),
    )
}

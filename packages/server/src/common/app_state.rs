//! Shared application state handed to the axum router.

use std::sync::Arc;

use relay::RelayClient;

use crate::domains::jobs::Orchestrator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub relay: RelayClient,
    pub orchestrator: Arc<Orchestrator>,
}

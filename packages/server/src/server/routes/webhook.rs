//! Scrape trigger webhook.
//!
//! The admin studio posts here when an operator presses "run now". The
//! response is an immediate acknowledgment; the scrape itself runs
//! fire-and-forget on its own task.

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Deserialize;

use crate::common::AppState;
use crate::domains::jobs::{Platform, ScrapeParams};

#[derive(Debug, Deserialize)]
pub struct ScrapeTrigger {
    pub platform: Platform,
    /// Number of models to scrape.
    pub limit: u32,
    #[serde(flatten)]
    pub params: ScrapeParams,
}

pub async fn scrape_webhook_handler(
    Extension(state): Extension<AppState>,
    Json(trigger): Json<ScrapeTrigger>,
) -> (StatusCode, &'static str) {
    tracing::info!(
        platform = %trigger.platform,
        limit = trigger.limit,
        "scrape webhook received"
    );

    state
        .orchestrator
        .spawn_adhoc(trigger.platform, trigger.limit, trigger.params);

    (StatusCode::OK, "Webhook received")
}

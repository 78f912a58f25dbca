// Main entry point for the scrape orchestration server

use std::sync::Arc;

use anyhow::{Context, Result};
use relay::{RelayClient, RelayConfig};
use server_core::common::AppState;
use server_core::domains::jobs::{HttpJobStore, JobStore, Orchestrator, RelayPublisher};
use server_core::domains::notifications::{LogAlertSink, NotificationCenter, NotificationStore};
use server_core::kernel::start_scheduler;
use server_core::server::build_app;
use server_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting meshvault scrape orchestration server");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Relay connection: explicit lifecycle, reconnects with backoff on its own
    let relay = RelayClient::open(RelayConfig::new(config.relay_url.clone()));
    relay.connect();

    // Notification pipeline consumes the relayed events
    let notifications = NotificationCenter::load(
        NotificationStore::new(config.notification_store_path.clone()),
        Arc::new(LogAlertSink),
    );
    notifications.attach(relay.bus());

    // Job store accessor + orchestrator
    let store: Arc<dyn JobStore> = Arc::new(HttpJobStore::new(
        config.job_store_url.clone(),
        config.job_store_token.clone(),
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&store),
        Arc::new(RelayPublisher::new(relay.clone())),
        config.scraper_root.clone(),
        config.scraper_interpreter.clone(),
    ));

    // Periodic eligibility ticks; the handle keeps the scheduler alive
    let _scheduler = start_scheduler(Arc::clone(&store), Arc::clone(&orchestrator))
        .await
        .context("Failed to start scheduler")?;

    // Build application
    let app = build_app(AppState {
        relay: relay.clone(),
        orchestrator,
    });

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

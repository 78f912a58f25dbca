use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// WebSocket URL of the relay endpoint.
    pub relay_url: String,
    /// Base URL of the document store's scrape-job surface.
    pub job_store_url: String,
    /// Bearer token for the document store, if it requires one.
    pub job_store_token: Option<String>,
    /// Directory holding the per-platform scraper scripts.
    pub scraper_root: PathBuf,
    /// Interpreter the scrapers run under.
    pub scraper_interpreter: String,
    /// File slot the notification feed persists into.
    pub notification_store_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            relay_url: env::var("RELAY_WS_URL")
                .unwrap_or_else(|_| "ws://localhost:3001/ws".to_string()),
            job_store_url: env::var("JOB_STORE_URL")
                .context("JOB_STORE_URL must be set")?,
            job_store_token: env::var("JOB_STORE_TOKEN").ok(),
            scraper_root: env::var("SCRAPER_ROOT")
                .unwrap_or_else(|_| "crawler".to_string())
                .into(),
            scraper_interpreter: env::var("SCRAPER_INTERPRETER")
                .unwrap_or_else(|_| "python3".to_string()),
            notification_store_path: env::var("NOTIFICATION_STORE_PATH")
                .unwrap_or_else(|_| "scraping-notifications.json".to_string())
                .into(),
        })
    }
}

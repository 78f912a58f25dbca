//! Durable storage for the notification feed.
//!
//! One JSON document in a local file slot under a fixed namespace, loaded
//! once at startup and rewritten on every mutation. Write failures surface
//! to the caller, which logs them and keeps the in-memory list
//! authoritative for the session.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::models::Notification;

/// Fixed namespace the feed is stored under.
pub const STORE_NAMESPACE: &str = "scraping-notifications";

pub struct NotificationStore {
    path: PathBuf,
}

impl NotificationStore {
    /// Store backed by an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the namespaced default slot inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(format!("{STORE_NAMESPACE}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted feed. A missing file is an empty feed.
    pub fn load(&self) -> Result<Vec<Notification>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("malformed notification store {}", self.path.display()))
    }

    /// Rewrite the whole slot with the current feed.
    pub fn save(&self, notifications: &[Notification]) -> Result<()> {
        let raw = serde_json::to_string(notifications).context("failed to serialize feed")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

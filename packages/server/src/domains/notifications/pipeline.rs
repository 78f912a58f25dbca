//! Notification pipeline: converts a narrow set of relayed scrape events
//! into the capped, persisted feed behind the admin bell panel.
//!
//! Only `model_scraped`, `scraping_started`, `scraping_completed` and
//! `scraping_error` surface as notifications; connection-state events and
//! raw `scrape_status` chatter never do.

use std::sync::{Arc, Mutex, MutexGuard};

use relay::{EventBus, EventType, ModelSummary, ScrapingEvent, SubscriptionId};
use uuid::Uuid;

use super::models::{Notification, NotificationKind, MAX_NOTIFICATIONS};
use super::persistence::NotificationStore;

/// Audio-cue seam. The daemon's default sink only logs; desktop shells plug
/// in a real player.
pub trait AlertSink: Send + Sync {
    /// Fire the cue for a newly arrived notification.
    fn alert(&self);
}

#[derive(Debug, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn alert(&self) {
        tracing::debug!("notification sound cue");
    }
}

/// The notification feed. Cloneable; clones share state.
#[derive(Clone)]
pub struct NotificationCenter {
    inner: Arc<CenterInner>,
}

struct CenterInner {
    state: Mutex<CenterState>,
    store: NotificationStore,
    alerts: Arc<dyn AlertSink>,
}

struct CenterState {
    notifications: Vec<Notification>,
    sound_enabled: bool,
}

impl NotificationCenter {
    /// Load the persisted feed from `store`. A corrupt slot is logged and
    /// treated as empty; the feed rebuilds from live events.
    pub fn load(store: NotificationStore, alerts: Arc<dyn AlertSink>) -> Self {
        let notifications = match store.load() {
            Ok(list) => list,
            Err(err) => {
                tracing::error!(error = %err, "could not load notification feed; starting empty");
                Vec::new()
            }
        };
        Self {
            inner: Arc::new(CenterInner {
                state: Mutex::new(CenterState {
                    notifications,
                    sound_enabled: true,
                }),
                store,
                alerts,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, CenterState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Prepend a notification, cap the feed at the 20 most recent, fire the
    /// audio cue if sound is on, and persist.
    pub fn add_notification(
        &self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        model: Option<ModelSummary>,
    ) {
        let mut state = self.state();
        state
            .notifications
            .insert(0, Notification::new(kind, title, message, model));
        state.notifications.truncate(MAX_NOTIFICATIONS);
        if state.sound_enabled {
            self.inner.alerts.alert();
        }
        self.persist(&state);
    }

    /// Mark one notification read. One-way: there is no way back to unread.
    pub fn mark_as_read(&self, id: Uuid) -> bool {
        let mut state = self.state();
        let found = match state.notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                true
            }
            None => false,
        };
        if found {
            self.persist(&state);
        }
        found
    }

    pub fn mark_all_as_read(&self) {
        let mut state = self.state();
        for notification in &mut state.notifications {
            notification.read = true;
        }
        self.persist(&state);
    }

    pub fn remove_notification(&self, id: Uuid) -> bool {
        let mut state = self.state();
        let before = state.notifications.len();
        state.notifications.retain(|n| n.id != id);
        let removed = state.notifications.len() != before;
        if removed {
            self.persist(&state);
        }
        removed
    }

    pub fn clear_all(&self) {
        let mut state = self.state();
        state.notifications.clear();
        self.persist(&state);
    }

    /// Flip the sound flag; existing notifications are untouched. Returns
    /// the new value.
    pub fn toggle_sound(&self) -> bool {
        let mut state = self.state();
        state.sound_enabled = !state.sound_enabled;
        state.sound_enabled
    }

    pub fn is_sound_enabled(&self) -> bool {
        self.state().sound_enabled
    }

    /// Always derived from the list, never stored, so it cannot drift.
    pub fn unread_count(&self) -> usize {
        self.state().notifications.iter().filter(|n| !n.read).count()
    }

    /// Snapshot of the feed, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.state().notifications.clone()
    }

    fn persist(&self, state: &CenterState) {
        if let Err(err) = self.inner.store.save(&state.notifications) {
            tracing::error!(
                error = %err,
                "failed to persist notifications; in-memory feed stays authoritative"
            );
        }
    }

    /// Subscribe the pipeline to the event types it surfaces. Returns the
    /// subscriptions so callers can [`NotificationCenter::detach`] later.
    pub fn attach(&self, bus: &EventBus) -> Vec<(EventType, SubscriptionId)> {
        let mut subscriptions = Vec::new();

        let center = self.clone();
        subscriptions.push((
            EventType::ModelScraped,
            bus.on(EventType::ModelScraped, move |event| {
                center.on_model_scraped(event);
            }),
        ));

        let center = self.clone();
        subscriptions.push((
            EventType::ScrapingStarted,
            bus.on(EventType::ScrapingStarted, move |event| {
                let platform = event.data.platform.as_deref().unwrap_or("platform");
                center.add_notification(
                    NotificationKind::Info,
                    "Scraping Started",
                    format!("Scraping job started for {platform}."),
                    None,
                );
            }),
        ));

        let center = self.clone();
        subscriptions.push((
            EventType::ScrapingCompleted,
            bus.on(EventType::ScrapingCompleted, move |event| {
                let platform = event.data.platform.as_deref().unwrap_or("platform");
                center.add_notification(
                    NotificationKind::Success,
                    "Scraping Completed",
                    format!("Scraping job completed successfully for {platform}."),
                    None,
                );
            }),
        ));

        let center = self.clone();
        subscriptions.push((
            EventType::ScrapingError,
            bus.on(EventType::ScrapingError, move |event| {
                let message = event
                    .data
                    .message
                    .clone()
                    .unwrap_or_else(|| "An error occurred during scraping.".to_string());
                center.add_notification(NotificationKind::Error, "Scraping Error", message, None);
            }),
        ));

        subscriptions
    }

    /// Undo [`NotificationCenter::attach`].
    pub fn detach(&self, bus: &EventBus, subscriptions: Vec<(EventType, SubscriptionId)>) {
        for (event_type, id) in subscriptions {
            bus.off(event_type, id);
        }
    }

    fn on_model_scraped(&self, event: &ScrapingEvent) {
        let title = event
            .data
            .model
            .as_ref()
            .map(|m| m.title.as_str())
            .unwrap_or("Unknown");
        self.add_notification(
            NotificationKind::Success,
            "Model Scraped Successfully",
            format!("New model \"{title}\" has been scraped and added to the database."),
            event.data.model.clone(),
        );
    }
}

//! Wire-level scrape event model.
//!
//! Events arrive from the relay endpoint as JSON envelopes:
//! `{ "type": "...", "data": { ... } }`. Events are immutable facts about a
//! scrape run; the client never persists them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event type tags carried on the wire.
///
/// `Connected` and `Disconnected` are synthesized client-side when the
/// connection state changes; the rest originate from scraper processes via
/// the relay endpoint. Unknown tags deserialize to [`EventType::Unknown`],
/// which no consumer subscribes to: delivered but unsubscribed, never an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    ScrapingStarted,
    ModelScraped,
    ScrapingCompleted,
    ScrapingError,
    ScrapeSummary,
    ScrapeStatus,
    Connected,
    Disconnected,
    Unknown,
}

impl EventType {
    /// The snake_case tag written on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ScrapingStarted => "scraping_started",
            EventType::ModelScraped => "model_scraped",
            EventType::ScrapingCompleted => "scraping_completed",
            EventType::ScrapingError => "scraping_error",
            EventType::ScrapeSummary => "scrape_summary",
            EventType::ScrapeStatus => "scrape_status",
            EventType::Connected => "connected",
            EventType::Disconnected => "disconnected",
            EventType::Unknown => "unknown",
        }
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "scraping_started" => EventType::ScrapingStarted,
            "model_scraped" => EventType::ModelScraped,
            "scraping_completed" => EventType::ScrapingCompleted,
            "scraping_error" => EventType::ScrapingError,
            "scrape_summary" => EventType::ScrapeSummary,
            "scrape_status" => EventType::ScrapeStatus,
            "connected" => EventType::Connected,
            "disconnected" => EventType::Disconnected,
            _ => EventType::Unknown,
        }
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.as_str().to_string()
    }
}

/// Subset of a model record embedded in events and notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl ModelSummary {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: None,
            platform: None,
            thumbnail: None,
        }
    }
}

/// Event payload. Every field except the receipt timestamp is optional;
/// which fields are present depends on the event type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_count: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

impl EventData {
    /// Empty payload stamped with the current time.
    pub fn now() -> Self {
        Self {
            model: None,
            platform: None,
            message: None,
            success_count: None,
            failure_count: None,
            timestamp: Utc::now(),
        }
    }
}

/// The wire envelope: a type tag plus payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub data: EventData,
}

impl ScrapingEvent {
    pub fn new(event_type: EventType, data: EventData) -> Self {
        Self { event_type, data }
    }

    /// Synthetic connection-state event (`connected` / `disconnected`).
    pub(crate) fn synthetic(event_type: EventType) -> Self {
        Self::new(event_type, EventData::now())
    }

    /// A scrape run started for `platform`.
    pub fn scraping_started(platform: impl Into<String>) -> Self {
        let mut data = EventData::now();
        data.platform = Some(platform.into());
        Self::new(EventType::ScrapingStarted, data)
    }

    /// A scrape run finished successfully for `platform`.
    pub fn scraping_completed(
        platform: impl Into<String>,
        success_count: u32,
        failure_count: u32,
    ) -> Self {
        let mut data = EventData::now();
        data.platform = Some(platform.into());
        data.success_count = Some(success_count);
        data.failure_count = Some(failure_count);
        Self::new(EventType::ScrapingCompleted, data)
    }

    /// A scrape run failed for `platform`.
    pub fn scraping_error(platform: impl Into<String>, message: impl Into<String>) -> Self {
        let mut data = EventData::now();
        data.platform = Some(platform.into());
        data.message = Some(message.into());
        Self::new(EventType::ScrapingError, data)
    }

    /// A single model was scraped and stored.
    pub fn model_scraped(model: ModelSummary) -> Self {
        let mut data = EventData::now();
        data.model = Some(model);
        Self::new(EventType::ModelScraped, data)
    }
}

//! Notification domain: durable projections of scrape events.

pub mod models;
pub mod persistence;
pub mod pipeline;

pub use models::{Notification, NotificationKind, MAX_NOTIFICATIONS};
pub use persistence::NotificationStore;
pub use pipeline::{AlertSink, LogAlertSink, NotificationCenter};

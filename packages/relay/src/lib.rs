//! # Relay
//!
//! Reconnecting relay client and typed event fan-out for scrape events.
//!
//! The relay endpoint is the network service that fans scrape-process events
//! out to every subscribed admin client. This crate owns the client side of
//! that contract:
//!
//! - [`ScrapingEvent`]: the wire envelope (`{ type, data }`) for events
//! - [`EventBus`]: in-process fan-out so many consumers share one socket
//! - [`RelayClient`]: exactly one logical WebSocket connection with
//!   exponential reconnect backoff and a reconnect circuit breaker
//!
//! ## Architecture
//!
//! ```text
//! relay endpoint (WebSocket)
//!     │
//!     ▼ one connection
//! RelayClient ── read loop ──► EventBus ──► handler, handler, ...
//!     ▲                                     (registration order)
//!     │ send()                       per event type
//! orchestrator / edges
//! ```
//!
//! ## Guarantees
//!
//! - **At-most-once outbound**: `send` delivers only while connected,
//!   otherwise the message is dropped. No outbound queueing or retry.
//! - **Ordered delivery**: handlers for a given event type observe events in
//!   the order the relay delivered them. Delivery is synchronous on the read
//!   loop; handlers should enqueue slow work, not perform it inline.
//! - **Bounded reconnection**: delays follow `base × 2^(attempt − 1)`; after
//!   five failed cycles the client stays disconnected until an explicit
//!   [`RelayClient::connect`]. That stop is a deliberate circuit breaker.
//! - **Transient events**: nothing is persisted here. Durable projections
//!   belong to consumers (e.g. the notification pipeline).

mod bus;
mod client;
mod error;
mod events;

pub use bus::{EventBus, SubscriptionId};
pub use client::{ConnectionState, RelayClient, RelayConfig};
pub use error::RelayError;
pub use events::{EventData, EventType, ModelSummary, ScrapingEvent};

//! Reconnecting WebSocket client for the relay endpoint.
//!
//! The client owns exactly one logical connection. Internal consumers share
//! it through the [`EventBus`] rather than opening sockets of their own.
//!
//! # Reconnection
//!
//! Every failed or unsolicited-closed cycle increments an attempt counter
//! (reset to zero on each successful connect). The Nth reconnect is delayed
//! by `base × 2^(N − 1)`. After [`RelayConfig::max_reconnect_attempts`]
//! failed cycles the client stays disconnected until an explicit
//! [`RelayClient::connect`] call. That stop is a circuit breaker, not a bug.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::bus::{EventBus, SubscriptionId};
use crate::error::RelayError;
use crate::events::{EventType, ScrapingEvent};

const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Connection settings for a [`RelayClient`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// WebSocket URL of the relay endpoint, e.g. `ws://localhost:3001/ws`.
    pub url: String,
    /// First reconnect delay; subsequent delays double.
    pub base_delay: Duration,
    /// Reconnect cycles allowed before the circuit breaker opens.
    pub max_reconnect_attempts: u32,
}

impl RelayConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            base_delay: DEFAULT_BASE_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

/// Observable connection state. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Client handle. Cloneable; clones share the connection and the bus.
#[derive(Clone)]
pub struct RelayClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: RelayConfig,
    bus: EventBus,
    state: Mutex<ConnState>,
}

struct ConnState {
    connection: ConnectionState,
    reconnect_attempts: u32,
    outbound: Option<mpsc::UnboundedSender<Message>>,
    /// Bumped by [`RelayClient::disconnect`]; in-flight tasks and pending
    /// reconnect timers from an older epoch abandon themselves.
    epoch: u64,
}

impl ClientInner {
    fn state(&self) -> MutexGuard<'_, ConnState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RelayClient {
    /// Create a client. Does not connect; call [`RelayClient::connect`].
    pub fn open(config: RelayConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                bus: EventBus::new(),
                state: Mutex::new(ConnState {
                    connection: ConnectionState::Disconnected,
                    reconnect_attempts: 0,
                    outbound: None,
                    epoch: 0,
                }),
            }),
        }
    }

    /// Start connecting. Idempotent: a no-op while a connection attempt is
    /// in flight or the client is already connected.
    pub fn connect(&self) {
        let epoch = {
            let mut state = self.inner.state();
            if state.connection != ConnectionState::Disconnected {
                tracing::debug!(state = ?state.connection, "relay connect ignored");
                return;
            }
            state.connection = ConnectionState::Connecting;
            state.epoch
        };
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            drive_connection(inner, epoch).await;
        });
    }

    /// Send a message to the relay endpoint.
    ///
    /// Delivers only while connected; otherwise the message is logged and
    /// dropped. At-most-once: there is no outbound queueing or retry.
    pub fn send<T: Serialize>(&self, message: &T) {
        let state = self.inner.state();
        let Some(tx) = state
            .outbound
            .as_ref()
            .filter(|_| state.connection == ConnectionState::Connected)
        else {
            tracing::warn!("relay is not connected; dropping outbound message");
            return;
        };
        match serde_json::to_string(message) {
            Ok(raw) => {
                if tx.send(Message::Text(raw)).is_err() {
                    tracing::warn!("relay writer is gone; dropping outbound message");
                }
            }
            Err(err) => tracing::error!(error = %err, "failed to serialize outbound relay message"),
        }
    }

    /// Full teardown: close the connection, cancel any scheduled reconnect,
    /// and clear every handler registration.
    pub fn disconnect(&self) {
        {
            let mut state = self.inner.state();
            state.epoch += 1;
            state.connection = ConnectionState::Disconnected;
            // Dropping the sender ends the writer task, closing the socket.
            state.outbound = None;
        }
        self.inner.bus.clear();
        tracing::info!("relay disconnected");
    }

    /// Register a handler for one event type. See [`EventBus::on`].
    pub fn on<F>(&self, event_type: EventType, handler: F) -> SubscriptionId
    where
        F: Fn(&ScrapingEvent) + Send + Sync + 'static,
    {
        self.inner.bus.on(event_type, handler)
    }

    /// Unregister a handler. See [`EventBus::off`].
    pub fn off(&self, event_type: EventType, id: SubscriptionId) -> bool {
        self.inner.bus.off(event_type, id)
    }

    /// The shared fan-out bus.
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state().connection
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Failed cycles since the last successful connect.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.state().reconnect_attempts
    }
}

impl std::fmt::Debug for RelayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayClient")
            .field("url", &self.inner.config.url)
            .field("state", &self.inner.state().connection)
            .finish()
    }
}

/// Delay before the Nth reconnect attempt (N starting at 1).
fn reconnect_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}

/// Run one connection cycle: handshake, pump frames, then hand off to the
/// close path. The caller has already moved the state to `Connecting`.
async fn drive_connection(inner: Arc<ClientInner>, epoch: u64) {
    let stream = match connect_async(inner.config.url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(err) => {
            tracing::warn!(
                error = %RelayError::Connect(err.to_string()),
                url = %inner.config.url,
                "relay connect attempt failed"
            );
            on_closed(&inner, epoch);
            return;
        }
    };

    let (mut write, mut read) = stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    {
        let mut state = inner.state();
        if state.epoch != epoch {
            // disconnect() raced the handshake; drop the fresh connection.
            return;
        }
        state.connection = ConnectionState::Connected;
        state.reconnect_attempts = 0;
        state.outbound = Some(tx);
    }
    tracing::info!(url = %inner.config.url, "relay connected");
    inner.bus.emit(&ScrapingEvent::synthetic(EventType::Connected));

    // Writer: drains the outbound queue until teardown drops the sender.
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if write.send(message).await.is_err() {
                break;
            }
        }
        let _ = write.close().await;
    });

    // Reader: owns inbound ordering. Emitting synchronously per frame keeps
    // handlers observing events in relay-delivery order.
    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(raw)) => match serde_json::from_str::<ScrapingEvent>(&raw) {
                Ok(event) => inner.bus.emit(&event),
                Err(err) => {
                    tracing::error!(
                        error = %RelayError::Payload(err),
                        "dropping malformed relay frame"
                    );
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // ping/pong/binary: nothing to deliver
            Err(err) => {
                tracing::warn!(error = %RelayError::Transport(err.to_string()), "relay stream error");
                break;
            }
        }
    }

    writer.abort();
    on_closed(&inner, epoch);
}

/// Handle an unsolicited close or failed attempt: emit `disconnected` and
/// schedule the next cycle unless the circuit breaker has opened.
fn on_closed(inner: &Arc<ClientInner>, epoch: u64) {
    {
        let mut state = inner.state();
        if state.epoch != epoch {
            // Explicit disconnect already tore this cycle down.
            return;
        }
        state.connection = ConnectionState::Disconnected;
        state.outbound = None;
    }
    inner.bus.emit(&ScrapingEvent::synthetic(EventType::Disconnected));
    schedule_reconnect(inner, epoch);
}

fn schedule_reconnect(inner: &Arc<ClientInner>, epoch: u64) {
    let (attempt, delay) = {
        let mut state = inner.state();
        if state.epoch != epoch {
            return;
        }
        if state.reconnect_attempts >= inner.config.max_reconnect_attempts {
            tracing::warn!(
                attempts = state.reconnect_attempts,
                "relay reconnect attempts exhausted; waiting for an explicit connect"
            );
            return;
        }
        state.reconnect_attempts += 1;
        let attempt = state.reconnect_attempts;
        (attempt, reconnect_delay(inner.config.base_delay, attempt))
    };

    tracing::info!(
        attempt,
        delay_ms = delay.as_millis() as u64,
        "scheduling relay reconnect"
    );

    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        sleep(delay).await;
        let proceed = {
            let mut state = inner.state();
            if state.epoch != epoch || state.connection != ConnectionState::Disconnected {
                false
            } else {
                state.connection = ConnectionState::Connecting;
                true
            }
        };
        if proceed {
            drive_connection(inner, epoch).await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_delay_doubles_per_attempt() {
        let base = Duration::from_secs(1);
        assert_eq!(reconnect_delay(base, 1), Duration::from_secs(1));
        assert_eq!(reconnect_delay(base, 2), Duration::from_secs(2));
        assert_eq!(reconnect_delay(base, 3), Duration::from_secs(4));
        assert_eq!(reconnect_delay(base, 4), Duration::from_secs(8));
        assert_eq!(reconnect_delay(base, 5), Duration::from_secs(16));
    }

    #[test]
    fn config_defaults_match_the_circuit_breaker_contract() {
        let config = RelayConfig::new("ws://localhost:3001/ws");
        assert_eq!(config.base_delay, Duration::from_secs(1));
        assert_eq!(config.max_reconnect_attempts, 5);
    }
}

//! Integration tests for the relay client against a local WebSocket server.
//!
//! Exercises the connection lifecycle end-to-end: event delivery, outbound
//! sends, the exponential backoff schedule, and the reconnect circuit
//! breaker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use relay::{ConnectionState, EventType, RelayClient, RelayConfig, ScrapingEvent};

/// Poll `predicate` until it holds or the deadline passes.
async fn wait_until<F: Fn() -> bool>(deadline: Duration, predicate: F) -> bool {
    let step = Duration::from_millis(10);
    let mut waited = Duration::ZERO;
    while waited < deadline {
        if predicate() {
            return true;
        }
        sleep(step).await;
        waited += step;
    }
    predicate()
}

fn test_config(addr: std::net::SocketAddr) -> RelayConfig {
    let mut config = RelayConfig::new(format!("ws://{addr}"));
    config.base_delay = Duration::from_millis(10);
    config
}

#[tokio::test(flavor = "multi_thread")]
async fn delivers_events_sends_messages_and_tears_down() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));
    let (server_rx_tx, mut server_rx) = mpsc::unbounded_channel::<String>();

    // Server: greet each client with one event, then forward inbound text
    // frames to the test.
    let server_accepts = Arc::clone(&accepts);
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            server_accepts.fetch_add(1, Ordering::SeqCst);
            let forward = server_rx_tx.clone();
            tokio::spawn(async move {
                let mut ws = accept_async(stream).await.unwrap();
                let greeting =
                    serde_json::to_string(&ScrapingEvent::scraping_started("Printables")).unwrap();
                ws.send(Message::Text(greeting)).await.unwrap();
                while let Some(Ok(frame)) = ws.next().await {
                    if let Message::Text(raw) = frame {
                        let _ = forward.send(raw);
                    }
                }
            });
        }
    });

    let client = RelayClient::open(test_config(addr));
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ScrapingEvent>();
    client.on(EventType::ScrapingStarted, move |event| {
        let _ = event_tx.send(event.clone());
    });
    let connected = Arc::new(AtomicUsize::new(0));
    let connected_count = Arc::clone(&connected);
    client.on(EventType::Connected, move |_| {
        connected_count.fetch_add(1, Ordering::SeqCst);
    });

    client.connect();

    let greeting = timeout(Duration::from_secs(2), event_rx.recv())
        .await
        .expect("no event within deadline")
        .expect("event channel closed");
    assert_eq!(greeting.data.platform.as_deref(), Some("Printables"));
    assert_eq!(connected.load(Ordering::SeqCst), 1);
    assert!(client.is_connected());
    assert_eq!(client.reconnect_attempts(), 0);

    // connect() is idempotent while connected: no second socket.
    client.connect();
    sleep(Duration::from_millis(100)).await;
    assert_eq!(accepts.load(Ordering::SeqCst), 1);

    // Outbound messages reach the relay while connected.
    client.send(&ScrapingEvent::scraping_completed("Printables", 7, 0));
    let echoed = timeout(Duration::from_secs(2), server_rx.recv())
        .await
        .expect("server saw no message")
        .expect("server channel closed");
    let parsed: ScrapingEvent = serde_json::from_str(&echoed).unwrap();
    assert_eq!(parsed.event_type, EventType::ScrapingCompleted);
    assert_eq!(parsed.data.success_count, Some(7));

    // Full teardown: state drops, registrations are cleared, no reconnect.
    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(client.bus().subscriber_count(EventType::ScrapingStarted), 0);
    sleep(Duration::from_millis(200)).await;
    assert_eq!(accepts.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn send_while_disconnected_drops_without_panicking() {
    // Nothing is listening; the client never connects.
    let client = RelayClient::open(RelayConfig::new("ws://127.0.0.1:9/ws"));
    client.send(&ScrapingEvent::scraping_started("Thangs"));
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test(flavor = "multi_thread")]
async fn circuit_breaker_stops_after_max_attempts() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));

    // Server: accept the TCP connection and immediately drop it, failing the
    // WebSocket handshake every time.
    let server_accepts = Arc::clone(&accepts);
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            server_accepts.fetch_add(1, Ordering::SeqCst);
            drop(stream);
        }
    });

    let client = RelayClient::open(test_config(addr));
    let disconnects = Arc::new(AtomicUsize::new(0));
    let disconnect_count = Arc::clone(&disconnects);
    client.on(EventType::Disconnected, move |_| {
        disconnect_count.fetch_add(1, Ordering::SeqCst);
    });

    client.connect();

    // Initial attempt plus five reconnect cycles.
    let saw_all = wait_until(Duration::from_secs(5), || {
        accepts.load(Ordering::SeqCst) >= 6
    })
    .await;
    assert!(saw_all, "expected 6 connection attempts");

    // Circuit breaker: no further attempts without an explicit connect().
    sleep(Duration::from_millis(500)).await;
    assert_eq!(accepts.load(Ordering::SeqCst), 6);
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(client.reconnect_attempts(), 5);
    assert_eq!(disconnects.load(Ordering::SeqCst), 6);

    // An explicit connect() is the only way to resume.
    client.connect();
    let resumed = wait_until(Duration::from_secs(2), || {
        accepts.load(Ordering::SeqCst) >= 7
    })
    .await;
    assert!(resumed, "explicit connect should attempt again");
}

#[tokio::test(flavor = "multi_thread")]
async fn successful_reconnect_resets_the_attempt_counter() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));

    // Server: close the first connection right after the handshake, hold
    // every later one open.
    let server_accepts = Arc::clone(&accepts);
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let n = server_accepts.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::spawn(async move {
                let mut ws = accept_async(stream).await.unwrap();
                if n == 1 {
                    let _ = ws.close(None).await;
                } else {
                    while let Some(Ok(_)) = ws.next().await {}
                }
            });
        }
    });

    let client = RelayClient::open(test_config(addr));
    let disconnects = Arc::new(AtomicUsize::new(0));
    let disconnect_count = Arc::clone(&disconnects);
    client.on(EventType::Disconnected, move |_| {
        disconnect_count.fetch_add(1, Ordering::SeqCst);
    });

    client.connect();

    let reconnected = wait_until(Duration::from_secs(5), || {
        accepts.load(Ordering::SeqCst) >= 2 && client.is_connected()
    })
    .await;
    assert!(reconnected, "client should reconnect after unsolicited close");
    assert_eq!(client.reconnect_attempts(), 0);
    assert!(disconnects.load(Ordering::SeqCst) >= 1);
}

//! Realtime change feed for the `products` table.
//!
//! Speaks the Phoenix channel protocol (`vsn=1.0.0`, JSON object frames)
//! over a websocket: join `realtime:products_changes` with a
//! `postgres_changes` config, send a heartbeat every 30 seconds, and forward
//! every change event as a [`CatalogSignal`]. A dropped socket or a rejected
//! join ends the connection; the listener reconnects after a fixed delay and
//! signals `Resubscribed` so the catalog is re-read, since events may have
//! been missed while disconnected.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};

/// Channel topic for product changes.
pub const PRODUCTS_TOPIC: &str = "realtime:products_changes";

/// Interval between Phoenix heartbeats.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Delay before reconnecting after the socket drops.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Why the catalog should be re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSignal {
    /// A row was inserted, updated or deleted.
    Changed(ChangeKind),
    /// The subscription was re-established after a disconnect.
    Resubscribed,
}

/// Kind of row change reported by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A Phoenix channel frame.
#[derive(Debug, Serialize, Deserialize)]
struct PhoenixMessage {
    topic: String,
    event: String,
    payload: Value,
    #[serde(rename = "ref")]
    reference: Option<Value>,
}

/// Frames the listener cares about.
#[derive(Debug, PartialEq, Eq)]
enum Inbound {
    Change(ChangeKind),
    JoinReply { ok: bool },
    Closed,
    Other,
}

fn join_frame(table: &str, api_key: &str, reference: u64) -> String {
    let message = PhoenixMessage {
        topic: PRODUCTS_TOPIC.to_string(),
        event: "phx_join".to_string(),
        payload: json!({
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [
                    { "event": "*", "schema": "public", "table": table }
                ]
            },
            "access_token": api_key
        }),
        reference: Some(Value::String(reference.to_string())),
    };
    serde_json::to_string(&message).unwrap_or_default()
}

fn heartbeat_frame(reference: u64) -> String {
    let message = PhoenixMessage {
        topic: "phoenix".to_string(),
        event: "heartbeat".to_string(),
        payload: json!({}),
        reference: Some(Value::String(reference.to_string())),
    };
    serde_json::to_string(&message).unwrap_or_default()
}

fn decode_frame(text: &str) -> Inbound {
    let Ok(message) = serde_json::from_str::<PhoenixMessage>(text) else {
        return Inbound::Other;
    };

    match message.event.as_str() {
        "postgres_changes" => message
            .payload
            .pointer("/data/type")
            .cloned()
            .and_then(|kind| serde_json::from_value::<ChangeKind>(kind).ok())
            .map_or(Inbound::Other, Inbound::Change),
        "phx_reply" if message.topic == PRODUCTS_TOPIC => Inbound::JoinReply {
            ok: message.payload.get("status").and_then(Value::as_str) == Some("ok"),
        },
        "phx_error" | "phx_close" if message.topic == PRODUCTS_TOPIC => Inbound::Closed,
        _ => Inbound::Other,
    }
}

/// Why a Realtime connection ended early.
#[derive(Debug, Error)]
enum ListenError {
    #[error("websocket error: {0}")]
    Socket(#[from] tungstenite::Error),

    #[error("subscription rejected: {0}")]
    Rejected(String),
}

/// Background listener that turns product changes into catalog signals.
#[derive(Clone)]
pub struct ProductListener {
    url: String,
    api_key: String,
    reconnect_delay: Duration,
}

impl ProductListener {
    /// Listener for the Realtime websocket at `url`.
    #[must_use]
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    /// Wait `delay` before reconnecting (defaults to 5 seconds).
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Spawn the listener.
    ///
    /// Runs until `signals` is closed. Connection failures and rejected
    /// subscriptions are logged and retried after the reconnect delay.
    pub fn spawn(self, signals: mpsc::Sender<CatalogSignal>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut connected_before = false;
            loop {
                if signals.is_closed() {
                    break;
                }

                match listen(&self.url, &self.api_key, &signals, connected_before).await {
                    Ok(()) => tracing::info!("Realtime connection closed"),
                    Err(e) => tracing::warn!(error = %e, "Realtime connection failed"),
                }
                connected_before = true;

                tokio::time::sleep(self.reconnect_delay).await;
            }
        })
    }
}

/// Install the process-wide rustls provider if the binary has not.
fn ensure_crypto_provider() {
    if rustls::crypto::CryptoProvider::get_default().is_none() {
        // Losing a race with another installer is fine
        let _ = rustls::crypto::ring::default_provider().install_default();
    }
}

async fn listen(
    url: &str,
    api_key: &str,
    signals: &mpsc::Sender<CatalogSignal>,
    resubscribing: bool,
) -> Result<(), ListenError> {
    ensure_crypto_provider();
    let (socket, _) = tokio_tungstenite::connect_async(url).await?;
    let (mut write, mut read) = socket.split();
    let mut reference: u64 = 1;

    write
        .send(Message::Text(join_frame("products", api_key, reference).into()))
        .await?;

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    // The first tick completes immediately
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                reference += 1;
                write.send(Message::Text(heartbeat_frame(reference).into())).await?;
            }
            frame = read.next() => {
                let Some(frame) = frame else {
                    return Ok(());
                };
                let text = match frame? {
                    Message::Text(text) => text,
                    Message::Close(_) => return Ok(()),
                    _ => continue,
                };

                let signal = match decode_frame(text.as_str()) {
                    Inbound::Change(kind) => {
                        tracing::debug!(?kind, "Product change received");
                        CatalogSignal::Changed(kind)
                    }
                    Inbound::JoinReply { ok: true } => {
                        tracing::info!(topic = PRODUCTS_TOPIC, "Subscribed to product changes");
                        if !resubscribing {
                            continue;
                        }
                        CatalogSignal::Resubscribed
                    }
                    Inbound::JoinReply { ok: false } => {
                        return Err(ListenError::Rejected(text.as_str().to_string()));
                    }
                    Inbound::Closed => return Ok(()),
                    Inbound::Other => continue,
                };

                if signals.send(signal).await.is_err() {
                    return Ok(());
                }
            }
        }
    }
}

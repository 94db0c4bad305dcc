use anyhow::Result;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use mockall::automock;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

/// Event pushed by the live QR gateway over its WebSocket channel.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "transactionId")]
    pub transaction_id: String,
    pub status: Option<String>,
}

impl PushEvent {
    /// True when this event reports a completed payment for `transaction_id`.
    pub fn is_paid_for(&self, transaction_id: &str) -> bool {
        if self.transaction_id != transaction_id {
            return false;
        }
        match self.kind.as_str() {
            "payment_received" => true,
            "payment_status" => self.status.as_deref() == Some("paid"),
            _ => false,
        }
    }
}

/// Live payment channel. The receiver closes when the underlying connection
/// drops; reconnecting is the caller's job.
#[async_trait]
#[automock]
pub trait PushChannel: Send + Sync {
    async fn connect(&self, ws_url: &str) -> Result<mpsc::Receiver<PushEvent>>;
}

pub struct WsPushChannel;

#[async_trait]
impl PushChannel for WsPushChannel {
    async fn connect(&self, ws_url: &str) -> Result<mpsc::Receiver<PushEvent>> {
        let (ws, _) = connect_async(ws_url).await?;
        let (mut ws_sink, mut ws_stream) = ws.split();
        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            loop {
                match ws_stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<PushEvent>(&text) {
                            Ok(event) => {
                                if tx.send(event).await.is_err() {
                                    // Receiver dropped; watcher is gone.
                                    break;
                                }
                            }
                            Err(err) => {
                                debug!(error = %err, payload = %text, "live channel: unparseable message");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("live channel: connection closed");
                        break;
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, "live channel: websocket error");
                        break;
                    }
                    _ => {}
                }
            }
            // Dropping `tx` closes the receiver, signalling disconnect upstream.
        });

        Ok(rx)
    }
}

//! WebSocket relay to the local processor.
//!
//! Protocol (JSON text frames):
//! * → `{"type": "INIT", "inputs": …, "output": …}`
//! * ← `{"type": "ACK", "message": …}` or `{"type": "ERROR", …}`
//! * → `{"type": "KEEPALIVE"}` every 20 s while the processor works
//! * ← `{"type": "COMPLETE", "message": …}` once it is done

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use super::{OutputSink, SinkReply};
use crate::core::types::DeliveryPayload;

const KEEPALIVE_EVERY: Duration = Duration::from_secs(20);
const ACK_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct RelayMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: Option<String>,
}

fn parse_frame(msg: &Message) -> Option<RelayMessage> {
    match msg {
        Message::Text(t) => serde_json::from_str(t.as_str()).ok(),
        _ => None,
    }
}

pub struct RelaySink {
    url: String,
    keepalive: Duration,
    completion: Mutex<Option<oneshot::Receiver<String>>>,
}

impl RelaySink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            keepalive: KEEPALIVE_EVERY,
            completion: Mutex::new(None),
        }
    }

    pub fn with_keepalive(mut self, every: Duration) -> Self {
        self.keepalive = every;
        self
    }
}

#[async_trait]
impl OutputSink for RelaySink {
    async fn deliver(&self, payload: &DeliveryPayload) -> Result<SinkReply> {
        let (socket, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| anyhow!("relay: connect to {} failed: {}", self.url, e))?;
        info!("relay: connected to {}", self.url);
        let (mut write, mut read) = socket.split();

        let mut init = serde_json::to_value(payload)?;
        init["type"] = serde_json::Value::from("INIT");
        write
            .send(Message::text(init.to_string()))
            .await
            .map_err(|e| anyhow!("relay: send failed: {}", e))?;

        let first = tokio::time::timeout(ACK_TIMEOUT, async {
            while let Some(frame) = read.next().await {
                let frame = frame.map_err(|e| anyhow!("relay: read failed: {}", e))?;
                if let Some(msg) = parse_frame(&frame) {
                    match msg.kind.as_str() {
                        "ACK" | "ERROR" => return Ok(msg),
                        other => warn!("relay: ignoring '{}' before acknowledgement", other),
                    }
                }
            }
            Err(anyhow!("relay: channel closed before acknowledgement"))
        })
        .await
        .map_err(|_| anyhow!("relay: no acknowledgement within {:?}", ACK_TIMEOUT))??;

        if first.kind == "ERROR" {
            let message = first.message.unwrap_or_else(|| "relay error".to_string());
            warn!("relay: processor refused payload: {}", message);
            let _ = write.close().await;
            return Ok(SinkReply::Error { message });
        }

        let (done_tx, done_rx) = oneshot::channel();
        let keepalive = self.keepalive;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(keepalive);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let ping = serde_json::json!({"type": "KEEPALIVE"}).to_string();
                        if let Err(e) = write.send(Message::text(ping)).await {
                            warn!("relay: keepalive failed: {}", e);
                            break;
                        }
                    }
                    frame = read.next() => {
                        match frame {
                            Some(Ok(frame)) => {
                                if let Some(msg) = parse_frame(&frame) {
                                    if msg.kind == "COMPLETE" {
                                        let _ = done_tx.send(msg.message.unwrap_or_default());
                                        let _ = write.close().await;
                                        break;
                                    }
                                }
                            }
                            Some(Err(e)) => {
                                warn!("relay: channel error: {}", e);
                                break;
                            }
                            None => {
                                info!("relay: connection closed");
                                break;
                            }
                        }
                    }
                }
            }
        });
        *self.completion.lock().await = Some(done_rx);

        Ok(SinkReply::Ack {
            message: first
                .message
                .unwrap_or_else(|| "job queued at server-side. processing...".to_string()),
        })
    }

    async fn completion(&self) -> Option<String> {
        let rx = self.completion.lock().await.take()?;
        rx.await.ok()
    }
}

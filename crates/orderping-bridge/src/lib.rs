// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp bridge transport for the Orderping delivery engine.
//!
//! Implements [`Transport`] against an external bridge daemon that owns the
//! actual multi-device protocol (and all of its cryptography), speaking
//! line-delimited JSON-RPC over TCP. One socket per opened session: requests
//! flow out (`open`, `send_text`, `send_media`, `close`), responses and
//! lifecycle notifications flow back on the same stream.

pub mod protocol;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use orderping_config::model::{BridgeConfig, SessionConfig};
use orderping_core::types::{AdapterType, CredentialSet, HealthStatus, MessageId, TransportEvent};
use orderping_core::{
    OrderpingError, PluginAdapter, Transport, TransportHandle, TransportLink,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, info, warn};

use protocol::{RpcFrame, RpcRequest, notification_to_event};

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<Result<serde_json::Value, String>>>>>;

/// Transport implementation backed by the bridge daemon.
pub struct BridgeTransport {
    bridge: BridgeConfig,
    session: SessionConfig,
}

impl BridgeTransport {
    pub fn new(bridge: BridgeConfig, session: SessionConfig) -> Self {
        Self { bridge, session }
    }
}

#[async_trait]
impl PluginAdapter for BridgeTransport {
    fn name(&self) -> &str {
        "bridge"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, OrderpingError> {
        // A TCP connect proves the daemon is listening; no session is opened.
        match TcpStream::connect(&self.bridge.address).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "bridge daemon unreachable at {}: {e}",
                self.bridge.address
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), OrderpingError> {
        Ok(())
    }
}

#[async_trait]
impl Transport for BridgeTransport {
    async fn open(
        &self,
        credentials: CredentialSet,
    ) -> Result<TransportHandle, OrderpingError> {
        let stream = TcpStream::connect(&self.bridge.address)
            .await
            .map_err(|e| OrderpingError::Transport {
                message: format!("bridge connect to {} failed: {e}", self.bridge.address),
                source: Some(Box::new(e)),
            })?;
        let (read_half, write_half) = stream.into_split();

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (events_tx, events_rx) = mpsc::channel(64);

        // Reader task: routes responses to their waiters and notifications
        // into the event stream, until the socket closes.
        {
            let pending = Arc::clone(&pending);
            let events_tx = events_tx.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(read_half).lines();
                loop {
                    match lines.next_line().await {
                        Ok(Some(line)) => {
                            let frame: RpcFrame = match serde_json::from_str(&line) {
                                Ok(frame) => frame,
                                Err(e) => {
                                    warn!(error = %e, "bridge sent an unparseable frame");
                                    continue;
                                }
                            };
                            if let Some(id) = frame.id {
                                let outcome = match frame.error {
                                    Some(error) => Err(error.message),
                                    None => Ok(frame.result.unwrap_or(serde_json::Value::Null)),
                                };
                                if let Some(waiter) = pending.lock().await.remove(&id) {
                                    let _ = waiter.send(outcome);
                                }
                            } else if let Some(method) = frame.method.as_deref() {
                                if let Some(event) = notification_to_event(method, &frame.params) {
                                    if events_tx.send(event).await.is_err() {
                                        break; // Session driver is gone.
                                    }
                                } else {
                                    debug!(method = %method, "ignoring unknown bridge notification");
                                }
                            }
                        }
                        Ok(None) | Err(_) => break,
                    }
                }
                // Socket gone: fail every in-flight call.
                for (_, waiter) in pending.lock().await.drain() {
                    let _ = waiter.send(Err("bridge connection lost".to_string()));
                }
                debug!("bridge reader task ended");
            });
        }

        let link = Arc::new(BridgeLink {
            writer: Mutex::new(write_half),
            pending,
        });

        // Ask the daemon to start the protocol session. The reply only
        // acknowledges the request; connection-open arrives as a
        // notification once the handshake finishes.
        link.call(
            "open",
            serde_json::json!({
                "credentials": credentials,
                "connect_timeout_secs": self.session.connect_timeout_secs,
                "keepalive_secs": self.session.keepalive_secs,
            }),
        )
        .await?;

        info!(address = %self.bridge.address, "bridge session requested");
        Ok(TransportHandle {
            events: events_rx,
            link,
        })
    }
}

/// Send surface over one bridge socket.
pub struct BridgeLink {
    writer: Mutex<OwnedWriteHalf>,
    pending: PendingMap,
}

impl BridgeLink {
    /// Issue one JSON-RPC call and await its response.
    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, OrderpingError> {
        let id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        let mut line = serde_json::to_string(&RpcRequest::new(id.clone(), method, params))
            .map_err(|e| OrderpingError::Internal(format!("request encode failed: {e}")))?;
        line.push('\n');

        {
            let mut writer = self.writer.lock().await;
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                self.pending.lock().await.remove(&id);
                return Err(OrderpingError::Transport {
                    message: format!("bridge write failed: {e}"),
                    source: Some(Box::new(e)),
                });
            }
        }

        // Bound the wait so a silent daemon cannot wedge a send forever.
        let timeout = Duration::from_secs(120);
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(result))) => Ok(result),
            Ok(Ok(Err(message))) => Err(OrderpingError::Transport {
                message: format!("bridge call {method} failed: {message}"),
                source: None,
            }),
            Ok(Err(_)) => Err(OrderpingError::Transport {
                message: "bridge connection lost".to_string(),
                source: None,
            }),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(OrderpingError::Timeout { duration: timeout })
            }
        }
    }

    fn message_id_from(result: serde_json::Value) -> MessageId {
        MessageId(
            result
                .get("message_id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        )
    }
}

#[async_trait]
impl TransportLink for BridgeLink {
    async fn send_text(
        &self,
        recipient: &str,
        body: &str,
    ) -> Result<MessageId, OrderpingError> {
        let result = self
            .call(
                "send_text",
                serde_json::json!({"recipient": recipient, "body": body}),
            )
            .await?;
        Ok(Self::message_id_from(result))
    }

    async fn send_media(
        &self,
        recipient: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> Result<MessageId, OrderpingError> {
        use base64::Engine as _;
        let payload = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let result = self
            .call(
                "send_media",
                serde_json::json!({
                    "recipient": recipient,
                    "payload": payload,
                    "caption": caption,
                }),
            )
            .await?;
        Ok(Self::message_id_from(result))
    }

    async fn close(&self) -> Result<(), OrderpingError> {
        let result = self.call("close", serde_json::json!({})).await;
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
        result.map(|_| ())
    }
}

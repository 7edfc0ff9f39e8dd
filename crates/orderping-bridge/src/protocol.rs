// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire frames for the bridge daemon's line-delimited JSON-RPC dialect.
//!
//! Two frame shapes share the stream: responses (carrying the `id` of the
//! request they answer) and notifications (carrying a `method`). Lifecycle
//! notifications map onto [`TransportEvent`] values.

use orderping_core::types::{CloseReason, CredentialSet, TransportEvent};
use serde::{Deserialize, Serialize};

/// An outgoing request frame.
#[derive(Debug, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub id: String,
    pub method: String,
    pub params: serde_json::Value,
}

impl RpcRequest {
    pub fn new(id: String, method: &str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// Any incoming frame: a response when `id` is set, otherwise a notification.
#[derive(Debug, Deserialize)]
pub struct RpcFrame {
    pub id: Option<String>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Map a notification frame onto a transport event.
///
/// Unknown methods return `None` and are skipped; the daemon may grow
/// notifications this engine does not care about.
pub fn notification_to_event(method: &str, params: &serde_json::Value) -> Option<TransportEvent> {
    match method {
        "pairing_code" => params
            .get("code")
            .and_then(|c| c.as_str())
            .map(|code| TransportEvent::PairingCode(code.to_string())),
        "connection_open" => Some(TransportEvent::Opened),
        "connection_closed" => {
            let logged_out = params
                .get("logged_out")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            let reason = if logged_out {
                CloseReason::LoggedOut
            } else {
                CloseReason::Transient(
                    params
                        .get("reason")
                        .and_then(|r| r.as_str())
                        .unwrap_or("connection closed")
                        .to_string(),
                )
            };
            Some(TransportEvent::Closed(reason))
        }
        "credentials" => serde_json::from_value::<CredentialSet>(params.clone())
            .ok()
            .map(|creds| TransportEvent::CredentialsChanged(Box::new(creds))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_with_jsonrpc_marker() {
        let req = RpcRequest::new(
            "req-1".to_string(),
            "send_text",
            serde_json::json!({"recipient": "15550001111", "body": "hi"}),
        );
        let line = serde_json::to_string(&req).unwrap();
        assert!(line.contains(r#""jsonrpc":"2.0""#));
        assert!(line.contains(r#""method":"send_text""#));
    }

    #[test]
    fn response_frame_parses() {
        let frame: RpcFrame = serde_json::from_str(
            r#"{"id":"req-1","result":{"message_id":"3EB0"}}"#,
        )
        .unwrap();
        assert_eq!(frame.id.as_deref(), Some("req-1"));
        assert!(frame.result.is_some());
        assert!(frame.error.is_none());
    }

    #[test]
    fn error_frame_parses() {
        let frame: RpcFrame = serde_json::from_str(
            r#"{"id":"req-2","error":{"code":-32000,"message":"not connected"}}"#,
        )
        .unwrap();
        let error = frame.error.unwrap();
        assert_eq!(error.code, -32000);
        assert_eq!(error.message, "not connected");
    }

    #[test]
    fn pairing_code_notification_maps() {
        let event = notification_to_event(
            "pairing_code",
            &serde_json::json!({"code": "ABCD-1234"}),
        )
        .unwrap();
        assert!(matches!(event, TransportEvent::PairingCode(code) if code == "ABCD-1234"));
    }

    #[test]
    fn connection_open_notification_maps() {
        let event = notification_to_event("connection_open", &serde_json::json!({})).unwrap();
        assert!(matches!(event, TransportEvent::Opened));
    }

    #[test]
    fn closed_notification_distinguishes_logout() {
        let transient = notification_to_event(
            "connection_closed",
            &serde_json::json!({"logged_out": false, "reason": "stream error"}),
        )
        .unwrap();
        assert!(matches!(
            transient,
            TransportEvent::Closed(CloseReason::Transient(r)) if r == "stream error"
        ));

        let terminal = notification_to_event(
            "connection_closed",
            &serde_json::json!({"logged_out": true}),
        )
        .unwrap();
        assert!(matches!(
            terminal,
            TransportEvent::Closed(CloseReason::LoggedOut)
        ));
    }

    #[test]
    fn credentials_notification_round_trips_key_material() {
        let creds = CredentialSet::fresh();
        let params = serde_json::to_value(&creds).unwrap();
        let event = notification_to_event("credentials", &params).unwrap();
        match event {
            TransportEvent::CredentialsChanged(decoded) => assert_eq!(*decoded, creds),
            other => panic!("expected credentials event, got {other:?}"),
        }
    }

    #[test]
    fn unknown_notification_is_skipped() {
        assert!(notification_to_event("typing", &serde_json::json!({})).is_none());
    }
}

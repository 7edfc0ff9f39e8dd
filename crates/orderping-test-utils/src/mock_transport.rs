// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic session and delivery tests.
//!
//! `MockTransport` implements [`Transport`] with scripted open failures,
//! captured credentials per open, and per-session handles that let tests
//! emit lifecycle events and inspect sent messages.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use orderping_core::types::{
    AdapterType, CredentialSet, HealthStatus, MessageId, TransportEvent,
};
use orderping_core::{
    CloseReason, OrderpingError, PluginAdapter, Transport, TransportHandle, TransportLink,
};

/// One message captured by a [`MockLink`].
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub recipient: String,
    pub body: String,
    pub media: Option<Vec<u8>>,
}

/// Send surface handed out by [`MockTransport::open`].
///
/// Captures every send; `fail_sends` makes subsequent sends error, for
/// retry-path tests.
pub struct MockLink {
    sent: Mutex<Vec<SentMessage>>,
    fail_sends: Mutex<Option<String>>,
    closed: AtomicBool,
}

impl MockLink {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_sends: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// All messages sent through this link, in send order.
    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Make every subsequent send fail with the given error text.
    pub async fn fail_sends(&self, message: &str) {
        *self.fail_sends.lock().await = Some(message.to_string());
    }

    /// Restore successful sends.
    pub async fn allow_sends(&self) {
        *self.fail_sends.lock().await = None;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn record(&self, msg: SentMessage) -> Result<MessageId, OrderpingError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(OrderpingError::Transport {
                message: "link is closed".to_string(),
                source: None,
            });
        }
        if let Some(error) = self.fail_sends.lock().await.clone() {
            return Err(OrderpingError::Transport {
                message: error,
                source: None,
            });
        }
        self.sent.lock().await.push(msg);
        Ok(MessageId(format!("mock-msg-{}", uuid::Uuid::new_v4())))
    }
}

#[async_trait]
impl TransportLink for MockLink {
    async fn send_text(
        &self,
        recipient: &str,
        body: &str,
    ) -> Result<MessageId, OrderpingError> {
        self.record(SentMessage {
            recipient: recipient.to_string(),
            body: body.to_string(),
            media: None,
        })
        .await
    }

    async fn send_media(
        &self,
        recipient: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> Result<MessageId, OrderpingError> {
        self.record(SentMessage {
            recipient: recipient.to_string(),
            body: caption.to_string(),
            media: Some(bytes),
        })
        .await
    }

    async fn close(&self) -> Result<(), OrderpingError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// One opened mock session: the event sender plus the captured inputs.
pub struct MockSession {
    events_tx: mpsc::Sender<TransportEvent>,
    /// Credentials the session was opened with.
    pub credentials: CredentialSet,
    pub link: Arc<MockLink>,
}

impl MockSession {
    /// Emit a lifecycle event into the session's event stream.
    pub async fn emit(&self, event: TransportEvent) {
        // Ignore send errors: the driver may already have ended.
        let _ = self.events_tx.send(event).await;
    }

    /// Simulate the operator scanning the pairing code: rotate credentials
    /// to a paired identity, then confirm the connection.
    pub async fn complete_pairing(&self, account_jid: &str) {
        let mut creds = self.credentials.clone();
        creds.account_jid = Some(account_jid.to_string());
        creds.device_identity = Some(vec![0x0A, 0x0B, 0x0C]);
        self.emit(TransportEvent::CredentialsChanged(Box::new(creds)))
            .await;
        self.emit(TransportEvent::Opened).await;
    }

    /// Simulate a transient network drop.
    pub async fn drop_connection(&self, reason: &str) {
        self.emit(TransportEvent::Closed(CloseReason::Transient(
            reason.to_string(),
        )))
        .await;
    }

    /// Simulate a remote sign-out.
    pub async fn logout(&self) {
        self.emit(TransportEvent::Closed(CloseReason::LoggedOut)).await;
    }
}

/// Mock implementation of [`Transport`].
///
/// By default every `open` succeeds and emits one automatic event based on
/// the credentials: `Opened` for a paired identity, a pairing code for a
/// fresh one -- mirroring how the real protocol behaves. Tests drive
/// everything after that through [`MockSession::emit`].
pub struct MockTransport {
    auto_events: bool,
    fail_opens: Mutex<VecDeque<String>>,
    sessions: Mutex<Vec<Arc<MockSession>>>,
    open_count: AtomicUsize,
}

impl MockTransport {
    /// Automatic first events on open (the common case).
    pub fn new() -> Self {
        Self {
            auto_events: true,
            fail_opens: Mutex::new(VecDeque::new()),
            sessions: Mutex::new(Vec::new()),
            open_count: AtomicUsize::new(0),
        }
    }

    /// No automatic events; tests emit everything explicitly.
    pub fn manual() -> Self {
        Self {
            auto_events: false,
            ..Self::new()
        }
    }

    /// Script the next `open` call to fail with the given error text.
    pub async fn fail_next_open(&self, message: &str) {
        self.fail_opens.lock().await.push_back(message.to_string());
    }

    /// How many times `open` was called.
    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::SeqCst)
    }

    /// The `i`-th opened session.
    pub async fn session(&self, i: usize) -> Option<Arc<MockSession>> {
        self.sessions.lock().await.get(i).cloned()
    }

    /// The most recently opened session.
    pub async fn last_session(&self) -> Option<Arc<MockSession>> {
        self.sessions.lock().await.last().cloned()
    }

    /// Wait until `open` has been called at least `count` times.
    ///
    /// Polls instead of blocking so tests can await a session driver's
    /// reconnect without racing its spawn.
    pub async fn wait_for_opens(&self, count: usize) {
        while self.open_count() < count {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, OrderpingError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), OrderpingError> {
        Ok(())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(
        &self,
        credentials: CredentialSet,
    ) -> Result<TransportHandle, OrderpingError> {
        let n = self.open_count.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.fail_opens.lock().await.pop_front() {
            return Err(OrderpingError::Transport {
                message,
                source: None,
            });
        }

        let (events_tx, events_rx) = mpsc::channel(64);
        let link = Arc::new(MockLink::new());

        if self.auto_events {
            let first = if credentials.is_paired() {
                TransportEvent::Opened
            } else {
                TransportEvent::PairingCode(format!("MOCK-{n:04}"))
            };
            let _ = events_tx.send(first).await;
        }

        let session = Arc::new(MockSession {
            events_tx,
            credentials,
            link: Arc::clone(&link),
        });
        self.sessions.lock().await.push(session);

        Ok(TransportHandle {
            events: events_rx,
            link,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_emits_pairing_code_for_fresh_credentials() {
        let transport = MockTransport::new();
        let mut handle = transport.open(CredentialSet::fresh()).await.unwrap();
        match handle.events.recv().await.unwrap() {
            TransportEvent::PairingCode(code) => assert!(code.starts_with("MOCK-")),
            other => panic!("expected pairing code, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn open_emits_opened_for_paired_credentials() {
        let transport = MockTransport::new();
        let mut creds = CredentialSet::fresh();
        creds.account_jid = Some("15550001111@s.whatsapp.net".to_string());
        let mut handle = transport.open(creds).await.unwrap();
        assert!(matches!(
            handle.events.recv().await.unwrap(),
            TransportEvent::Opened
        ));
    }

    #[tokio::test]
    async fn scripted_open_failure_consumes_once() {
        let transport = MockTransport::new();
        transport.fail_next_open("daemon unreachable").await;

        assert!(transport.open(CredentialSet::fresh()).await.is_err());
        assert!(transport.open(CredentialSet::fresh()).await.is_ok());
        assert_eq!(transport.open_count(), 2);
    }

    #[tokio::test]
    async fn link_captures_sends_and_can_fail() {
        let transport = MockTransport::manual();
        let handle = transport.open(CredentialSet::fresh()).await.unwrap();

        handle.link.send_text("15550001111", "hello").await.unwrap();
        let session = transport.last_session().await.unwrap();
        assert_eq!(session.link.sent_count().await, 1);

        session.link.fail_sends("rate limited").await;
        let err = handle.link.send_text("15550001111", "again").await;
        assert!(err.is_err());
        assert_eq!(session.link.sent_count().await, 1);
    }

    #[tokio::test]
    async fn closed_link_rejects_sends() {
        let transport = MockTransport::manual();
        let handle = transport.open(CredentialSet::fresh()).await.unwrap();
        handle.link.close().await.unwrap();
        assert!(handle.link.send_text("15550001111", "late").await.is_err());
    }

    #[tokio::test]
    async fn complete_pairing_rotates_credentials_then_opens() {
        let transport = MockTransport::new();
        let mut handle = transport.open(CredentialSet::fresh()).await.unwrap();

        // Skip the automatic pairing code.
        handle.events.recv().await.unwrap();

        let session = transport.last_session().await.unwrap();
        session.complete_pairing("15550001111@s.whatsapp.net").await;

        match handle.events.recv().await.unwrap() {
            TransportEvent::CredentialsChanged(creds) => assert!(creds.is_paired()),
            other => panic!("expected credential rotation, got {other:?}"),
        }
        assert!(matches!(
            handle.events.recv().await.unwrap(),
            TransportEvent::Opened
        ));
    }
}

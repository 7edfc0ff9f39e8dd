// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport trait for the underlying multi-device messaging capability.
//!
//! The protocol client (including all of its cryptography) lives behind this
//! seam: callers hand in stored credentials and get back an event stream and
//! a send surface. The session manager adapts the event stream into discrete
//! state-machine inputs.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::OrderpingError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CredentialSet, MessageId, TransportEvent};

/// The send/close surface of one live protocol session.
///
/// Held behind an `Arc` in the session registry; sends for the same tenant
/// may run concurrently.
#[async_trait]
pub trait TransportLink: Send + Sync {
    /// Sends a plain text message to the given recipient.
    async fn send_text(&self, recipient: &str, body: &str)
    -> Result<MessageId, OrderpingError>;

    /// Sends a media payload with an accompanying caption.
    async fn send_media(
        &self,
        recipient: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> Result<MessageId, OrderpingError>;

    /// Tears down the session. Further sends fail.
    async fn close(&self) -> Result<(), OrderpingError>;
}

/// Everything [`Transport::open`] hands back: the session's event stream
/// plus its send surface.
pub struct TransportHandle {
    /// Connection lifecycle and credential-update events, in emission order.
    /// The stream ends when the session is torn down.
    pub events: mpsc::Receiver<TransportEvent>,
    pub link: Arc<dyn TransportLink>,
}

impl std::fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportHandle").finish_non_exhaustive()
    }
}

/// Factory for protocol sessions.
///
/// `open` never blocks on pairing: with unpaired credentials it returns a
/// handle whose event stream will carry the pairing challenge.
#[async_trait]
pub trait Transport: PluginAdapter {
    /// Opens a session using the given credential material.
    async fn open(&self, credentials: CredentialSet)
    -> Result<TransportHandle, OrderpingError>;
}

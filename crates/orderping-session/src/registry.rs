// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session registry: the injected tenant → live-session map.
//!
//! An explicit service instead of a module-level global, shared by the
//! session manager, the delivery worker, and startup reconciliation. The
//! registry enforces the single-live-session invariant: `insert` refuses to
//! replace an entry that is still alive.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use orderping_core::types::ConnectionState;
use orderping_core::{OrderpingError, TransportLink};
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;

/// One tenant's live in-process session.
///
/// Created when a connect request is accepted and removed when the driver
/// task ends. The transport link appears once the open completes; the watch
/// channel carries every state change so callers can await readiness
/// instead of sleeping.
pub struct LiveSession {
    state_rx: watch::Receiver<ConnectionState>,
    link: Mutex<Option<Arc<dyn TransportLink>>>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSession")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl LiveSession {
    pub fn new(state_rx: watch::Receiver<ConnectionState>) -> Self {
        Self {
            state_rx,
            link: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// The live transport link, if the open has completed.
    pub async fn link(&self) -> Option<Arc<dyn TransportLink>> {
        self.link.lock().await.clone()
    }

    /// Install the link after a successful transport open.
    pub async fn set_link(&self, link: Arc<dyn TransportLink>) {
        *self.link.lock().await = Some(link);
    }

    /// Drop the link after closure.
    pub async fn clear_link(&self) {
        *self.link.lock().await = None;
    }

    /// Cancellation token observed by the driver task.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Wait until the session reaches `connected`, bounded by `timeout`.
    ///
    /// This is the explicit ready signal the delivery worker uses instead of
    /// a fixed settle sleep. Fails fast if the session ends first.
    pub async fn await_connected(&self, timeout: Duration) -> Result<(), OrderpingError> {
        let mut rx = self.state_rx.clone();
        let wait = rx.wait_for(|state| *state == ConnectionState::Connected);
        match tokio::time::timeout(timeout, wait).await {
            Ok(Ok(_)) => Ok(()),
            // Sender dropped: the driver task ended before reaching connected.
            Ok(Err(_)) => Err(OrderpingError::Transport {
                message: "session ended before reaching connected".to_string(),
                source: None,
            }),
            Err(_) => Err(OrderpingError::Timeout { duration: timeout }),
        }
    }
}

/// Shared tenant → [`LiveSession`] map.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<LiveSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the live session for a tenant.
    pub async fn get(&self, tenant_id: &str) -> Option<Arc<LiveSession>> {
        self.sessions.lock().await.get(tenant_id).cloned()
    }

    /// Register a session for a tenant.
    ///
    /// Returns the existing entry unchanged if one is still registered --
    /// at most one live session per tenant, callers must reuse it.
    pub async fn insert(
        &self,
        tenant_id: &str,
        session: Arc<LiveSession>,
    ) -> Result<(), Arc<LiveSession>> {
        let mut sessions = self.sessions.lock().await;
        if let Some(existing) = sessions.get(tenant_id) {
            return Err(Arc::clone(existing));
        }
        sessions.insert(tenant_id.to_string(), session);
        Ok(())
    }

    /// Remove a tenant's session. Returns the removed entry, if any.
    pub async fn remove(&self, tenant_id: &str) -> Option<Arc<LiveSession>> {
        self.sessions.lock().await.remove(tenant_id)
    }

    /// Number of registered sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Snapshot of all registered tenant IDs (for shutdown teardown).
    pub async fn tenant_ids(&self) -> Vec<String> {
        self.sessions.lock().await.keys().cloned().collect()
    }
}

// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session manager: owns the per-tenant protocol session lifecycle.
//!
//! Each accepted connect request spawns one driver task that loads
//! credentials, opens the transport, and pumps its event stream through the
//! pure state machine in [`crate::machine`], interpreting the returned
//! effects (projection, credential persistence, reconnect scheduling).
//!
//! Invariants:
//! - at most one live session per tenant (enforced by the registry)
//! - a tenant's credentials are written only from its own driver task
//! - transient closes re-enter `connecting` after a fixed delay; terminal
//!   logout wipes credentials and ends the task

use std::sync::Arc;
use std::time::Duration;

use orderping_config::model::SessionConfig;
use orderping_core::types::{CloseReason, ConnectionState, ConnectionStatus};
use orderping_core::{OrderpingError, StorageAdapter, Transport, TransportEvent};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::credentials::CredentialStore;
use crate::machine::{self, Effect, SessionEvent};
use crate::projector::StatusProjector;
use crate::registry::{LiveSession, SessionRegistry};

struct Inner {
    registry: Arc<SessionRegistry>,
    transport: Arc<dyn Transport>,
    credentials: CredentialStore,
    projector: StatusProjector,
    storage: Arc<dyn StorageAdapter>,
    config: SessionConfig,
}

/// Public entry point for session lifecycle operations.
///
/// Cheap to clone; all clones share the same registry and storage.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(
        registry: Arc<SessionRegistry>,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn StorageAdapter>,
        config: SessionConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                transport,
                credentials: CredentialStore::new(Arc::clone(&storage)),
                projector: StatusProjector::new(Arc::clone(&storage)),
                storage,
                config,
            }),
        }
    }

    /// The shared session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.inner.registry
    }

    /// Request a connection for a tenant.
    ///
    /// If a live session already exists it is reused -- no duplicate handle
    /// is ever opened. Otherwise a driver task is spawned; the returned
    /// [`LiveSession`] exposes `await_connected` as the explicit ready
    /// signal.
    pub async fn request_connect(
        &self,
        tenant_id: &str,
    ) -> Result<Arc<LiveSession>, OrderpingError> {
        if let Some(existing) = self.inner.registry.get(tenant_id).await {
            debug!(tenant_id = %tenant_id, "reusing live session");
            return Ok(existing);
        }

        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let session = Arc::new(LiveSession::new(state_rx));

        // Two concurrent connect requests race here; the loser reuses the
        // winner's entry.
        if let Err(existing) = self
            .inner
            .registry
            .insert(tenant_id, Arc::clone(&session))
            .await
        {
            debug!(tenant_id = %tenant_id, "lost connect race, reusing live session");
            return Ok(existing);
        }

        info!(tenant_id = %tenant_id, "starting session driver");
        let inner = Arc::clone(&self.inner);
        let tenant = tenant_id.to_string();
        let driver_session = Arc::clone(&session);
        tokio::spawn(async move {
            drive_session(inner, tenant, driver_session, state_tx).await;
        });

        Ok(session)
    }

    /// Request a disconnect for a tenant.
    ///
    /// Tears down the live session if one exists and projects
    /// `disconnected`. User-initiated logout passes `wipe_credentials =
    /// true`, which also deletes the stored blob.
    pub async fn request_disconnect(
        &self,
        tenant_id: &str,
        wipe_credentials: bool,
    ) -> Result<(), OrderpingError> {
        if let Some(session) = self.inner.registry.remove(tenant_id).await {
            session.cancel_token().cancel();
            if let Some(link) = session.link().await
                && let Err(e) = link.close().await
            {
                warn!(tenant_id = %tenant_id, error = %e, "transport close failed");
            }
            session.clear_link().await;
        }

        if wipe_credentials {
            self.inner.credentials.wipe(tenant_id).await?;
        }
        self.inner
            .projector
            .project(tenant_id, ConnectionState::Disconnected, None, false)
            .await?;

        info!(tenant_id = %tenant_id, wiped = wipe_credentials, "session disconnected");
        Ok(())
    }

    /// Pollable status for the UI: point lookup by tenant.
    pub async fn get_status(
        &self,
        tenant_id: &str,
    ) -> Result<Option<ConnectionStatus>, OrderpingError> {
        self.inner.storage.get_status(tenant_id).await
    }

    /// Full tenant erasure: disconnect (wiping in-process state), then
    /// delete credentials, status, jobs, and history.
    pub async fn erase_tenant(&self, tenant_id: &str) -> Result<(), OrderpingError> {
        if let Some(session) = self.inner.registry.remove(tenant_id).await {
            session.cancel_token().cancel();
            if let Some(link) = session.link().await {
                let _ = link.close().await;
            }
        }
        self.inner.storage.erase_tenant(tenant_id).await
    }

    /// Graceful process shutdown: tear down all live sessions without
    /// projecting `disconnected`, so previously-connected tenants are
    /// reconciled on the next boot.
    pub async fn shutdown(&self) {
        for tenant_id in self.inner.registry.tenant_ids().await {
            if let Some(session) = self.inner.registry.remove(&tenant_id).await {
                session.cancel_token().cancel();
                if let Some(link) = session.link().await
                    && let Err(e) = link.close().await
                {
                    warn!(tenant_id = %tenant_id, error = %e, "transport close failed during shutdown");
                }
            }
        }
        info!("all sessions torn down");
    }
}

/// Per-tenant driver task: open the transport, pump events through the
/// state machine, interpret effects, reconnect on transient closes.
async fn drive_session(
    inner: Arc<Inner>,
    tenant_id: String,
    session: Arc<LiveSession>,
    state_tx: watch::Sender<ConnectionState>,
) {
    let cancel = session.cancel_token().clone();
    let mut state = ConnectionState::Connecting;
    project(&inner, &tenant_id, state, None, false).await;

    'reconnect: loop {
        if cancel.is_cancelled() {
            break;
        }

        let creds = inner.credentials.load(&tenant_id).await;
        let handle = tokio::select! {
            _ = cancel.cancelled() => break 'reconnect,
            result = inner.transport.open(creds) => match result {
                Ok(handle) => handle,
                Err(e) => {
                    // Open failure surfaces as `error` with no automatic
                    // retry; callers must re-request connect explicitly.
                    error!(tenant_id = %tenant_id, error = %e, "transport open failed");
                    state = ConnectionState::Error;
                    let _ = state_tx.send(state);
                    project(&inner, &tenant_id, state, None, false).await;
                    break 'reconnect;
                }
            },
        };
        session.set_link(Arc::clone(&handle.link)).await;
        let mut events = handle.events;

        let mut reconnect = false;
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break 'reconnect,
                event = events.recv() => event,
            };

            let session_event = match event {
                Some(TransportEvent::PairingCode(code)) => SessionEvent::PairingCode(code),
                Some(TransportEvent::Opened) => SessionEvent::Opened,
                Some(TransportEvent::Closed(reason)) => SessionEvent::Closed(reason),
                Some(TransportEvent::CredentialsChanged(creds)) => {
                    SessionEvent::CredentialsChanged(creds)
                }
                // Stream end without an explicit close is a transient loss.
                None => SessionEvent::Closed(CloseReason::Transient(
                    "event stream ended".to_string(),
                )),
            };

            let (next, effects) = machine::handle_event(state, &session_event);
            if next != state {
                debug!(tenant_id = %tenant_id, from = %state, to = %next, "session transition");
                state = next;
                let _ = state_tx.send(state);
            }

            for effect in effects {
                match effect {
                    Effect::Project {
                        pairing_code,
                        touch_last_connected,
                    } => {
                        project(
                            &inner,
                            &tenant_id,
                            state,
                            pairing_code.as_deref(),
                            touch_last_connected,
                        )
                        .await;
                    }
                    Effect::PersistCredentials(creds) => {
                        if let Err(e) = inner.credentials.save(&tenant_id, &creds).await {
                            warn!(tenant_id = %tenant_id, error = %e, "credential persist failed");
                        } else {
                            debug!(tenant_id = %tenant_id, "credentials persisted");
                        }
                    }
                    Effect::WipeCredentials => {
                        if let Err(e) = inner.credentials.wipe(&tenant_id).await {
                            warn!(tenant_id = %tenant_id, error = %e, "credential wipe failed");
                        }
                    }
                    Effect::ScheduleReconnect => {
                        reconnect = true;
                    }
                    // Not produced by transport-driven events.
                    Effect::OpenTransport | Effect::CloseLink => {}
                }
            }

            if state == ConnectionState::Disconnected {
                // Terminal logout: credentials are gone, task ends.
                session.clear_link().await;
                inner.registry.remove(&tenant_id).await;
                info!(tenant_id = %tenant_id, "session ended: logged out remotely");
                return;
            }

            if reconnect {
                session.clear_link().await;
                break;
            }
        }

        let delay = Duration::from_secs(inner.config.reconnect_delay_secs);
        info!(tenant_id = %tenant_id, delay_secs = delay.as_secs(), "reconnect scheduled");
        tokio::select! {
            _ = cancel.cancelled() => break 'reconnect,
            _ = tokio::time::sleep(delay) => {}
        }

        state = ConnectionState::Connecting;
        let _ = state_tx.send(state);
        project(&inner, &tenant_id, state, None, false).await;
    }

    // Cancelled or open failure: leave no stale registry entry behind.
    session.clear_link().await;
    inner.registry.remove(&tenant_id).await;
    debug!(tenant_id = %tenant_id, "session driver exited");
}

/// Projection failures are logged, never fatal to the session.
async fn project(
    inner: &Inner,
    tenant_id: &str,
    state: ConnectionState,
    pairing_code: Option<&str>,
    touch_last_connected: bool,
) {
    if let Err(e) = inner
        .projector
        .project(tenant_id, state, pairing_code, touch_last_connected)
        .await
    {
        warn!(tenant_id = %tenant_id, error = %e, "status projection failed");
    }
}

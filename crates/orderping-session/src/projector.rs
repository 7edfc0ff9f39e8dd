// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection status projector.
//!
//! Mirrors every session transition into the durable, pollable status
//! record consumed by the merchant UI. No business logic beyond mapping
//! transition → field values: the pairing code exists only in
//! `awaiting_pairing`, and `last_connected_at` is stamped only on entry
//! into `connected`.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use orderping_core::types::{ConnectionState, ConnectionStatus};
use orderping_core::{OrderpingError, StorageAdapter};
use tracing::debug;

/// Writes the status projection on behalf of the session driver.
#[derive(Clone)]
pub struct StatusProjector {
    storage: Arc<dyn StorageAdapter>,
}

impl StatusProjector {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Project a transition into the durable status record.
    ///
    /// `pairing_code` is only honored in `awaiting_pairing`; every other
    /// state clears it. `touch_last_connected` stamps the current time,
    /// otherwise the previous timestamp is carried forward.
    pub async fn project(
        &self,
        tenant_id: &str,
        state: ConnectionState,
        pairing_code: Option<&str>,
        touch_last_connected: bool,
    ) -> Result<(), OrderpingError> {
        let previous = self.storage.get_status(tenant_id).await?;

        let last_connected_at = if touch_last_connected {
            Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
        } else {
            previous.and_then(|p| p.last_connected_at)
        };

        let pairing_code = if state == ConnectionState::AwaitingPairing {
            pairing_code.map(|c| c.to_string())
        } else {
            None
        };

        let status = ConnectionStatus {
            tenant_id: tenant_id.to_string(),
            connection_state: state,
            pairing_code,
            last_connected_at,
            updated_at: String::new(),
        };
        self.storage.upsert_status(&status).await?;

        debug!(tenant_id = %tenant_id, state = %state, "status projected");
        Ok(())
    }

    /// Read path: point lookup by tenant.
    pub async fn get(
        &self,
        tenant_id: &str,
    ) -> Result<Option<ConnectionStatus>, OrderpingError> {
        self.storage.get_status(tenant_id).await
    }
}

// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Startup reconciliation: re-open sessions for tenants that were connected
//! when the process last stopped.
//!
//! Runs sequentially with a fixed inter-tenant gap to avoid a connection
//! storm against upstream rate limits. One tenant's failure marks that
//! tenant `error` and never aborts the rest.

use std::sync::Arc;
use std::time::Duration;

use orderping_core::types::ConnectionState;
use orderping_core::{OrderpingError, StorageAdapter};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::manager::SessionManager;
use crate::projector::StatusProjector;

/// Reconnect every tenant with persisted credentials and a
/// previously-`connected` status. Returns the number of connect requests
/// issued.
pub async fn reconcile_on_startup(
    manager: &SessionManager,
    storage: &Arc<dyn StorageAdapter>,
    gap: Duration,
    shutdown: &CancellationToken,
) -> Result<usize, OrderpingError> {
    let tenants = storage.list_reconnectable().await?;
    if tenants.is_empty() {
        info!("no tenants to reconcile");
        return Ok(0);
    }

    info!(count = tenants.len(), "reconciling previously-connected tenants");
    let projector = StatusProjector::new(Arc::clone(storage));
    let mut issued = 0;

    for (i, tenant_id) in tenants.iter().enumerate() {
        if shutdown.is_cancelled() {
            info!(remaining = tenants.len() - i, "reconciliation interrupted by shutdown");
            break;
        }

        match manager.request_connect(tenant_id).await {
            Ok(_) => {
                issued += 1;
            }
            Err(e) => {
                warn!(tenant_id = %tenant_id, error = %e, "reconnect failed, marking error");
                if let Err(e) = projector
                    .project(tenant_id, ConnectionState::Error, None, false)
                    .await
                {
                    warn!(tenant_id = %tenant_id, error = %e, "error projection failed");
                }
            }
        }

        // Sequential pacing between tenants, skipped after the last one.
        if i + 1 < tenants.len() {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(gap) => {}
            }
        }
    }

    info!(issued, "reconciliation complete");
    Ok(issued)
}

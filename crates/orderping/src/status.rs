// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `orderping status` and `orderping erase` command implementations.
//!
//! Operator-facing admin surface over the same durable records the serve
//! process maintains. Both open the database read/write but never start
//! sessions or claim jobs.

use std::sync::Arc;

use orderping_config::model::OrderpingConfig;
use orderping_core::{OrderpingError, StorageAdapter};
use orderping_storage::SqliteStore;

async fn open_storage(
    config: &OrderpingConfig,
) -> Result<Arc<dyn StorageAdapter>, OrderpingError> {
    let storage = SqliteStore::new(config.storage.clone());
    storage.initialize().await?;
    Ok(Arc::new(storage))
}

/// Print the tenant's connection status record as JSON.
pub async fn run_status(
    config: OrderpingConfig,
    tenant_id: &str,
) -> Result<(), OrderpingError> {
    let storage = open_storage(&config).await?;

    match storage.get_status(tenant_id).await? {
        Some(status) => {
            let json = serde_json::to_string_pretty(&status)
                .map_err(|e| OrderpingError::Internal(format!("status encode failed: {e}")))?;
            println!("{json}");
        }
        None => {
            println!("no status record for tenant {tenant_id}");
        }
    }

    storage.close().await
}

/// Erase all stored data for a tenant.
pub async fn run_erase(
    config: OrderpingConfig,
    tenant_id: &str,
) -> Result<(), OrderpingError> {
    let storage = open_storage(&config).await?;
    storage.erase_tenant(tenant_id).await?;
    println!("erased all data for tenant {tenant_id}");
    storage.close().await
}

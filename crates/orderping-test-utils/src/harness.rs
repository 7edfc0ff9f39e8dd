// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared setup helpers for integration tests.

use std::sync::Arc;

use orderping_config::model::{DeliveryConfig, SessionConfig, StorageConfig};
use orderping_core::StorageAdapter;
use orderping_storage::SqliteStore;

/// An initialized scratch SQLite store plus the tempdir keeping it alive.
pub struct StorageFixture {
    pub storage: Arc<dyn StorageAdapter>,
    _dir: tempfile::TempDir,
}

/// Open a fresh sqlite store in a tempdir and run migrations.
pub async fn sqlite_fixture() -> StorageFixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("orderping-test.db");
    let store = SqliteStore::new(StorageConfig {
        database_path: db_path.to_string_lossy().into_owned(),
        wal_mode: true,
    });
    store.initialize().await.expect("initialize storage");
    StorageFixture {
        storage: Arc::new(store),
        _dir: dir,
    }
}

/// Session config tuned for tests: no reconnect or reconcile delays.
pub fn fast_session_config() -> SessionConfig {
    SessionConfig {
        reconnect_delay_secs: 0,
        connect_timeout_secs: 5,
        keepalive_secs: 30,
        reconcile_gap_secs: 0,
    }
}

/// Delivery config tuned for tests: tight polling, no backoff delay.
pub fn fast_delivery_config() -> DeliveryConfig {
    DeliveryConfig {
        worker_concurrency: 2,
        claims_per_second: 1000,
        retry_base_delay_secs: 1,
        connect_wait_secs: 2,
        poll_interval_ms: 10,
        media_max_bytes: 1024 * 1024,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_opens_working_storage() {
        let fixture = sqlite_fixture().await;
        fixture
            .storage
            .save_credentials("shop-a", "blob")
            .await
            .unwrap();
        assert!(
            fixture
                .storage
                .load_credentials("shop-a")
                .await
                .unwrap()
                .is_some()
        );
    }
}

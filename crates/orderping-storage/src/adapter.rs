// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use orderping_config::model::StorageConfig;
use orderping_core::types::{ConnectionStatus, DeliveryJob, DeliveryRecord, NewJob, NewRecord};
use orderping_core::{
    AdapterType, HealthStatus, OrderpingError, PluginAdapter, StorageAdapter,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`]
    /// is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, OrderpingError> {
        self.db.get().ok_or_else(|| OrderpingError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, OrderpingError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), OrderpingError> {
        // Shutdown delegates to close if the DB was initialized.
        if let Some(db) = self.db.get() {
            db.close().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStore {
    async fn initialize(&self) -> Result<(), OrderpingError> {
        let db = Database::open(&self.config.database_path).await?;
        self.db.set(db).map_err(|_| OrderpingError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), OrderpingError> {
        self.db()?.close().await
    }

    // --- Credential operations ---

    async fn save_credentials(
        &self,
        tenant_id: &str,
        blob: &str,
    ) -> Result<(), OrderpingError> {
        queries::credentials::save_credentials(self.db()?, tenant_id, blob).await
    }

    async fn load_credentials(
        &self,
        tenant_id: &str,
    ) -> Result<Option<String>, OrderpingError> {
        queries::credentials::load_credentials(self.db()?, tenant_id).await
    }

    async fn delete_credentials(&self, tenant_id: &str) -> Result<(), OrderpingError> {
        queries::credentials::delete_credentials(self.db()?, tenant_id).await
    }

    // --- Connection status operations ---

    async fn upsert_status(&self, status: &ConnectionStatus) -> Result<(), OrderpingError> {
        queries::status::upsert_status(self.db()?, status).await
    }

    async fn get_status(
        &self,
        tenant_id: &str,
    ) -> Result<Option<ConnectionStatus>, OrderpingError> {
        queries::status::get_status(self.db()?, tenant_id).await
    }

    async fn list_reconnectable(&self) -> Result<Vec<String>, OrderpingError> {
        queries::status::list_reconnectable(self.db()?).await
    }

    // --- Delivery queue operations ---

    async fn enqueue_job(&self, job: &NewJob) -> Result<i64, OrderpingError> {
        queries::jobs::enqueue_job(self.db()?, job).await
    }

    async fn claim_due_job(&self) -> Result<Option<DeliveryJob>, OrderpingError> {
        queries::jobs::claim_due_job(self.db()?).await
    }

    async fn get_job(&self, id: i64) -> Result<Option<DeliveryJob>, OrderpingError> {
        queries::jobs::get_job(self.db()?, id).await
    }

    async fn ack_job(&self, id: i64) -> Result<(), OrderpingError> {
        queries::jobs::ack_job(self.db()?, id).await
    }

    async fn fail_job(
        &self,
        id: i64,
        error: &str,
        base_delay_secs: i64,
    ) -> Result<(), OrderpingError> {
        queries::jobs::fail_job(self.db()?, id, error, base_delay_secs).await
    }

    // --- Delivery history operations ---

    async fn append_record(&self, record: &NewRecord) -> Result<i64, OrderpingError> {
        queries::history::append_record(self.db()?, record).await
    }

    async fn list_records(
        &self,
        tenant_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<DeliveryRecord>, OrderpingError> {
        queries::history::list_records(self.db()?, tenant_id, limit).await
    }

    // --- Erasure ---

    async fn erase_tenant(&self, tenant_id: &str) -> Result<(), OrderpingError> {
        queries::erase::erase_tenant(self.db()?, tenant_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_store_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = SqliteStore::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let storage = SqliteStore::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStore::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        let result = storage.initialize().await;
        assert!(result.is_err(), "second initialize should fail");
    }

    #[tokio::test]
    async fn health_check_fails_when_not_initialized() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("no_init.db");
        let storage = SqliteStore::new(make_config(db_path.to_str().unwrap()));

        let result = storage.health_check().await;
        assert!(result.is_err(), "health_check should fail before initialize");
    }

    #[tokio::test]
    async fn full_tenant_lifecycle_through_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lifecycle.db");
        let storage = SqliteStore::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);

        // Credentials.
        storage
            .save_credentials("shop-a.example.com", "encoded-blob")
            .await
            .unwrap();
        let blob = storage.load_credentials("shop-a.example.com").await.unwrap();
        assert_eq!(blob.as_deref(), Some("encoded-blob"));

        // Queue.
        let job_id = storage
            .enqueue_job(&NewJob {
                tenant_id: "shop-a.example.com".to_string(),
                recipient: "15550001111".to_string(),
                body: "Your order is confirmed".to_string(),
                media_url: None,
                category: "order_confirmation".to_string(),
                order_ref: Some("#1001".to_string()),
                priority: 1,
                not_before: None,
                max_attempts: 3,
            })
            .await
            .unwrap();
        let claimed = storage.claim_due_job().await.unwrap().unwrap();
        assert_eq!(claimed.id, job_id);
        storage.ack_job(job_id).await.unwrap();
        assert_eq!(
            storage.get_job(job_id).await.unwrap().unwrap().status,
            "sent"
        );

        // History.
        storage
            .append_record(&NewRecord {
                tenant_id: "shop-a.example.com".to_string(),
                recipient: "15550001111".to_string(),
                body: "Your order is confirmed".to_string(),
                category: "order_confirmation".to_string(),
                order_ref: Some("#1001".to_string()),
                outcome: "sent".to_string(),
                error: None,
            })
            .await
            .unwrap();
        let records = storage
            .list_records("shop-a.example.com", None)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);

        // Erasure wipes everything.
        storage.erase_tenant("shop-a.example.com").await.unwrap();
        assert!(
            storage
                .load_credentials("shop-a.example.com")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            storage
                .list_records("shop-a.example.com", None)
                .await
                .unwrap()
                .is_empty()
        );

        storage.close().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_runs_checkpoint() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("shutdown.db");
        let storage = SqliteStore::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();

        storage
            .save_credentials("shop-a.example.com", "blob")
            .await
            .unwrap();

        storage.shutdown().await.unwrap();
    }
}

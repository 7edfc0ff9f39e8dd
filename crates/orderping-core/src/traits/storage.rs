// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;

use crate::error::OrderpingError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ConnectionStatus, DeliveryJob, DeliveryRecord, NewJob, NewRecord};

/// Adapter for storage and persistence backends.
///
/// Covers the four durable surfaces of the engine: per-tenant credential
/// blobs, the pollable connection-status projection, the crash-safe delivery
/// job queue, and the append-only delivery history.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), OrderpingError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), OrderpingError>;

    // --- Credential operations ---

    /// Upsert the encoded credential blob for a tenant. Last write wins.
    async fn save_credentials(&self, tenant_id: &str, blob: &str)
    -> Result<(), OrderpingError>;

    /// Load the encoded credential blob, or `None` if never saved.
    async fn load_credentials(&self, tenant_id: &str)
    -> Result<Option<String>, OrderpingError>;

    /// Delete the credential blob, forcing re-pairing on the next connect.
    async fn delete_credentials(&self, tenant_id: &str) -> Result<(), OrderpingError>;

    // --- Connection status operations ---

    /// Upsert the status projection for a tenant.
    async fn upsert_status(&self, status: &ConnectionStatus) -> Result<(), OrderpingError>;

    /// Point lookup of a tenant's status projection.
    async fn get_status(&self, tenant_id: &str)
    -> Result<Option<ConnectionStatus>, OrderpingError>;

    /// Tenants with persisted credentials and a previously-`connected`
    /// status, in the order they should be reconnected at startup.
    async fn list_reconnectable(&self) -> Result<Vec<String>, OrderpingError>;

    // --- Delivery queue operations ---

    /// Enqueue a new job. Returns the auto-generated job ID.
    async fn enqueue_job(&self, job: &NewJob) -> Result<i64, OrderpingError>;

    /// Atomically claim the most urgent due pending job, if any.
    async fn claim_due_job(&self) -> Result<Option<DeliveryJob>, OrderpingError>;

    /// Fetch a job by ID regardless of status.
    async fn get_job(&self, id: i64) -> Result<Option<DeliveryJob>, OrderpingError>;

    /// Mark a claimed job terminally `sent`.
    async fn ack_job(&self, id: i64) -> Result<(), OrderpingError>;

    /// Record a failed attempt: increments `attempts` and either reschedules
    /// the job with exponential backoff (base delay × 2^attempts) or marks it
    /// terminally `failed` once `max_attempts` is reached.
    async fn fail_job(
        &self,
        id: i64,
        error: &str,
        base_delay_secs: i64,
    ) -> Result<(), OrderpingError>;

    // --- Delivery history operations ---

    /// Append one terminal attempt outcome. Records are never mutated.
    async fn append_record(&self, record: &NewRecord) -> Result<i64, OrderpingError>;

    /// List history records for a tenant, newest first.
    async fn list_records(
        &self,
        tenant_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<DeliveryRecord>, OrderpingError>;

    // --- Erasure ---

    /// Delete the tenant's credentials, status, jobs, and history in one
    /// call (shop-uninstall / data-subject erasure).
    async fn erase_tenant(&self, tenant_id: &str) -> Result<(), OrderpingError>;
}

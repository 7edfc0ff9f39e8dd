// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Enqueue surface for webhook and campaign producers.
//!
//! Fire-and-forget: the job ID comes back immediately and delivery failures
//! are visible only in the history log. Quota checks (`can_send`) are the
//! producers' responsibility at this boundary.

use std::sync::Arc;

use orderping_core::types::NewJob;
use orderping_core::{OrderpingError, StorageAdapter};
use tracing::debug;

/// Validate and enqueue a delivery job. Returns the job ID.
pub async fn enqueue(
    storage: &Arc<dyn StorageAdapter>,
    job: NewJob,
) -> Result<i64, OrderpingError> {
    if job.tenant_id.trim().is_empty() {
        return Err(OrderpingError::Internal("enqueue: tenant_id is empty".into()));
    }
    if job.recipient.trim().is_empty() {
        return Err(OrderpingError::Internal("enqueue: recipient is empty".into()));
    }
    if job.body.trim().is_empty() && job.media_url.is_none() {
        return Err(OrderpingError::Internal(
            "enqueue: job has neither body nor media".into(),
        ));
    }
    if job.max_attempts < 1 {
        return Err(OrderpingError::Internal(
            "enqueue: max_attempts must be at least 1".into(),
        ));
    }

    let id = storage.enqueue_job(&job).await?;
    debug!(
        job_id = id,
        tenant_id = %job.tenant_id,
        category = %job.category,
        priority = job.priority,
        "job enqueued"
    );
    Ok(id)
}

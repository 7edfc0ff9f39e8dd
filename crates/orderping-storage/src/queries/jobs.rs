// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery queue operations for crash-safe outbound processing.
//!
//! Claim order is `priority ASC, not_before ASC`: the most urgent of the
//! earliest-due jobs wins. A claimed job holds a 5-minute lock lease; leases
//! left behind by a crashed process become claimable again once expired.

use orderping_core::OrderpingError;
use orderping_core::types::{DeliveryJob, NewJob};
use rusqlite::params;

use crate::database::Database;

const JOB_COLUMNS: &str = "id, tenant_id, recipient, body, media_url, category, order_ref,
     priority, not_before, status, attempts, max_attempts, last_error,
     dedupe_key, created_at, updated_at, locked_until";

fn row_to_job(row: &rusqlite::Row<'_>) -> Result<DeliveryJob, rusqlite::Error> {
    Ok(DeliveryJob {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        recipient: row.get(2)?,
        body: row.get(3)?,
        media_url: row.get(4)?,
        category: row.get(5)?,
        order_ref: row.get(6)?,
        priority: row.get(7)?,
        not_before: row.get(8)?,
        status: row.get(9)?,
        attempts: row.get(10)?,
        max_attempts: row.get(11)?,
        last_error: row.get(12)?,
        dedupe_key: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
        locked_until: row.get(16)?,
    })
}

/// Enqueue a new job. Returns the job ID.
///
/// The dedupe key is tenant + recipient + enqueue timestamp + a hash of the
/// content; re-enqueuing an identical send in the same millisecond (webhook
/// redelivery) returns the existing job's ID instead of inserting a
/// duplicate, while distinct messages never collide.
pub async fn enqueue_job(db: &Database, job: &NewJob) -> Result<i64, OrderpingError> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let job = job.clone();
    db.connection()
        .call(move |conn| {
            let now: String = conn.query_row(
                "SELECT strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                [],
                |row| row.get(0),
            )?;
            let mut hasher = DefaultHasher::new();
            job.body.hash(&mut hasher);
            job.category.hash(&mut hasher);
            job.media_url.hash(&mut hasher);
            let content = hasher.finish();
            let dedupe_key = format!(
                "{}|{}|{}|{content:016x}",
                job.tenant_id, job.recipient, now
            );
            let not_before = job.not_before.clone().unwrap_or_else(|| now.clone());

            let inserted = conn.execute(
                "INSERT INTO delivery_jobs
                     (tenant_id, recipient, body, media_url, category, order_ref,
                      priority, not_before, max_attempts, dedupe_key,
                      created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
                 ON CONFLICT(dedupe_key) DO NOTHING",
                params![
                    job.tenant_id,
                    job.recipient,
                    job.body,
                    job.media_url,
                    job.category,
                    job.order_ref,
                    job.priority,
                    not_before,
                    job.max_attempts,
                    dedupe_key,
                    now,
                ],
            )?;

            if inserted > 0 {
                Ok(conn.last_insert_rowid())
            } else {
                conn.query_row(
                    "SELECT id FROM delivery_jobs WHERE dedupe_key = ?1",
                    params![dedupe_key],
                    |row| row.get(0),
                )
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Atomically claim the most urgent due job.
///
/// Selects the best candidate among `pending` jobs whose `not_before` has
/// passed plus `processing` jobs whose lock lease expired (crash recovery),
/// then marks it `processing` with a fresh 5-minute lease. Returns `None`
/// when nothing is due.
pub async fn claim_due_job(db: &Database) -> Result<Option<DeliveryJob>, OrderpingError> {
    db.connection()
        .call(move |conn| {
            // Transaction to atomically find + lock the next due job.
            let tx = conn.transaction()?;

            let result = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {JOB_COLUMNS}
                     FROM delivery_jobs
                     WHERE (status = 'pending'
                            AND not_before <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                        OR (status = 'processing'
                            AND locked_until < strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                     ORDER BY priority ASC, not_before ASC
                     LIMIT 1"
                ))?;
                stmt.query_row([], row_to_job)
            };

            match result {
                Ok(job) => {
                    tx.execute(
                        "UPDATE delivery_jobs SET status = 'processing',
                         locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+5 minutes'),
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE id = ?1",
                        params![job.id],
                    )?;
                    tx.commit()?;

                    Ok(Some(DeliveryJob {
                        status: "processing".to_string(),
                        ..job
                    }))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch a job by ID regardless of status.
pub async fn get_job(db: &Database, id: i64) -> Result<Option<DeliveryJob>, OrderpingError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {JOB_COLUMNS} FROM delivery_jobs WHERE id = ?1"),
                params![id],
                row_to_job,
            );
            match result {
                Ok(job) => Ok(Some(job)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all jobs for a tenant, most recent first.
pub async fn list_jobs(db: &Database, tenant_id: &str) -> Result<Vec<DeliveryJob>, OrderpingError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {JOB_COLUMNS} FROM delivery_jobs
                 WHERE tenant_id = ?1 ORDER BY id DESC"
            ))?;
            let rows = stmt.query_map(params![tenant_id], row_to_job)?;
            let mut jobs = Vec::new();
            for row in rows {
                jobs.push(row?);
            }
            Ok(jobs)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a claimed job terminally `sent`.
pub async fn ack_job(db: &Database, id: i64) -> Result<(), OrderpingError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE delivery_jobs SET status = 'sent',
                 locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a failed attempt.
///
/// Increments `attempts`. Below `max_attempts` the job returns to `pending`
/// with `not_before` pushed out by `base_delay_secs * 2^attempts`; at
/// `max_attempts` it becomes terminally `failed`. Either way `last_error`
/// keeps the latest error text for operator visibility.
pub async fn fail_job(
    db: &Database,
    id: i64,
    error: &str,
    base_delay_secs: i64,
) -> Result<(), OrderpingError> {
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            let (attempts, max_attempts, status): (i64, i64, String) = conn.query_row(
                "SELECT attempts, max_attempts, status FROM delivery_jobs WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

            // Terminal jobs stay terminal; attempts never exceeds max_attempts.
            if status == "sent" || status == "failed" {
                return Ok(());
            }

            let new_attempts = attempts + 1;
            if new_attempts >= max_attempts {
                conn.execute(
                    "UPDATE delivery_jobs SET status = 'failed', attempts = ?1,
                     last_error = ?2, locked_until = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?3",
                    params![new_attempts, error, id],
                )?;
            } else {
                // Exponent capped to keep the shift well-defined for
                // pathological max_attempts values.
                let delay = base_delay_secs.saturating_mul(1i64 << new_attempts.min(20));
                conn.execute(
                    "UPDATE delivery_jobs SET status = 'pending', attempts = ?1,
                     last_error = ?2, locked_until = NULL,
                     not_before = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?3),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?4",
                    params![new_attempts, error, format!("+{delay} seconds"), id],
                )?;
            }
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

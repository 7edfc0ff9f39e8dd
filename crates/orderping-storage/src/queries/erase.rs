// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant data erasure (shop uninstall / data-subject requests).

use orderping_core::OrderpingError;
use rusqlite::params;
use tracing::info;

use crate::database::Database;

/// Delete everything stored for a tenant in one transaction: credential
/// blob, status projection, queued jobs, and history records.
pub async fn erase_tenant(db: &Database, tenant_id: &str) -> Result<(), OrderpingError> {
    let tenant = tenant_id.to_string();
    let deleted: usize = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut total = 0;
            total += tx.execute(
                "DELETE FROM credentials WHERE tenant_id = ?1",
                params![tenant],
            )?;
            total += tx.execute(
                "DELETE FROM connection_status WHERE tenant_id = ?1",
                params![tenant],
            )?;
            total += tx.execute(
                "DELETE FROM delivery_jobs WHERE tenant_id = ?1",
                params![tenant],
            )?;
            total += tx.execute(
                "DELETE FROM delivery_history WHERE tenant_id = ?1",
                params![tenant],
            )?;
            tx.commit()?;
            Ok(total)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    info!(tenant_id = %tenant_id, rows = deleted, "tenant data erased");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::{credentials, history, jobs, status};
    use orderping_core::types::{ConnectionState, ConnectionStatus, NewJob, NewRecord};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn erase_removes_all_tenant_rows_and_spares_others() {
        let (db, _dir) = setup_db().await;

        for tenant in ["shop-a", "shop-b"] {
            credentials::save_credentials(&db, tenant, "blob").await.unwrap();
            status::upsert_status(
                &db,
                &ConnectionStatus {
                    tenant_id: tenant.to_string(),
                    connection_state: ConnectionState::Connected,
                    pairing_code: None,
                    last_connected_at: None,
                    updated_at: String::new(),
                },
            )
            .await
            .unwrap();
            jobs::enqueue_job(
                &db,
                &NewJob {
                    tenant_id: tenant.to_string(),
                    recipient: "15550001111".to_string(),
                    body: "hi".to_string(),
                    media_url: None,
                    category: "campaign".to_string(),
                    order_ref: None,
                    priority: 5,
                    not_before: None,
                    max_attempts: 3,
                },
            )
            .await
            .unwrap();
            history::append_record(
                &db,
                &NewRecord {
                    tenant_id: tenant.to_string(),
                    recipient: "15550001111".to_string(),
                    body: "hi".to_string(),
                    category: "campaign".to_string(),
                    order_ref: None,
                    outcome: "sent".to_string(),
                    error: None,
                },
            )
            .await
            .unwrap();
        }

        erase_tenant(&db, "shop-b").await.unwrap();

        // Every read for shop-b comes back empty.
        assert!(credentials::load_credentials(&db, "shop-b").await.unwrap().is_none());
        assert!(status::get_status(&db, "shop-b").await.unwrap().is_none());
        assert!(jobs::list_jobs(&db, "shop-b").await.unwrap().is_empty());
        assert!(history::list_records(&db, "shop-b", None).await.unwrap().is_empty());

        // shop-a is untouched.
        assert!(credentials::load_credentials(&db, "shop-a").await.unwrap().is_some());
        assert_eq!(jobs::list_jobs(&db, "shop-a").await.unwrap().len(), 1);
        assert_eq!(
            history::list_records(&db, "shop-a", None).await.unwrap().len(),
            1
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn erase_unknown_tenant_is_a_noop() {
        let (db, _dir) = setup_db().await;
        erase_tenant(&db, "never-installed").await.unwrap();
        db.close().await.unwrap();
    }
}

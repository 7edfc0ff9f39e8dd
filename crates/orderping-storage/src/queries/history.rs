// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only delivery history queries.
//!
//! Records are inserted once per terminal attempt outcome and never updated.

use orderping_core::OrderpingError;
use orderping_core::types::{DeliveryRecord, NewRecord};
use rusqlite::params;

use crate::database::Database;

/// Append one terminal attempt outcome. Returns the record ID.
pub async fn append_record(db: &Database, record: &NewRecord) -> Result<i64, OrderpingError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO delivery_history
                     (tenant_id, recipient, body, category, order_ref, outcome, error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.tenant_id,
                    record.recipient,
                    record.body,
                    record.category,
                    record.order_ref,
                    record.outcome,
                    record.error,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List history records for a tenant, newest first.
pub async fn list_records(
    db: &Database,
    tenant_id: &str,
    limit: Option<i64>,
) -> Result<Vec<DeliveryRecord>, OrderpingError> {
    let tenant_id = tenant_id.to_string();
    let limit = limit.unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, tenant_id, recipient, body, category, order_ref,
                        outcome, error, created_at
                 FROM delivery_history
                 WHERE tenant_id = ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![tenant_id, limit], |row| {
                Ok(DeliveryRecord {
                    id: row.get(0)?,
                    tenant_id: row.get(1)?,
                    recipient: row.get(2)?,
                    body: row.get(3)?,
                    category: row.get(4)?,
                    order_ref: row.get(5)?,
                    outcome: row.get(6)?,
                    error: row.get(7)?,
                    created_at: row.get(8)?,
                })
            })?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_record(tenant: &str, outcome: &str) -> NewRecord {
        NewRecord {
            tenant_id: tenant.to_string(),
            recipient: "15550001111".to_string(),
            body: "Thanks for your order!".to_string(),
            category: "order_confirmation".to_string(),
            order_ref: Some("#2001".to_string()),
            outcome: outcome.to_string(),
            error: if outcome == "failed" {
                Some("send refused".to_string())
            } else {
                None
            },
        }
    }

    #[tokio::test]
    async fn append_and_list_round_trips() {
        let (db, _dir) = setup_db().await;

        let id = append_record(&db, &make_record("shop-a", "sent"))
            .await
            .unwrap();
        assert!(id > 0);

        let records = list_records(&db, "shop-a", None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, "sent");
        assert!(records[0].error.is_none());
        assert_eq!(records[0].order_ref.as_deref(), Some("#2001"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn failed_record_carries_error_text() {
        let (db, _dir) = setup_db().await;

        append_record(&db, &make_record("shop-a", "failed"))
            .await
            .unwrap();

        let records = list_records(&db, "shop-a", None).await.unwrap();
        assert_eq!(records[0].outcome, "failed");
        assert_eq!(records[0].error.as_deref(), Some("send refused"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_is_newest_first_and_respects_limit() {
        let (db, _dir) = setup_db().await;

        append_record(&db, &make_record("shop-a", "failed"))
            .await
            .unwrap();
        append_record(&db, &make_record("shop-a", "sent"))
            .await
            .unwrap();

        let records = list_records(&db, "shop-a", Some(1)).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, "sent");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_filters_by_tenant() {
        let (db, _dir) = setup_db().await;

        append_record(&db, &make_record("shop-a", "sent"))
            .await
            .unwrap();
        append_record(&db, &make_record("shop-b", "sent"))
            .await
            .unwrap();

        let records = list_records(&db, "shop-b", None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tenant_id, "shop-b");

        db.close().await.unwrap();
    }
}

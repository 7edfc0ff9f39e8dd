// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential blob persistence.
//!
//! One row per tenant. Saves are frequent (every credential-update event
//! from the transport) and must be last-write-wins: the upsert replaces the
//! whole blob atomically on the single writer thread.

use orderping_core::OrderpingError;
use rusqlite::params;

use crate::database::Database;

/// Upsert the encoded credential blob for a tenant.
pub async fn save_credentials(
    db: &Database,
    tenant_id: &str,
    blob: &str,
) -> Result<(), OrderpingError> {
    let tenant_id = tenant_id.to_string();
    let blob = blob.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO credentials (tenant_id, blob, updated_at)
                 VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 ON CONFLICT(tenant_id) DO UPDATE SET
                     blob = excluded.blob,
                     updated_at = excluded.updated_at",
                params![tenant_id, blob],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Load the encoded credential blob, or `None` if the tenant never saved one.
pub async fn load_credentials(
    db: &Database,
    tenant_id: &str,
) -> Result<Option<String>, OrderpingError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT blob FROM credentials WHERE tenant_id = ?1",
                params![tenant_id],
                |row| row.get(0),
            );
            match result {
                Ok(blob) => Ok(Some(blob)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete the credential blob, forcing re-pairing on the next connect.
pub async fn delete_credentials(db: &Database, tenant_id: &str) -> Result<(), OrderpingError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM credentials WHERE tenant_id = ?1",
                params![tenant_id],
            )?;
            Ok(())
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

    #[tokio::test]
    async fn save_and_load_round_trips() {
        let (db, _dir) = setup_db().await;

        save_credentials(&db, "shop-a.example.com", "blob-v1")
            .await
            .unwrap();
        let loaded = load_credentials(&db, "shop-a.example.com").await.unwrap();
        assert_eq!(loaded.as_deref(), Some("blob-v1"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn save_is_last_write_wins() {
        let (db, _dir) = setup_db().await;

        save_credentials(&db, "shop-a.example.com", "blob-v1")
            .await
            .unwrap();
        save_credentials(&db, "shop-a.example.com", "blob-v2")
            .await
            .unwrap();

        let loaded = load_credentials(&db, "shop-a.example.com").await.unwrap();
        assert_eq!(loaded.as_deref(), Some("blob-v2"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn load_missing_tenant_returns_none() {
        let (db, _dir) = setup_db().await;
        let loaded = load_credentials(&db, "no-such-shop").await.unwrap();
        assert!(loaded.is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_removes_blob() {
        let (db, _dir) = setup_db().await;

        save_credentials(&db, "shop-b.example.com", "blob")
            .await
            .unwrap();
        delete_credentials(&db, "shop-b.example.com").await.unwrap();

        let loaded = load_credentials(&db, "shop-b.example.com").await.unwrap();
        assert!(loaded.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_saves_for_same_tenant_do_not_interleave() {
        let (db, _dir) = setup_db().await;

        // All writes go through the single background thread; the surviving
        // blob must be one of the written values, never a mix.
        let mut handles = Vec::new();
        for i in 0..10 {
            let conn = db.connection().clone();
            handles.push(tokio::spawn(async move {
                conn.call(move |conn| {
                    conn.execute(
                        "INSERT INTO credentials (tenant_id, blob)
                         VALUES ('shop-c', ?1)
                         ON CONFLICT(tenant_id) DO UPDATE SET blob = excluded.blob",
                        params![format!("blob-{i}")],
                    )?;
                    Ok::<_, rusqlite::Error>(())
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let loaded = load_credentials(&db, "shop-c").await.unwrap().unwrap();
        assert!(loaded.starts_with("blob-"));

        db.close().await.unwrap();
    }
}

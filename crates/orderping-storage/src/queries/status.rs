// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection status projection queries.

use std::str::FromStr;

use orderping_core::OrderpingError;
use orderping_core::types::{ConnectionState, ConnectionStatus};
use rusqlite::params;

use crate::database::Database;

fn row_to_status(row: &rusqlite::Row<'_>) -> Result<ConnectionStatus, rusqlite::Error> {
    let state_text: String = row.get(1)?;
    let connection_state = ConnectionState::from_str(&state_text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })?;
    Ok(ConnectionStatus {
        tenant_id: row.get(0)?,
        connection_state,
        pairing_code: row.get(2)?,
        last_connected_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

/// Upsert the status projection for a tenant.
pub async fn upsert_status(
    db: &Database,
    status: &ConnectionStatus,
) -> Result<(), OrderpingError> {
    let status = status.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO connection_status
                     (tenant_id, connection_state, pairing_code, last_connected_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 ON CONFLICT(tenant_id) DO UPDATE SET
                     connection_state = excluded.connection_state,
                     pairing_code = excluded.pairing_code,
                     last_connected_at = excluded.last_connected_at,
                     updated_at = excluded.updated_at",
                params![
                    status.tenant_id,
                    status.connection_state.to_string(),
                    status.pairing_code,
                    status.last_connected_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Point lookup of a tenant's status projection.
pub async fn get_status(
    db: &Database,
    tenant_id: &str,
) -> Result<Option<ConnectionStatus>, OrderpingError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT tenant_id, connection_state, pairing_code, last_connected_at, updated_at
                 FROM connection_status WHERE tenant_id = ?1",
                params![tenant_id],
                row_to_status,
            );
            match result {
                Ok(status) => Ok(Some(status)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Tenants with a previously-`connected` status and non-empty persisted
/// credentials, for startup reconciliation.
pub async fn list_reconnectable(db: &Database) -> Result<Vec<String>, OrderpingError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT s.tenant_id
                 FROM connection_status s
                 JOIN credentials c ON c.tenant_id = s.tenant_id
                 WHERE s.connection_state = 'connected' AND length(c.blob) > 0
                 ORDER BY s.tenant_id ASC",
            )?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            let mut tenants = Vec::new();
            for row in rows {
                tenants.push(row?);
            }
            Ok(tenants)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

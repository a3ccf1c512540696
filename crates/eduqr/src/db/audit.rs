//! Persisted audit trail.

use rusqlite::Connection;

use super::types::AuditRecord;

pub fn insert(
    conn: &Connection,
    action: &str,
    resource_type: &str,
    resource_id: Option<i64>,
    description: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO audit_events (action, resource_type, resource_id, description, created_at)
         VALUES (?1, ?2, ?3, ?4, datetime('now'))",
        (action, resource_type, resource_id, description),
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent events first
pub fn recent(conn: &Connection, limit: i64) -> rusqlite::Result<Vec<AuditRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, action, resource_type, resource_id, description
         FROM audit_events ORDER BY id DESC LIMIT ?",
    )?;
    let rows = stmt.query_map([limit], |row| {
        Ok(AuditRecord {
            id: row.get(0)?,
            action: row.get(1)?,
            resource_type: row.get(2)?,
            resource_id: row.get(3)?,
            description: row.get(4)?,
        })
    })?;
    rows.collect()
}

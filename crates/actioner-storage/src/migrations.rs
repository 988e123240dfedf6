//! Database schema migrations.
//!
//! Applies the action event audit table and the schema_migrations tracker.

use rusqlite::Connection;
use tracing::info;

use actioner_core::error::ActionerError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), ActionerError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| ActionerError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| ActionerError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: action_events");
    }

    Ok(())
}

/// Version 1: append-only action event table.
///
/// No uniqueness constraint beyond the row id; redelivered messages produce
/// additional rows.
fn apply_v1(conn: &Connection) -> Result<(), ActionerError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS action_events (
            id              TEXT PRIMARY KEY NOT NULL,
            content_id      TEXT NOT NULL,
            performed_at    TEXT NOT NULL,
            action_label    TEXT NOT NULL,
            action_rules    TEXT NOT NULL DEFAULT '[]',
            created_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_action_events_content
            ON action_events (content_id, performed_at DESC);

        CREATE INDEX IF NOT EXISTS idx_action_events_label
            ON action_events (action_label, performed_at DESC);

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'action_events');
        ",
    )
    .map_err(|e| ActionerError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}

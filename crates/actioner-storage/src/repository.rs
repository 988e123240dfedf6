//! Action event persistence.
//!
//! The audit table is append-only: events are inserted and queried, never
//! updated or deleted.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use actioner_core::error::ActionerError;
use actioner_core::message::ActionEvent;

use crate::db::Database;

/// Append sink for audit events.
///
/// Implementations must either durably store the event or return an error;
/// retry policy belongs to the caller.
pub trait EventStore: Send + Sync {
    fn append(&self, event: &ActionEvent) -> Result<(), ActionerError>;
}

/// SQLite-backed repository for action events.
pub struct ActionEventRepository {
    db: Arc<Database>,
}

impl ActionEventRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Events recorded for a content item, newest first.
    pub fn find_by_content(
        &self,
        content_id: &str,
        limit: u64,
    ) -> Result<Vec<ActionEvent>, ActionerError> {
        self.query(
            "SELECT id, content_id, performed_at, action_label, action_rules
             FROM action_events
             WHERE content_id = ?1
             ORDER BY performed_at DESC
             LIMIT ?2",
            content_id,
            limit,
        )
    }

    /// Events recorded under an action label, newest first.
    pub fn find_by_label(
        &self,
        action_label: &str,
        limit: u64,
    ) -> Result<Vec<ActionEvent>, ActionerError> {
        self.query(
            "SELECT id, content_id, performed_at, action_label, action_rules
             FROM action_events
             WHERE action_label = ?1
             ORDER BY performed_at DESC
             LIMIT ?2",
            action_label,
            limit,
        )
    }

    /// Count all recorded events.
    pub fn count(&self) -> Result<u64, ActionerError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM action_events", [], |row| row.get(0))
                .map_err(|e| ActionerError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }

    fn query(&self, sql: &str, key: &str, limit: u64) -> Result<Vec<ActionEvent>, ActionerError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(sql)
                .map_err(|e| ActionerError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![key, limit], |row| Ok(row_to_event(row)))
                .map_err(|e| ActionerError::Storage(e.to_string()))?;

            let mut events = Vec::new();
            for row in rows {
                let event = row.map_err(|e| ActionerError::Storage(e.to_string()))??;
                events.push(event);
            }
            Ok(events)
        })
    }
}

impl EventStore for ActionEventRepository {
    fn append(&self, event: &ActionEvent) -> Result<(), ActionerError> {
        let rules = serde_json::to_string(&event.action_rules)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO action_events (id, content_id, performed_at, action_label, action_rules)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    event.id.to_string(),
                    event.content_id,
                    format_timestamp(event.performed_at),
                    event.action_label,
                    rules,
                ],
            )
            .map_err(|e| ActionerError::Storage(format!("Failed to append action event: {}", e)))?;
            Ok(())
        })
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn row_to_event(row: &rusqlite::Row<'_>) -> Result<ActionEvent, ActionerError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| ActionerError::Storage(e.to_string()))?;
    let content_id: String = row
        .get(1)
        .map_err(|e| ActionerError::Storage(e.to_string()))?;
    let performed_at: String = row
        .get(2)
        .map_err(|e| ActionerError::Storage(e.to_string()))?;
    let action_label: String = row
        .get(3)
        .map_err(|e| ActionerError::Storage(e.to_string()))?;
    let rules_json: String = row
        .get(4)
        .map_err(|e| ActionerError::Storage(e.to_string()))?;

    Ok(ActionEvent {
        id: Uuid::parse_str(&id_str)
            .map_err(|e| ActionerError::Storage(format!("Invalid UUID: {}", e)))?,
        content_id,
        performed_at: DateTime::parse_from_rfc3339(&performed_at)
            .map_err(|e| ActionerError::Storage(format!("Invalid timestamp: {}", e)))?
            .with_timezone(&Utc),
        action_label,
        action_rules: serde_json::from_str(&rules_json)?,
    })
}

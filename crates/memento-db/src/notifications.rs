use crate::Database;
use crate::models::{now_timestamp, parse_timestamp, parse_uuid};
use anyhow::{Result, anyhow};
use memento_types::models::{Notification, NotificationKind};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

const NOTIFICATION_COLUMNS: &str = "id, kind, text, link_id, read, created_at";

impl Database {
    pub fn insert_notification(
        &self,
        id: &str,
        recipient_id: &str,
        kind: NotificationKind,
        text: &str,
        link_id: Option<Uuid>,
    ) -> Result<Notification> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, recipient_id, kind, text, link_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    id,
                    recipient_id,
                    kind.as_str(),
                    text,
                    link_id.map(|l| l.to_string()),
                    now_timestamp(),
                ],
            )?;
            let sql = format!("SELECT {} FROM notifications WHERE id = ?1", NOTIFICATION_COLUMNS);
            conn.query_row(&sql, [id], notification_from_row)
                .optional()?
                .ok_or_else(|| anyhow!("Notification vanished after insert: {}", id))
        })
    }

    /// The recipient's inbox, newest first.
    pub fn list_notifications(&self, recipient_id: &str) -> Result<Vec<Notification>> {
        self.with_conn(|conn| query_inbox(conn, recipient_id))
    }

    pub fn mark_notification_read(&self, id: &str, recipient_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET read = 1 WHERE id = ?1 AND recipient_id = ?2",
                (id, recipient_id),
            )?;
            Ok(changed > 0)
        })
    }

    /// Returns how many notifications flipped to read.
    pub fn mark_all_read(&self, recipient_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET read = 1 WHERE recipient_id = ?1 AND read = 0",
                [recipient_id],
            )?;
            Ok(changed)
        })
    }

    pub fn delete_notification(&self, id: &str, recipient_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM notifications WHERE id = ?1 AND recipient_id = ?2",
                (id, recipient_id),
            )?;
            Ok(changed > 0)
        })
    }
}

fn query_inbox(conn: &Connection, recipient_id: &str) -> Result<Vec<Notification>> {
    let sql = format!(
        "SELECT {} FROM notifications WHERE recipient_id = ?1 ORDER BY created_at DESC, rowid DESC",
        NOTIFICATION_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([recipient_id], notification_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    let id: String = row.get(0)?;
    let kind: String = row.get(1)?;
    let link_id: Option<String> = row.get(3)?;
    let created_at: String = row.get(5)?;

    let kind = NotificationKind::parse(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, format!("unknown kind '{}'", kind).into())
    })?;

    Ok(Notification {
        id: parse_uuid(&id, "notification id"),
        kind,
        text: row.get(2)?,
        link_id: link_id.as_deref().map(|l| parse_uuid(l, "link_id")),
        read: row.get(4)?,
        created_at: parse_timestamp(&created_at, &id),
    })
}

use crate::Database;
use crate::models::{now_timestamp, parse_timestamp, parse_uuid};
use anyhow::Result;
use memento_core::reactions::{ReactionMap, apply_reaction};
use memento_types::models::ChatMessage;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::warn;
use uuid::Uuid;

const MESSAGE_SELECT: &str = "
    SELECT m.id, m.author_id, COALESCE(p.full_name, u.username, 'unknown'),
           m.body, m.created_at, m.deleted, m.edited, m.reactions
    FROM messages m
    LEFT JOIN users u ON u.id = m.author_id
    LEFT JOIN profiles p ON p.user_id = m.author_id";

impl Database {
    pub fn insert_message(&self, id: &str, author_id: &str, body: &str) -> Result<ChatMessage> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, author_id, body, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id, author_id, body, now_timestamp()),
            )?;
            query_message(conn, id)?.ok_or_else(|| anyhow::anyhow!("Message vanished after insert: {}", id))
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<ChatMessage>> {
        self.with_conn(|conn| query_message(conn, id))
    }

    /// Newest first. `before` is the `created_at` of the oldest message on the
    /// previous page.
    pub fn get_messages(&self, limit: u32, before: Option<&str>) -> Result<Vec<ChatMessage>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE (?1 IS NULL OR m.created_at < ?1) ORDER BY m.created_at DESC, m.rowid DESC LIMIT ?2",
                MESSAGE_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![before, limit], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Only the author may edit, and only while the message is not deleted.
    /// Returns `None` when nothing matched.
    pub fn edit_message(&self, id: &str, author_id: &str, body: &str) -> Result<Option<ChatMessage>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET body = ?3, edited = 1
                 WHERE id = ?1 AND author_id = ?2 AND deleted = 0",
                (id, author_id, body),
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_message(conn, id)
        })
    }

    /// Soft delete. The row stays in the timeline with its text cleared.
    pub fn soft_delete_message(&self, id: &str, author_id: &str) -> Result<Option<ChatMessage>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET deleted = 1, body = ''
                 WHERE id = ?1 AND author_id = ?2 AND deleted = 0",
                (id, author_id),
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_message(conn, id)
        })
    }

    /// Toggle `actor`'s reaction inside one write transaction and return the
    /// stored map. `None` if the message is missing or deleted.
    pub fn react_to_message(&self, id: &str, actor: Uuid, symbol: &str) -> Result<Option<ReactionMap>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let raw: Option<String> = tx
                .query_row(
                    "SELECT reactions FROM messages WHERE id = ?1 AND deleted = 0",
                    [id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(raw) = raw else {
                return Ok(None);
            };

            let current = parse_reactions(&raw, id);
            let next = apply_reaction(&current, actor, symbol);

            tx.execute(
                "UPDATE messages SET reactions = ?2 WHERE id = ?1",
                (id, serde_json::to_string(&next)?),
            )?;
            tx.commit()?;

            Ok(Some(next))
        })
    }
}

fn query_message(conn: &Connection, id: &str) -> Result<Option<ChatMessage>> {
    let sql = format!("{} WHERE m.id = ?1", MESSAGE_SELECT);
    let message = conn.query_row(&sql, [id], message_from_row).optional()?;
    Ok(message)
}

/// Unreadable JSON counts as no reactions; the next toggle overwrites it.
fn parse_reactions(raw: &str, message_id: &str) -> ReactionMap {
    serde_json::from_str::<ReactionMap>(raw)
        .map(ReactionMap::normalized)
        .unwrap_or_else(|e| {
            warn!("Corrupt reactions on message '{}': {}", message_id, e);
            ReactionMap::new()
        })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    let id: String = row.get(0)?;
    let author_id: String = row.get(1)?;
    let created_at: String = row.get(4)?;
    let reactions: String = row.get(7)?;

    let reactions = parse_reactions(&reactions, &id);

    Ok(ChatMessage {
        author_id: parse_uuid(&author_id, "author_id"),
        author_name: row.get(2)?,
        body: row.get(3)?,
        created_at: parse_timestamp(&created_at, &id),
        deleted: row.get(5)?,
        edited: row.get(6)?,
        reactions,
        id: parse_uuid(&id, "message id"),
    })
}

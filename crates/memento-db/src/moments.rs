use crate::Database;
use crate::models::{now_timestamp, parse_timestamp, parse_uuid};
use anyhow::Result;
use memento_core::feed::{LikeState, UserAction, VoteAction, apply_like_dislike};
use memento_types::models::{Comment, Moment};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior};

const MOMENT_SELECT: &str = "
    SELECT m.id, m.author_id, COALESCE(p.full_name, u.username, 'unknown'),
           m.body, m.created_at, m.like_count, m.dislike_count, m.comment_count
    FROM moments m
    LEFT JOIN users u ON u.id = m.author_id
    LEFT JOIN profiles p ON p.user_id = m.author_id";

impl Database {
    pub fn insert_moment(&self, id: &str, author_id: &str, body: &str) -> Result<Moment> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO moments (id, author_id, body, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id, author_id, body, now_timestamp()),
            )?;
            query_moment(conn, id)?.ok_or_else(|| anyhow::anyhow!("Moment vanished after insert: {}", id))
        })
    }

    pub fn get_moment(&self, id: &str) -> Result<Option<Moment>> {
        self.with_conn(|conn| query_moment(conn, id))
    }

    /// Newest first.
    pub fn list_moments(&self, limit: u32) -> Result<Vec<Moment>> {
        self.with_conn(|conn| {
            let sql = format!("{} ORDER BY m.created_at DESC, m.rowid DESC LIMIT ?1", MOMENT_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([limit], moment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Read the stored counters, run the like/dislike transition with the
    /// viewer's in-memory `user_action`, and write the result back, all in
    /// one transaction. `None` if the moment does not exist.
    pub fn vote_on_moment(
        &self,
        id: &str,
        user_action: UserAction,
        action: VoteAction,
    ) -> Result<Option<LikeState>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let counts: Option<(i64, i64)> = tx
                .query_row(
                    "SELECT like_count, dislike_count FROM moments WHERE id = ?1",
                    [id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let Some((like_count, dislike_count)) = counts else {
                return Ok(None);
            };

            let current = LikeState { like_count, dislike_count, user_action };
            let next = apply_like_dislike(current, action);

            tx.execute(
                "UPDATE moments SET like_count = ?2, dislike_count = ?3 WHERE id = ?1",
                (id, next.like_count, next.dislike_count),
            )?;
            tx.commit()?;

            Ok(Some(next))
        })
    }

    /// Insert a comment and bump the moment's counter together. `None` if the
    /// moment does not exist.
    pub fn add_comment(&self, id: &str, moment_id: &str, author_id: &str, body: &str) -> Result<Option<Comment>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let bumped = tx.execute(
                "UPDATE moments SET comment_count = comment_count + 1 WHERE id = ?1",
                [moment_id],
            )?;
            if bumped == 0 {
                return Ok(None);
            }

            tx.execute(
                "INSERT INTO comments (id, moment_id, author_id, body, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, moment_id, author_id, body, now_timestamp()),
            )?;
            let comment = query_comments(&tx, moment_id, Some(id))?.pop();
            tx.commit()?;

            Ok(comment)
        })
    }

    /// Oldest first, as a thread reads.
    pub fn list_comments(&self, moment_id: &str) -> Result<Vec<Comment>> {
        self.with_conn(|conn| query_comments(conn, moment_id, None))
    }
}

fn query_moment(conn: &Connection, id: &str) -> Result<Option<Moment>> {
    let sql = format!("{} WHERE m.id = ?1", MOMENT_SELECT);
    let moment = conn.query_row(&sql, [id], moment_from_row).optional()?;
    Ok(moment)
}

fn moment_from_row(row: &Row<'_>) -> rusqlite::Result<Moment> {
    let id: String = row.get(0)?;
    let author_id: String = row.get(1)?;
    let created_at: String = row.get(4)?;

    Ok(Moment {
        id: parse_uuid(&id, "moment id"),
        author_id: parse_uuid(&author_id, "author_id"),
        author_name: row.get(2)?,
        body: row.get(3)?,
        created_at: parse_timestamp(&created_at, &id),
        like_count: row.get(5)?,
        dislike_count: row.get(6)?,
        comment_count: row.get(7)?,
    })
}

fn query_comments(conn: &Connection, moment_id: &str, only: Option<&str>) -> Result<Vec<Comment>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.moment_id, c.author_id, COALESCE(p.full_name, u.username, 'unknown'),
                c.body, c.created_at
         FROM comments c
         LEFT JOIN users u ON u.id = c.author_id
         LEFT JOIN profiles p ON p.user_id = c.author_id
         WHERE c.moment_id = ?1 AND (?2 IS NULL OR c.id = ?2)
         ORDER BY c.created_at ASC, c.rowid ASC",
    )?;

    let rows = stmt
        .query_map(rusqlite::params![moment_id, only], |row| {
            let id: String = row.get(0)?;
            let moment_id: String = row.get(1)?;
            let author_id: String = row.get(2)?;
            let created_at: String = row.get(5)?;
            Ok(Comment {
                id: parse_uuid(&id, "comment id"),
                moment_id: parse_uuid(&moment_id, "moment_id"),
                author_id: parse_uuid(&author_id, "author_id"),
                author_name: row.get(3)?,
                body: row.get(4)?,
                created_at: parse_timestamp(&created_at, &id),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::seed_user;
    use uuid::Uuid;

    fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    #[test]
    fn votes_persist_counts_not_viewer_state() {
        let db = Database::open_in_memory().unwrap();
        let ada = seed_user(&db, "ada");
        let moment = db.insert_moment(&new_id(), &ada, "graduation day").unwrap();
        let id = moment.id.to_string();

        let s = db.vote_on_moment(&id, UserAction::None, VoteAction::Like).unwrap().unwrap();
        assert_eq!((s.like_count, s.dislike_count, s.user_action), (1, 0, UserAction::Liked));

        // A second viewer dislikes.
        let s = db.vote_on_moment(&id, UserAction::None, VoteAction::Dislike).unwrap().unwrap();
        assert_eq!((s.like_count, s.dislike_count), (1, 1));

        // First viewer switches to dislike.
        let s = db.vote_on_moment(&id, UserAction::Liked, VoteAction::Dislike).unwrap().unwrap();
        assert_eq!((s.like_count, s.dislike_count), (0, 2));

        let stored = db.get_moment(&id).unwrap().unwrap();
        assert_eq!(stored.like_state(), LikeState::new(0, 2));
    }

    #[test]
    fn stale_viewer_state_cannot_go_negative() {
        let db = Database::open_in_memory().unwrap();
        let ada = seed_user(&db, "ada");
        let id = db.insert_moment(&new_id(), &ada, "x").unwrap().id.to_string();

        let s = db.vote_on_moment(&id, UserAction::Liked, VoteAction::Like).unwrap().unwrap();
        assert_eq!((s.like_count, s.dislike_count), (0, 0));
        assert!(db.vote_on_moment(&new_id(), UserAction::None, VoteAction::Like).unwrap().is_none());
    }

    #[test]
    fn comments_bump_counter() {
        let db = Database::open_in_memory().unwrap();
        let ada = seed_user(&db, "ada");
        let bob = seed_user(&db, "bob");
        let moment_id = db.insert_moment(&new_id(), &ada, "new lab").unwrap().id.to_string();

        let first = db.add_comment(&new_id(), &moment_id, &bob, "nice").unwrap().unwrap();
        assert_eq!(first.author_name, "bob");
        db.add_comment(&new_id(), &moment_id, &ada, "thanks").unwrap().unwrap();

        let comments = db.list_comments(&moment_id).unwrap();
        assert_eq!(comments.iter().map(|c| c.body.as_str()).collect::<Vec<_>>(), vec!["nice", "thanks"]);
        assert_eq!(db.get_moment(&moment_id).unwrap().unwrap().comment_count, 2);

        assert!(db.add_comment(&new_id(), &new_id(), &bob, "lost").unwrap().is_none());
    }

    #[test]
    fn list_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let ada = seed_user(&db, "ada");
        for body in ["a", "b", "c"] {
            db.insert_moment(&new_id(), &ada, body).unwrap();
        }
        let listed = db.list_moments(2).unwrap();
        assert_eq!(listed.iter().map(|m| m.body.as_str()).collect::<Vec<_>>(), vec!["c", "b"]);
    }
}

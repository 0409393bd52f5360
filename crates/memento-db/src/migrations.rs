use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS profiles (
            user_id         TEXT PRIMARY KEY REFERENCES users(id),
            full_name       TEXT,
            student_id      TEXT,
            batch           TEXT,
            standing        TEXT NOT NULL DEFAULT 'student',
            bio             TEXT,
            hometown        TEXT,
            current_city    TEXT,
            email           TEXT,
            phone           TEXT,
            website         TEXT,
            facebook        TEXT,
            linkedin        TEXT,
            github          TEXT,
            instagram       TEXT
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            author_id   TEXT NOT NULL REFERENCES users(id),
            body        TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            deleted     INTEGER NOT NULL DEFAULT 0,
            edited      INTEGER NOT NULL DEFAULT 0,
            reactions   TEXT NOT NULL DEFAULT '{}'
        );

        CREATE INDEX IF NOT EXISTS idx_messages_created
            ON messages(created_at);

        CREATE TABLE IF NOT EXISTS moments (
            id              TEXT PRIMARY KEY,
            author_id       TEXT NOT NULL REFERENCES users(id),
            body            TEXT NOT NULL,
            created_at      TEXT NOT NULL,
            like_count      INTEGER NOT NULL DEFAULT 0,
            dislike_count   INTEGER NOT NULL DEFAULT 0,
            comment_count   INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_moments_created
            ON moments(created_at);

        CREATE TABLE IF NOT EXISTS comments (
            id          TEXT PRIMARY KEY,
            moment_id   TEXT NOT NULL REFERENCES moments(id),
            author_id   TEXT NOT NULL REFERENCES users(id),
            body        TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_comments_moment
            ON comments(moment_id, created_at);

        CREATE TABLE IF NOT EXISTS notifications (
            id              TEXT PRIMARY KEY,
            recipient_id    TEXT NOT NULL REFERENCES users(id),
            kind            TEXT NOT NULL,
            text            TEXT NOT NULL,
            link_id         TEXT,
            read            INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_recipient
            ON notifications(recipient_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}

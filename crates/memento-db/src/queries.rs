use crate::Database;
use crate::models::{UserRow, now_timestamp, parse_uuid};
use anyhow::Result;
use memento_types::models::{Contact, DirectoryRecord, Identity, Location, Standing};
use rusqlite::{Connection, OptionalExtension, Row};

const PROFILE_COLUMNS: &str = "user_id, full_name, student_id, batch, standing, bio, \
     hometown, current_city, email, phone, website, facebook, linkedin, github, instagram";

impl Database {
    // -- Users --

    /// Creates the account together with its (empty) directory record.
    /// Returns false if the username is already taken.
    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT INTO users (id, username, password, created_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(username) DO NOTHING",
                (id, username, password_hash, now_timestamp()),
            )?;
            if inserted == 0 {
                return Ok(false);
            }
            tx.execute("INSERT INTO profiles (user_id) VALUES (?1)", [id])?;
            tx.commit()?;
            Ok(true)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Profiles --

    pub fn get_profile(&self, user_id: &str) -> Result<Option<DirectoryRecord>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM profiles WHERE user_id = ?1", PROFILE_COLUMNS);
            let record = conn.query_row(&sql, [user_id], profile_from_row).optional()?;
            Ok(record)
        })
    }

    /// Replace every field group of a profile. Blank strings are stored as NULL.
    /// Returns false when there is no such profile.
    pub fn update_profile(
        &self,
        user_id: &str,
        identity: &Identity,
        location: &Location,
        contact: &Contact,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE profiles SET
                    full_name = ?2, student_id = ?3, batch = ?4, standing = ?5, bio = ?6,
                    hometown = ?7, current_city = ?8,
                    email = ?9, phone = ?10, website = ?11, facebook = ?12,
                    linkedin = ?13, github = ?14, instagram = ?15
                 WHERE user_id = ?1",
                rusqlite::params![
                    user_id,
                    non_blank(&identity.full_name),
                    non_blank(&identity.student_id),
                    non_blank(&identity.batch),
                    standing_str(identity.standing),
                    non_blank(&identity.bio),
                    non_blank(&location.hometown),
                    non_blank(&location.current_city),
                    non_blank(&contact.email),
                    non_blank(&contact.phone),
                    non_blank(&contact.website),
                    non_blank(&contact.facebook),
                    non_blank(&contact.linkedin),
                    non_blank(&contact.github),
                    non_blank(&contact.instagram),
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// All directory records in registration order.
    pub fn list_profiles(&self) -> Result<Vec<DirectoryRecord>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM profiles ORDER BY rowid", PROFILE_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], profile_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, password, created_at FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<DirectoryRecord> {
    let id: String = row.get(0)?;
    let standing: String = row.get(4)?;

    Ok(DirectoryRecord {
        id: parse_uuid(&id, "profile user_id"),
        identity: Identity {
            full_name: row.get(1)?,
            student_id: row.get(2)?,
            batch: row.get(3)?,
            standing: if standing == "alumni" { Standing::Alumni } else { Standing::Student },
            bio: row.get(5)?,
        },
        location: Location {
            hometown: row.get(6)?,
            current_city: row.get(7)?,
        },
        contact: Contact {
            email: row.get(8)?,
            phone: row.get(9)?,
            website: row.get(10)?,
            facebook: row.get(11)?,
            linkedin: row.get(12)?,
            github: row.get(13)?,
            instagram: row.get(14)?,
        },
    })
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn standing_str(standing: Standing) -> &'static str {
    match standing {
        Standing::Student => "student",
        Standing::Alumni => "alumni",
    }
}

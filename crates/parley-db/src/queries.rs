use crate::Database;
use crate::models::{MessageRow, UserRow};
use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, Row, params};
use tracing::debug;

impl Database {
    // -- Users --

    /// Insert a user unless the username is already taken. Returns `None` on
    /// a taken username; the lookup and the insert share one transaction.
    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<Option<UserRow>> {
        self.with_tx(|tx| {
            if query_user_by_username(tx, username)?.is_some() {
                return Ok(None);
            }

            tx.execute(
                "INSERT INTO users (username, password_hash) VALUES (?1, ?2)",
                (username, password_hash),
            )?;

            Ok(Some(UserRow {
                id: tx.last_insert_rowid(),
                username: username.to_string(),
                password_hash: password_hash.to_string(),
            }))
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    /// Every user except `user_id`, ordered by id.
    pub fn list_users_except(&self, user_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, password_hash FROM users WHERE id != ?1 ORDER BY id ASC",
            )?;

            let rows = stmt
                .query_map([user_id], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, sender_id: i64, receiver_id: i64, content: &str) -> Result<MessageRow> {
        self.with_tx(|tx| {
            let timestamp = next_timestamp(tx)?;

            tx.execute(
                "INSERT INTO messages (content, sender_id, receiver_id, timestamp, is_read)
                 VALUES (?1, ?2, ?3, ?4, 0)",
                params![content, sender_id, receiver_id, &timestamp],
            )?;

            Ok(MessageRow {
                id: tx.last_insert_rowid(),
                content: content.to_string(),
                sender_id,
                receiver_id,
                timestamp,
                is_read: false,
            })
        })
    }

    /// Fetch the conversation between `user_id` and `other_id`, marking the
    /// messages `user_id` received as read. The flip and the select commit
    /// together, and the returned rows carry the updated flags.
    pub fn read_conversation(&self, user_id: i64, other_id: i64) -> Result<Vec<MessageRow>> {
        self.with_tx(|tx| {
            let flipped = tx.execute(
                "UPDATE messages SET is_read = 1
                 WHERE sender_id = ?1 AND receiver_id = ?2 AND is_read = 0",
                params![other_id, user_id],
            )?;
            if flipped > 0 {
                debug!("Marked {} messages from {} to {} as read", flipped, other_id, user_id);
            }

            query_conversation(tx, user_id, other_id)
        })
    }

    pub fn unread_count(&self, user_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE receiver_id = ?1 AND is_read = 0",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
    })
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, password_hash FROM users WHERE username = ?1")?;

    let row = stmt.query_row([username], user_from_row).optional()?;

    Ok(row)
}

fn query_conversation(conn: &Connection, user_id: i64, other_id: i64) -> Result<Vec<MessageRow>> {
    // Timestamps can collide at microsecond resolution, so id breaks ties.
    let mut stmt = conn.prepare(
        "SELECT id, content, sender_id, receiver_id, timestamp, is_read
         FROM messages
         WHERE (sender_id = ?1 AND receiver_id = ?2)
            OR (sender_id = ?2 AND receiver_id = ?1)
         ORDER BY timestamp ASC, id ASC",
    )?;

    let rows = stmt
        .query_map(params![user_id, other_id], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                content: row.get(1)?,
                sender_id: row.get(2)?,
                receiver_id: row.get(3)?,
                timestamp: row.get(4)?,
                is_read: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Current UTC time, clamped so it never sorts before the newest stored message.
fn next_timestamp(conn: &Connection) -> Result<String> {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

    let latest: Option<String> =
        conn.query_row("SELECT MAX(timestamp) FROM messages", [], |row| row.get(0))?;

    Ok(match latest {
        Some(latest) if latest > now => latest,
        _ => now,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, messages)");
        // Foreign keys are declared for documentation only; `Database` turns
        // enforcement off on every connection.
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                username        TEXT NOT NULL UNIQUE,
                password_hash   TEXT NOT NULL
            );

            CREATE TABLE messages (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                content         TEXT NOT NULL,
                sender_id       INTEGER NOT NULL REFERENCES users(id),
                receiver_id     INTEGER NOT NULL REFERENCES users(id),
                timestamp       TEXT NOT NULL,
                is_read         INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_messages_pair
                ON messages(sender_id, receiver_id, timestamp);

            CREATE INDEX idx_messages_unread
                ON messages(receiver_id, is_read);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

//! Database row types. These map directly to SQLite rows and stay
//! independent of the parley-types wire models.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub content: String,
    pub sender_id: i64,
    pub receiver_id: i64,
    /// RFC 3339 UTC with microseconds; lexical order equals time order.
    pub timestamp: String,
    pub is_read: bool,
}

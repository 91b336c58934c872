use std::collections::HashMap;
use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

pub const SESSION_COOKIE: &str = "session";

/// Identity bound to a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
}

struct SessionEntry {
    user: SessionUser,
    expires_at: DateTime<Utc>,
}

/// Server-side sessions keyed by opaque token.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
                ttl,
            }),
        }
    }

    /// Start a session for `user` and return its token.
    pub async fn create(&self, user: SessionUser) -> String {
        let token = generate_token();
        let entry = SessionEntry {
            user,
            expires_at: Utc::now() + self.inner.ttl,
        };
        self.inner.sessions.write().await.insert(token.clone(), entry);
        token
    }

    /// Look up a live session. Expired entries are evicted here.
    pub async fn get(&self, token: &str) -> Option<SessionUser> {
        {
            let sessions = self.inner.sessions.read().await;
            match sessions.get(token) {
                None => return None,
                Some(entry) if entry.expires_at > Utc::now() => return Some(entry.user.clone()),
                Some(_) => {}
            }
        }

        self.inner.sessions.write().await.remove(token);
        None
    }

    /// Returns whether a session was removed.
    pub async fn destroy(&self, token: &str) -> bool {
        self.inner.sessions.write().await.remove(token).is_some()
    }

    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.inner.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        before - sessions.len()
    }

    pub async fn count(&self) -> usize {
        self.inner.sessions.read().await.len()
    }
}

fn generate_token() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>())
}

/// Cookie carrying `token`, without `Max-Age`. Browsers drop `SameSite=None`
/// cookies that are not `Secure`, so insecure cookies fall back to `Lax`.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    let same_site = if secure { SameSite::None } else { SameSite::Lax };
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(same_site)
        .secure(secure)
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

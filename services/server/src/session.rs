//! Server-side session store
//!
//! Sessions map an opaque 128-bit hex token, carried in a cookie, to a user
//! id. State is process-local; restarting the service logs everyone out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

#[derive(Debug)]
struct SessionEntry {
    user_id: Uuid,
    expires_at: Instant,
}

/// In-memory session store with a fixed TTL per session
#[derive(Debug, Clone)]
pub struct SessionStore {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<String, SessionEntry>>>,
}

impl SessionStore {
    /// Create a new session store
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a session for `user_id` and return its token.
    pub async fn create(&self, user_id: Uuid) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let mut entries = self.entries.lock().await;
        entries.insert(
            token.clone(),
            SessionEntry {
                user_id,
                expires_at: Instant::now() + self.ttl,
            },
        );
        info!("Created session for user {}", user_id);
        token
    }

    /// Resolve a token to its user id. Expired sessions are dropped on
    /// access.
    pub async fn resolve(&self, token: &str) -> Option<Uuid> {
        let mut entries = self.entries.lock().await;
        match entries.get(token) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.user_id),
            Some(_) => {
                entries.remove(token);
                None
            }
            None => None,
        }
    }

    /// Revoke a session token.
    pub async fn revoke(&self, token: &str) {
        let mut entries = self.entries.lock().await;
        if entries.remove(token).is_some() {
            info!("Session revoked");
        }
    }
}

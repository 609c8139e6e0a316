use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use tracing::{debug, warn};

use crate::session::store::{
    new_session_id, Session, SessionHandle, SessionStore, SessionStoreError,
};

pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug)]
struct Entry {
    handle: SessionHandle,
    last_accessed: DateTime<Utc>,
}

/// In-memory implementation of SessionStore.
///
/// Holds at most `capacity` sessions, evicting the least recently used one
/// when full. With an idle TTL, a session not accessed within it is treated
/// as missing.
#[derive(Debug)]
pub struct InMemorySessionStore {
    sessions: Arc<Mutex<LruCache<String, Entry>>>,
    idle_ttl: Option<Duration>,
}

impl InMemorySessionStore {
    /// Create a new InMemorySessionStore. A zero capacity is treated as one.
    pub fn new(capacity: usize, idle_ttl: Option<Duration>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            sessions: Arc::new(Mutex::new(LruCache::new(capacity))),
            idle_ttl,
        }
    }

    fn is_expired(&self, entry: &Entry, now: DateTime<Utc>) -> bool {
        self.idle_ttl
            .is_some_and(|ttl| now - entry.last_accessed > ttl)
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, LruCache<String, Entry>>, SessionStoreError> {
        self.sessions.lock().map_err(|e| {
            SessionStoreError::StorageError(format!("Failed to acquire session lock: {}", e))
        })
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, None)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self) -> Result<SessionHandle, SessionStoreError> {
        let mut sessions = self.lock()?;

        let mut id = new_session_id();
        while sessions.contains(&id) {
            id = new_session_id();
        }

        let handle = SessionHandle::new(Session::new(id.clone()));
        let entry = Entry {
            handle: handle.clone(),
            last_accessed: Utc::now(),
        };

        if let Some((evicted, _)) = sessions.push(id, entry) {
            debug!(session_id = %evicted, "Evicted least recently used session");
        }
        debug!(session_id = handle.id(), "Created session");

        Ok(handle)
    }

    async fn get_session(&self, id: &str) -> Result<SessionHandle, SessionStoreError> {
        let mut sessions = self.lock()?;
        let now = Utc::now();

        let expired = match sessions.peek(id) {
            Some(entry) => self.is_expired(entry, now),
            None => return Err(SessionStoreError::NotFound(id.to_string())),
        };

        if expired {
            sessions.pop(id);
            debug!(session_id = id, "Session expired on lookup");
            return Err(SessionStoreError::NotFound(id.to_string()));
        }

        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| SessionStoreError::NotFound(id.to_string()))?;
        entry.last_accessed = now;

        Ok(entry.handle.clone())
    }

    async fn cleanup_expired_sessions(&self) -> Result<usize, SessionStoreError> {
        let mut sessions = self.lock()?;
        let now = Utc::now();

        let expired_ids: Vec<String> = sessions
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(id, _)| id.clone())
            .collect();

        let count = expired_ids.len();
        for id in expired_ids {
            sessions.pop(&id);
            debug!(session_id = %id, "Cleaned up expired session");
        }

        if count > 0 {
            warn!(count, "Cleaned up expired sessions");
        }

        Ok(count)
    }

    async fn len(&self) -> Result<usize, SessionStoreError> {
        Ok(self.lock()?.len())
    }
}

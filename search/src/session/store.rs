use std::error::Error;
use std::fmt::{Debug, Display};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::citations::Citation;

/// Length of generated session identifiers, in hex characters.
pub const SESSION_ID_LEN: usize = 16;

/// Error type for session store operations
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStoreError {
    /// Session not found (never created, evicted or expired)
    NotFound(String),
    /// Error occurred during a store operation
    StorageError(String),
}

impl Display for SessionStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStoreError::NotFound(id) => write!(f, "Session not found: {}", id),
            SessionStoreError::StorageError(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl Error for SessionStoreError {}

/// One query/answer exchange. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub query: String,
    pub raw_answer: String,
    pub citations: Vec<Citation>,
}

/// A grounded conversation and its transcript.
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session identifier
    pub id: String,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// Last time a turn was appended
    pub updated_at: DateTime<Utc>,
    /// Whether turns are sent with web-search grounding enabled
    pub grounded: bool,
    turns: Vec<ConversationTurn>,
}

impl Session {
    /// Create a new, search-enabled session with the given ID
    pub fn new(id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            updated_at: now,
            grounded: true,
            turns: Vec::new(),
        }
    }

    /// The transcript, oldest turn first.
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn push_turn(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
        self.updated_at = Utc::now();
    }
}

/// Shared, lockable reference to a live session.
///
/// Holding the lock for the duration of a turn serializes concurrent
/// follow-ups on the same identifier.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Arc<str>,
    inner: Arc<Mutex<Session>>,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            id: Arc::from(session.id.as_str()),
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.lock().await
    }

    /// Whether both handles refer to the same live session.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Generates an opaque identifier, unique with overwhelming probability.
pub fn new_session_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(SESSION_ID_LEN);
    id
}

/// Trait defining the interface for session stores
#[async_trait]
pub trait SessionStore: Send + Sync + Debug {
    /// Register a fresh, empty session under a newly generated ID
    async fn create_session(&self) -> Result<SessionHandle, SessionStoreError>;

    /// Get a session by ID, refreshing its last-access time
    async fn get_session(&self, id: &str) -> Result<SessionHandle, SessionStoreError>;

    /// Drop sessions idle past the store's expiry, returning how many were removed
    async fn cleanup_expired_sessions(&self) -> Result<usize, SessionStoreError>;

    /// Number of sessions currently held
    async fn len(&self) -> Result<usize, SessionStoreError>;
}

/// Type alias for Arc-wrapped SessionStore trait objects
pub type SessionStoreRef = Arc<dyn SessionStore>;

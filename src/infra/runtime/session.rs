use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::core::mcp::ClientInfo;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initialized,
}

/// Per-client conversational state, keyed by session id.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub initialized: bool,
    pub client_info: Option<ClientInfo>,
}

impl Session {
    fn new(now: DateTime<Utc>) -> Self {
        Self { created_at: now, last_activity: now, initialized: false, client_info: None }
    }

    pub fn state(&self) -> SessionState {
        if self.initialized {
            SessionState::Initialized
        } else {
            SessionState::Uninitialized
        }
    }
}

/// Result of resolving a client-supplied session id.
#[derive(Debug, Clone)]
pub struct SessionLookup {
    pub id: String,
    pub session: Session,
    /// True when a fresh session was minted (no id, or an unknown one).
    pub is_new: bool,
}

pub trait SessionStore: Send + Sync {
    /// Resolve `id` and refresh its activity, or mint a new session.
    fn get_or_create(&self, id: Option<&str>) -> SessionLookup;
    fn get(&self, id: &str) -> Option<Session>;
    /// Refresh activity on an existing session; false when it does not exist.
    fn touch(&self, id: &str) -> bool;
    /// Flip to `Initialized`. `client_info`, when given, replaces the recorded metadata.
    fn mark_initialized(&self, id: &str, client_info: Option<ClientInfo>) -> bool;
    fn terminate(&self, id: &str) -> bool;
    /// Drop sessions idle for strictly longer than the TTL. Returns how many were removed.
    fn sweep(&self, now: DateTime<Utc>) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
pub struct InMemorySessionStore {
    inner: Arc<RwLock<HashMap<String, Session>>>,
    ttl: chrono::Duration,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::weeks(52 * 100));
        Self { inner: Arc::new(RwLock::new(HashMap::new())), ttl }
    }

    fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Same as [`SessionStore::get_or_create`] with an explicit clock, for tests.
    pub fn get_or_create_at(&self, id: Option<&str>, now: DateTime<Utc>) -> SessionLookup {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some((id, session)) = id.and_then(|id| map.get_mut(id).map(|s| (id, s))) {
            session.last_activity = now;
            return SessionLookup { id: id.to_owned(), session: session.clone(), is_new: false };
        }
        let id = Self::new_id();
        let session = Session::new(now);
        map.insert(id.clone(), session.clone());
        tracing::debug!(session_id = %id, "session created");
        SessionLookup { id, session, is_new: true }
    }
}

impl SessionStore for InMemorySessionStore {
    fn get_or_create(&self, id: Option<&str>) -> SessionLookup {
        self.get_or_create_at(id, Utc::now())
    }

    fn get(&self, id: &str) -> Option<Session> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).get(id).cloned()
    }

    fn touch(&self, id: &str) -> bool {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match map.get_mut(id) {
            Some(s) => {
                s.last_activity = Utc::now();
                true
            }
            None => false,
        }
    }

    fn mark_initialized(&self, id: &str, client_info: Option<ClientInfo>) -> bool {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match map.get_mut(id) {
            Some(s) => {
                s.initialized = true;
                if client_info.is_some() {
                    s.client_info = client_info;
                }
                s.last_activity = Utc::now();
                true
            }
            None => false,
        }
    }

    fn terminate(&self, id: &str) -> bool {
        let removed = self.inner.write().unwrap_or_else(PoisonError::into_inner).remove(id).is_some();
        if removed {
            tracing::debug!(session_id = %id, "session terminated");
        }
        removed
    }

    fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let before = map.len();
        map.retain(|_, s| now - s.last_activity <= self.ttl);
        before - map.len()
    }

    fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Periodically evict idle sessions. The first tick fires one full interval after start.
pub fn spawn_sweeper(store: Arc<dyn SessionStore>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = store.sweep(Utc::now());
            if removed > 0 {
                tracing::info!(removed, remaining = store.len(), "expired sessions swept");
            }
        }
    })
}

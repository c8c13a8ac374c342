//! In-memory session registry with idle expiry and an LRU size cap.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::quark::quiz::Session;

/// Shared handle to one user's session. Holding the lock serializes
/// requests for that user.
pub type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

struct Entry {
    session: SessionHandle,
    last_seen: Instant,
}

impl Entry {
    /// A request elsewhere still holds a clone of the handle.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.session) > 1
    }
}

struct Entries {
    map: HashMap<String, Entry>,
    last_sweep: Instant,
}

/// Sessions keyed by user identifier.
///
/// Entries whose handle is still held by a request are never expired or
/// evicted, so a user always maps to a single session. The store may
/// exceed `max_sessions` while every entry is in use.
pub struct SessionStore {
    entries: Mutex<Entries>,
    ttl: Duration,
    sweep_interval: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            ttl,
            sweep_interval: ttl / 10,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Fetch the session for `user_id`, creating an idle one on first contact.
    pub fn get_or_create(&self, user_id: &str) -> SessionHandle {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("session store lock poisoned");

        // Full sweeps are throttled; the requested entry is checked below
        if now.duration_since(entries.last_sweep) >= self.sweep_interval {
            entries.last_sweep = now;
            let before = entries.map.len();
            let ttl = self.ttl;
            entries
                .map
                .retain(|_, e| e.in_use() || now.duration_since(e.last_seen) < ttl);
            if entries.map.len() < before {
                debug!("Expired {} idle session(s)", before - entries.map.len());
            }
        }

        if let Some(entry) = entries.map.get_mut(user_id) {
            if !entry.in_use() && now.duration_since(entry.last_seen) >= self.ttl {
                debug!("Session {} expired, starting fresh", user_id);
                entry.session = SessionHandle::default();
            }
            entry.last_seen = now;
            return entry.session.clone();
        }

        if entries.map.len() >= self.max_sessions {
            let oldest = entries
                .map
                .iter()
                .filter(|(_, e)| !e.in_use())
                .min_by_key(|(_, e)| e.last_seen)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(oldest) => {
                    debug!("Evicting least recently used session {}", oldest);
                    entries.map.remove(&oldest);
                }
                None => warn!(
                    "All {} sessions are in use, growing past the cap",
                    entries.map.len()
                ),
            }
        }

        let session = SessionHandle::default();
        entries.map.insert(
            user_id.to_string(),
            Entry {
                session: session.clone(),
                last_seen: now,
            },
        );
        session
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("session store lock poisoned").map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.entries
            .lock()
            .expect("session store lock poisoned")
            .map
            .contains_key(user_id)
    }
}

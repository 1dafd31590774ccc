use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use drm_core::SystemId;

/**
    What the coordinator remembers between issuing a challenge and
    receiving its license.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub session_id: String,
    pub system: SystemId,
    /// Scope the device was selected for, reused on completion.
    pub scope: String,
    /// Content header the challenge was built from.
    pub header: String,
}

/**
    Pending sessions keyed by session id.

    Entries are independent, so one lock over the whole map is enough.
*/
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /**
        Insert or replace the state for `state.session_id`, returning the
        state it replaced.
    */
    pub fn insert(&self, state: SessionState) -> Option<SessionState> {
        self.lock().insert(state.session_id.clone(), state)
    }

    /**
        Remove and return the state for `session_id`.
    */
    pub fn take(&self, session_id: &str) -> Option<SessionState> {
        self.lock().remove(session_id)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.lock().contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the map half-updated.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionState>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(id: &str, header: &str) -> SessionState {
        SessionState {
            session_id: id.into(),
            system: SystemId::PlayReady,
            scope: "example.com".into(),
            header: header.into(),
        }
    }

    #[test]
    fn insert_take() {
        let store = SessionStore::new();
        assert!(store.is_empty());
        assert!(store.insert(state("a", "h1")).is_none());
        assert!(store.contains("a"));
        assert_eq!(store.take("a").unwrap().header, "h1");
        assert!(store.take("a").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn insert_replaces() {
        let store = SessionStore::new();
        store.insert(state("a", "h1"));
        let old = store.insert(state("a", "h2")).unwrap();
        assert_eq!(old.header, "h1");
        assert_eq!(store.len(), 1);
        assert_eq!(store.take("a").unwrap().header, "h2");
    }
}

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use drm_core::SystemId;

use crate::error::{EmeError, EmeResult};
use crate::key::SessionKey;
use crate::store::{SessionState, SessionStore};
use crate::system::{KeySystem, PendingChallenge};

/**
    A challenge issued for a new session.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedChallenge {
    pub session_id: String,
    pub challenge: PendingChallenge,
}

/**
    Outcome of handing a license response to the coordinator.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The session was known and its license yielded keys. `header` is
    /// the one the challenge was built from.
    Keys {
        system: SystemId,
        header: String,
        keys: Vec<SessionKey>,
    },
    /// The session was not issued here; the response is returned untouched
    /// for the page's own CDM.
    Passthrough(Vec<u8>),
}

impl Completion {
    pub fn keys(&self) -> &[SessionKey] {
        match self {
            Self::Keys { keys, .. } => keys,
            Self::Passthrough(_) => &[],
        }
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self, Self::Passthrough(_))
    }
}

/**
    Connects page-side media key sessions to key systems.

    The coordinator remembers which header and scope each issued challenge
    belongs to, so the matching license can be processed with the same
    device. Sessions are removed once completed, whether or not completion
    succeeds.
*/
pub struct Coordinator {
    systems: HashMap<SystemId, Arc<dyn KeySystem>>,
    store: Arc<SessionStore>,
    next_id: AtomicU64,
}

impl Coordinator {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self {
            systems: HashMap::new(),
            store,
            next_id: AtomicU64::new(1),
        }
    }

    /**
        Register a key system, replacing any earlier one for the same id.
    */
    pub fn with_system(mut self, system: impl KeySystem + 'static) -> Self {
        self.systems.insert(system.system_id(), Arc::new(system));
        self
    }

    pub fn supports(&self, system: SystemId) -> bool {
        self.systems.contains_key(&system)
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /**
        Build a challenge under a freshly assigned session id.
    */
    pub fn issue_challenge(
        &self,
        system: SystemId,
        scope: &str,
        init_data: &[u8],
    ) -> EmeResult<IssuedChallenge> {
        let session_id = format!("sess-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let challenge = self.issue_challenge_with_id(&session_id, system, scope, init_data)?;
        Ok(IssuedChallenge {
            session_id,
            challenge,
        })
    }

    /**
        Build a challenge for a session id the page already owns. A pending
        session with the same id is replaced.
    */
    pub fn issue_challenge_with_id(
        &self,
        session_id: &str,
        system: SystemId,
        scope: &str,
        init_data: &[u8],
    ) -> EmeResult<PendingChallenge> {
        let challenge = self.system(system)?.create_challenge(scope, init_data)?;
        let replaced = self.store.insert(SessionState {
            session_id: session_id.to_string(),
            system,
            scope: scope.to_string(),
            header: challenge.header.clone(),
        });
        debug!(
            session_id,
            %system,
            scope,
            replaced = replaced.is_some(),
            "challenge issued"
        );
        Ok(challenge)
    }

    /**
        Process the license response for `session_id`.

        Unknown sessions pass the response through, since the page may be
        running sessions this coordinator never saw.
    */
    pub fn complete_session(&self, session_id: &str, response: &[u8]) -> EmeResult<Completion> {
        let Some(state) = self.store.take(session_id) else {
            debug!(session_id, "unknown session, passing response through");
            return Ok(Completion::Passthrough(response.to_vec()));
        };

        let keys = self
            .system(state.system)?
            .complete(&state.scope, &state.header, response)?;
        info!(
            session_id,
            system = %state.system,
            keys = keys.len(),
            "session completed"
        );
        Ok(Completion::Keys {
            system: state.system,
            header: state.header,
            keys,
        })
    }

    /**
        Forget a pending session.
    */
    pub fn cancel(&self, session_id: &str) -> EmeResult<()> {
        self.store
            .take(session_id)
            .map(|_| ())
            .ok_or_else(|| EmeError::UnknownSession(session_id.to_string()))
    }

    fn system(&self, system: SystemId) -> EmeResult<&Arc<dyn KeySystem>> {
        self.systems
            .get(&system)
            .ok_or(EmeError::UnsupportedSystem(system))
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("systems", &self.systems.keys().collect::<Vec<_>>())
            .field("pending", &self.store.len())
            .finish()
    }
}

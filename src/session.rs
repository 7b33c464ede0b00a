//! Conversation sessions, keyed by channel or user id.
//!
//! The registry is an owned value (no globals). A session lives from its
//! first use until it is cleared; there is no expiry.

use crate::backend::Turn;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// One conversation: an ordered history of turns.
///
/// The history lock is async so a caller can hold it across the remote
/// call; turns of the same session never interleave.
#[derive(Debug)]
pub struct Session {
    id: String,
    history: tokio::sync::Mutex<Vec<Turn>>,
}

impl Session {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            history: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Exclusive access to the history for the duration of one exchange.
    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, Vec<Turn>> {
        self.history.lock().await
    }

    /// Number of turns recorded so far.
    pub async fn turn_count(&self) -> usize {
        self.history.lock().await.len()
    }
}

/// Map from session id to session.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session for `id`, created on first use.
    ///
    /// Creation happens under the registry lock, so concurrent first calls
    /// for one id all receive the same handle.
    pub fn get_or_create(&self, id: &str) -> Arc<Session> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = sessions.get(id) {
            return Arc::clone(session);
        }
        debug!("Creating session {}", id);
        let session = Arc::new(Session::new(id));
        sessions.insert(id.to_string(), Arc::clone(&session));
        session
    }

    /// Drop the session for `id`. Returns `false` if there was none.
    pub fn clear(&self, id: &str) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

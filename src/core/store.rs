//! # Session Store
//!
//! Owns the list of chat sessions and the active session id. Every mutation
//! goes through one of the operations below and is immediately mirrored to
//! the persistence slot as one JSON record under [`SESSIONS_KEY`].
//!
//! Persistence never aborts the app: a failed load starts from an empty
//! list, a failed save leaves the in-memory state as the only copy. Both are
//! logged.

use log::{debug, info, warn};

use crate::core::session::{ChatSession, Message, derive_title};
use crate::core::storage::KeyValueStore;

/// Fixed key holding the serialized session list.
pub const SESSIONS_KEY: &str = "chatSessions";

pub struct SessionStore {
    sessions: Vec<ChatSession>,
    active_id: Option<String>,
    backend: Box<dyn KeyValueStore>,
}

impl SessionStore {
    /// Loads the session list from `backend` and selects the most recent
    /// session, if any.
    pub fn load(backend: Box<dyn KeyValueStore>) -> Self {
        let mut sessions = read_sessions(backend.as_ref());
        finalize_interrupted(&mut sessions);

        let mut store = Self {
            sessions,
            active_id: None,
            backend,
        };
        store.active_id = store.sessions_by_recency().first().map(|s| s.id.clone());
        info!(
            "Session store ready: {} session(s), active={:?}",
            store.sessions.len(),
            store.active_id
        );
        store
    }

    /// Creates a new session at the head of the list and selects it.
    /// Returns the new session's id.
    pub fn create_session(&mut self) -> String {
        let session = ChatSession::new();
        let id = session.id.clone();
        debug!("Created session {}", id);
        self.sessions.insert(0, session);
        self.active_id = Some(id.clone());
        self.persist();
        id
    }

    /// Makes `id` the active session. Unknown ids are ignored.
    pub fn select_session(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            debug!("Ignoring selection of unknown session {}", id);
            return false;
        }
        self.active_id = Some(id.to_string());
        true
    }

    /// Replaces the messages of session `id`.
    ///
    /// The title is derived from the first message only while it still has
    /// the default value, so it changes at most once. Returns `false` if the
    /// session does not exist.
    pub fn update_messages(&mut self, id: &str, messages: Vec<Message>) -> bool {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) else {
            warn!("update_messages for unknown session {}", id);
            return false;
        };

        if session.has_default_title()
            && let Some(first) = messages.first()
        {
            session.title = derive_title(&first.content);
        }
        session.messages = messages;
        self.persist();
        true
    }

    pub fn get(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active(&self) -> Option<&ChatSession> {
        self.active_id.as_deref().and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Sessions ordered by creation time, newest first. The sort is stable,
    /// so sessions created in the same millisecond keep head-insertion order.
    pub fn sessions_by_recency(&self) -> Vec<&ChatSession> {
        let mut sorted: Vec<&ChatSession> = self.sessions.iter().collect();
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sorted
    }

    /// Serializes the full session list into the backend.
    fn persist(&mut self) {
        let json = match serde_json::to_string(&self.sessions) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize sessions: {}", e);
                return;
            }
        };
        if let Err(e) = self.backend.set(SESSIONS_KEY, &json) {
            warn!("Failed to save sessions: {}", e);
        }
    }
}

/// Reads and parses the persisted list. Any failure yields an empty list.
fn read_sessions(backend: &dyn KeyValueStore) -> Vec<ChatSession> {
    match backend.get(SESSIONS_KEY) {
        Ok(Some(json)) => match serde_json::from_str(&json) {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!("Failed to parse saved sessions: {}", e);
                Vec::new()
            }
        },
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!("Failed to load sessions: {}", e);
            Vec::new()
        }
    }
}

/// A placeholder still marked loading after a restart belongs to a reply
/// that can no longer arrive. Finalize it in place.
fn finalize_interrupted(sessions: &mut [ChatSession]) {
    for session in sessions.iter_mut() {
        for message in session.messages.iter_mut().filter(|m| m.is_loading) {
            info!(
                "Finalizing interrupted reply {} in session {}",
                message.id, session.id
            );
            *message = message.finalized(&message.content);
        }
    }
}

//! # Application State
//!
//! Core business state for Parley. This module contains domain logic only -
//! no TUI-specific types. Presentation state lives in the `tui` module.
//!
//! ```text
//! App
//! ├── store: SessionStore           // sessions + active id, persisted
//! ├── assistant: Arc<Assistant>     // AI collaborator (shared with tasks)
//! ├── pending: HashMap              // in-flight request per session id
//! ├── status_message: String        // status bar text
//! └── model_name: String            // current text model
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::store::SessionStore;
use crate::inference::Assistant;

/// An outstanding request for one session. At most one per session.
#[derive(Debug, Clone, PartialEq)]
pub enum Pending {
    /// Text reply streaming into the placeholder `message_id`.
    Reply {
        message_id: String,
        accumulated: String,
    },
    Image,
}

pub struct App {
    pub store: SessionStore,
    pub assistant: Arc<Assistant>,
    pub pending: HashMap<String, Pending>,
    pub status_message: String,
    pub model_name: String,
}

impl App {
    pub fn new(store: SessionStore, assistant: Arc<Assistant>) -> Self {
        let model_name = assistant.model().to_string();
        Self {
            store,
            assistant,
            pending: HashMap::new(),
            status_message: String::from("Welcome to Parley!"),
            model_name,
        }
    }

    /// Whether `session_id` has a request in flight.
    pub fn is_busy(&self, session_id: &str) -> bool {
        self.pending.contains_key(session_id)
    }

    /// Whether the active session has a request in flight. Input is
    /// disabled while this holds.
    pub fn active_is_busy(&self) -> bool {
        self.store.active_id().is_some_and(|id| self.is_busy(id))
    }

    /// Whether any session has a request in flight.
    pub fn any_busy(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::test_app;

    #[test]
    fn test_app_new_defaults() {
        let app = test_app();
        assert_eq!(app.status_message, "Welcome to Parley!");
        assert_eq!(app.model_name, "test-model");
        assert!(!app.active_is_busy());
        assert!(!app.any_busy());
        assert!(app.store.is_empty());
    }
}

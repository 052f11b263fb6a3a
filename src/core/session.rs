//! # Sessions and Messages
//!
//! The persisted data model. A `ChatSession` is one conversation thread; its
//! `messages` are kept in conversation order.
//!
//! The serialized shape is camelCase (`createdAt`, `isLoading`, `isImage`) so
//! the whole session list round-trips through a single JSON record.

use serde::{Deserialize, Serialize};

/// Title every session starts with, replaced once by `derive_title`.
pub const DEFAULT_TITLE: &str = "New Chat";

/// Maximum number of characters kept from the first message for the title.
pub const TITLE_MAX_CHARS: usize = 40;

/// Shown when a reply finishes without producing any text.
pub const EMPTY_REPLY_FALLBACK: &str = "Sorry, I could not provide a response.";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant", alias = "ai")]
    Assistant,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    /// Text, or a `data:` URI when `is_image` is set.
    pub content: String,
    /// Set only on assistant placeholders while a reply streams in.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_loading: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_image: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            role: Role::User,
            content: content.into(),
            is_loading: false,
            is_image: false,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            role: Role::Assistant,
            content: content.into(),
            is_loading: false,
            is_image: false,
        }
    }

    /// Empty assistant message marking an in-flight reply.
    pub fn placeholder() -> Self {
        Self {
            is_loading: true,
            ..Self::assistant(String::new())
        }
    }

    /// Assistant message carrying an image as a `data:` URI.
    pub fn image(data_uri: impl Into<String>) -> Self {
        Self {
            is_image: true,
            ..Self::assistant(data_uri)
        }
    }

    /// Returns the finalized form of a placeholder: same id, loading cleared,
    /// and the fallback text if nothing arrived.
    pub fn finalized(&self, text: &str) -> Message {
        let content = if text.is_empty() {
            EMPTY_REPLY_FALLBACK.to_string()
        } else {
            text.to_string()
        };
        Message {
            id: self.id.clone(),
            role: Role::Assistant,
            content,
            is_loading: false,
            is_image: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    /// Unix epoch milliseconds. Only used for ordering.
    pub created_at: i64,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            id: new_id(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_TITLE
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a new UUID v4 identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Derive a session title from the first message's content.
/// Keeps the first 40 characters and appends "..." only if more were cut.
pub fn derive_title(first_content: &str) -> String {
    let mut chars = first_content.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

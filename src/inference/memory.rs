//! # Conversational Memory
//!
//! Per-session turn history sent to the provider. A session's memory is
//! seeded from its persisted messages the first time it is used; after that
//! only the new exchange is appended.
//!
//! Memory is bounded: at most `capacity` sessions are held, and the least
//! recently used one is dropped to make room. A dropped session is simply
//! re-seeded from its persisted messages on next use.

use std::collections::{HashMap, VecDeque};

use log::debug;

use crate::core::intent::{self, Intent};
use crate::core::session::{Message, Role};
use crate::inference::types::Turn;

pub const DEFAULT_MAX_CACHED_CHATS: usize = 32;

pub struct ChatMemory {
    capacity: usize,
    chats: HashMap<String, Vec<Turn>>,
    /// Session ids, least recently used at the front.
    recency: VecDeque<String>,
}

impl ChatMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            chats: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    /// Returns the turns held for `session_id`, seeding them from `seed` if
    /// the session is not in memory. Marks the session as most recently used.
    pub fn turns_for(&mut self, session_id: &str, seed: &[Message]) -> Vec<Turn> {
        if !self.chats.contains_key(session_id) {
            let turns = turns_from_messages(seed);
            debug!(
                "Seeding memory for session {} with {} turn(s)",
                session_id,
                turns.len()
            );
            self.insert(session_id, turns);
        }
        self.touch(session_id);
        self.chats.get(session_id).cloned().unwrap_or_default()
    }

    /// Appends a completed exchange. Sessions no longer in memory are left
    /// alone, their persisted messages already contain the exchange.
    pub fn record(&mut self, session_id: &str, user_text: &str, reply: &str) {
        if let Some(turns) = self.chats.get_mut(session_id) {
            turns.push(Turn::user(user_text));
            turns.push(Turn::model(reply));
        }
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.chats.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    fn insert(&mut self, session_id: &str, turns: Vec<Turn>) {
        while self.chats.len() >= self.capacity {
            let Some(oldest) = self.recency.pop_front() else {
                break;
            };
            debug!("Evicting memory for session {}", oldest);
            self.chats.remove(&oldest);
        }
        self.chats.insert(session_id.to_string(), turns);
    }

    fn touch(&mut self, session_id: &str) {
        self.recency.retain(|id| id != session_id);
        self.recency.push_back(session_id.to_string());
    }
}

/// Converts persisted messages into provider turns.
///
/// Image requests and their replies never went through the text
/// conversation, so they are skipped along with anything still loading.
pub fn turns_from_messages(messages: &[Message]) -> Vec<Turn> {
    let mut turns = Vec::new();
    let mut skip_reply = false;

    for message in messages {
        match message.role {
            Role::User => {
                skip_reply = matches!(intent::detect(&message.content), Intent::Image { .. });
                if !skip_reply {
                    turns.push(Turn::user(&message.content));
                }
            }
            Role::Assistant => {
                let skip = std::mem::take(&mut skip_reply);
                if skip || message.is_image || message.is_loading {
                    continue;
                }
                turns.push(Turn::model(&message.content));
            }
        }
    }
    turns
}

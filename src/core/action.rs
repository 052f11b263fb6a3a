//! # Actions
//!
//! Everything that can happen in Parley becomes an `Action`.
//! User presses Enter? That's `Action::Submit(text)`.
//! A fragment of the reply arrives? That's `Action::ReplyFragment { .. }`.
//!
//! The `update()` function applies an action to the state and returns an
//! `Effect` describing the I/O the caller must start. No side effects here
//! beyond the session store's own persistence.
//!
//! ```text
//! State + Action  →  update()  →  New State + Effect
//! ```
//!
//! ## Send flow
//!
//! ```text
//! Submit(text)
//!   ├─ image phrase? → user msg ──────────────→ Effect::GenerateImage
//!   │                                  ImageReady → one assistant msg
//!   └─ otherwise     → user msg + placeholder → Effect::StreamReply
//!                       ReplyFragment* → placeholder = running text
//!                       ReplyFinished  → finalized msg (same id)
//! ```

use log::{debug, info, warn};

use crate::core::intent::{self, Intent};
use crate::core::session::Message;
use crate::core::state::{App, Pending};
use crate::inference::ImageOutcome;

/// Replaces the reply when the stream fails.
pub const STREAM_ERROR_TEXT: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    NewSession,
    SelectSession(String),
    Submit(String),
    ReplyFragment {
        session_id: String,
        message_id: String,
        text: String,
    },
    ReplyFinished {
        session_id: String,
        message_id: String,
        /// Set when the stream failed.
        error: Option<String>,
    },
    ImageReady {
        session_id: String,
        outcome: ImageOutcome,
    },
    /// Stop the active session's streaming reply, keeping what arrived.
    CancelReply,
    Quit,
}

/// Work for the background reply task.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyJob {
    pub session_id: String,
    pub message_id: String,
    /// Messages before the new user turn.
    pub history: Vec<Message>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageJob {
    pub session_id: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    StreamReply(ReplyJob),
    GenerateImage(ImageJob),
    /// Abort the reply task running for this session.
    AbortReply(String),
    Quit,
}

pub fn update(app: &mut App, action: Action) -> Effect {
    match action {
        Action::NewSession => {
            let id = app.store.create_session();
            info!("New session {}", id);
            app.status_message = String::from("New chat");
            Effect::None
        }
        Action::SelectSession(id) => {
            if app.store.select_session(&id) {
                app.status_message = String::new();
            }
            Effect::None
        }
        Action::Submit(text) => submit(app, text),
        Action::ReplyFragment {
            session_id,
            message_id,
            text,
        } => {
            let Some(Pending::Reply {
                message_id: pending_id,
                accumulated,
            }) = app.pending.get_mut(&session_id)
            else {
                debug!("Dropping fragment for session {} with no reply pending", session_id);
                return Effect::None;
            };
            if *pending_id != message_id {
                debug!("Dropping fragment for stale message {}", message_id);
                return Effect::None;
            }
            accumulated.push_str(&text);
            let running = accumulated.clone();
            replace_message(app, &session_id, &message_id, |m| Message {
                content: running,
                ..m.clone()
            });
            Effect::None
        }
        Action::ReplyFinished {
            session_id,
            message_id,
            error,
        } => {
            let accumulated = match app.pending.get(&session_id) {
                Some(Pending::Reply {
                    message_id: pending_id,
                    accumulated,
                }) if *pending_id == message_id => accumulated.clone(),
                _ => {
                    debug!("Ignoring finish for message {} with no reply pending", message_id);
                    return Effect::None;
                }
            };
            app.pending.remove(&session_id);

            let final_text = match error {
                Some(e) => {
                    warn!("Reply in session {} failed: {}", session_id, e);
                    app.status_message = String::from("Reply failed");
                    STREAM_ERROR_TEXT.to_string()
                }
                None => {
                    app.status_message = String::new();
                    accumulated
                }
            };
            replace_message(app, &session_id, &message_id, |m| m.finalized(&final_text));
            Effect::None
        }
        Action::ImageReady {
            session_id,
            outcome,
        } => {
            if app.pending.get(&session_id) != Some(&Pending::Image) {
                debug!("Ignoring image for session {} with no image pending", session_id);
                return Effect::None;
            }
            app.pending.remove(&session_id);

            let message = match &outcome {
                ImageOutcome::Image(uri) => Message::image(uri.as_str()),
                ImageOutcome::Declined(text) | ImageOutcome::Failed(text) => {
                    Message::assistant(text.as_str())
                }
            };
            app.status_message = if outcome.is_image() {
                String::from("Image ready")
            } else {
                String::new()
            };
            append_message(app, &session_id, message);
            Effect::None
        }
        Action::CancelReply => {
            let Some(session_id) = app.store.active_id().map(str::to_string) else {
                return Effect::None;
            };
            let Some(Pending::Reply {
                message_id,
                accumulated,
            }) = app.pending.get(&session_id).cloned()
            else {
                return Effect::None;
            };
            app.pending.remove(&session_id);
            info!("Cancelled reply {} in session {}", message_id, session_id);
            replace_message(app, &session_id, &message_id, |m| m.finalized(&accumulated));
            app.status_message = String::from("Cancelled");
            Effect::AbortReply(session_id)
        }
        Action::Quit => Effect::Quit,
    }
}

fn submit(app: &mut App, text: String) -> Effect {
    if text.trim().is_empty() {
        return Effect::None;
    }

    let session_id = match app.store.active_id() {
        Some(id) => id.to_string(),
        None => app.store.create_session(),
    };
    if app.is_busy(&session_id) {
        debug!("Submit ignored: session {} is busy", session_id);
        return Effect::None;
    }

    let history = app
        .store
        .get(&session_id)
        .map(|s| s.messages.clone())
        .unwrap_or_default();
    let mut messages = history.clone();
    messages.push(Message::user(text.as_str()));

    match intent::detect(&text) {
        Intent::Image { prompt } => {
            info!("Image request in session {}", session_id);
            app.store.update_messages(&session_id, messages);
            app.pending.insert(session_id.clone(), Pending::Image);
            app.status_message = String::from("Generating image...");
            Effect::GenerateImage(ImageJob { session_id, prompt })
        }
        Intent::Chat => {
            let placeholder = Message::placeholder();
            let message_id = placeholder.id.clone();
            messages.push(placeholder);
            app.store.update_messages(&session_id, messages);
            app.pending.insert(
                session_id.clone(),
                Pending::Reply {
                    message_id: message_id.clone(),
                    accumulated: String::new(),
                },
            );
            app.status_message = String::from("Thinking...");
            Effect::StreamReply(ReplyJob {
                session_id,
                message_id,
                history,
                text,
            })
        }
    }
}

/// Rewrites message `message_id` of a session through `f` and stores the
/// new list.
fn replace_message(
    app: &mut App,
    session_id: &str,
    message_id: &str,
    f: impl FnOnce(&Message) -> Message,
) {
    let Some(session) = app.store.get(session_id) else {
        warn!("Session {} vanished while a request was pending", session_id);
        return;
    };
    let mut messages = session.messages.clone();
    let Some(slot) = messages.iter_mut().find(|m| m.id == message_id) else {
        warn!("Message {} not found in session {}", message_id, session_id);
        return;
    };
    *slot = f(slot);
    app.store.update_messages(session_id, messages);
}

fn append_message(app: &mut App, session_id: &str, message: Message) {
    let Some(session) = app.store.get(session_id) else {
        warn!("Session {} vanished while a request was pending", session_id);
        return;
    };
    let mut messages = session.messages.clone();
    messages.push(message);
    app.store.update_messages(session_id, messages);
}

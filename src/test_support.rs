//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::core::state::App;
use crate::core::storage::MemoryStore;
use crate::core::store::SessionStore;
use crate::inference::{
    Assistant, AssistantSettings, ChatProvider, GeneratedImage, ImageRequest, ProviderError,
    TextRequest, Turn,
};

/// A provider that replays a fixed script instead of calling an API.
///
/// Records the turns and image prompt of the most recent request.
pub struct ScriptedProvider {
    fragments: Vec<String>,
    fail_after_fragments: bool,
    image: Mutex<Option<Result<Option<GeneratedImage>, ProviderError>>>,
    last_turns: Mutex<Vec<Turn>>,
    last_image_prompt: Mutex<Option<String>>,
}

impl ScriptedProvider {
    fn new(fragments: &[&str], fail_after_fragments: bool) -> Self {
        Self {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            fail_after_fragments,
            image: Mutex::new(None),
            last_turns: Mutex::new(Vec::new()),
            last_image_prompt: Mutex::new(None),
        }
    }

    /// Streams `fragments`, then succeeds.
    pub fn replying(fragments: &[&str]) -> Self {
        Self::new(fragments, false)
    }

    /// Streams `fragments`, then fails with a network error.
    pub fn failing(fragments: &[&str]) -> Self {
        Self::new(fragments, true)
    }

    /// Answers the next image request with `result`.
    pub fn with_image(result: Result<Option<GeneratedImage>, ProviderError>) -> Self {
        let provider = Self::new(&[], false);
        *provider.image.lock().unwrap() = Some(result);
        provider
    }

    pub fn last_turns(&self) -> Vec<Turn> {
        self.last_turns.lock().unwrap().clone()
    }

    pub fn last_image_prompt(&self) -> Option<String> {
        self.last_image_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream_text(
        &self,
        request: TextRequest<'_>,
        sender: Sender<String>,
    ) -> Result<(), ProviderError> {
        *self.last_turns.lock().unwrap() = request.turns.to_vec();
        for fragment in &self.fragments {
            sender
                .send(fragment.clone())
                .await
                .map_err(|_| ProviderError::ChannelClosed)?;
        }
        if self.fail_after_fragments {
            return Err(ProviderError::Network("scripted failure".to_string()));
        }
        Ok(())
    }

    async fn generate_image(
        &self,
        request: ImageRequest<'_>,
    ) -> Result<Option<GeneratedImage>, ProviderError> {
        *self.last_image_prompt.lock().unwrap() = Some(request.prompt.to_string());
        self.image.lock().unwrap().take().unwrap_or(Ok(None))
    }
}

pub fn test_settings() -> AssistantSettings {
    AssistantSettings {
        model: "test-model".to_string(),
        image_model: "test-image-model".to_string(),
        system_prompt: "You are a test.".to_string(),
        max_cached_chats: 4,
    }
}

/// Creates a test App backed by an in-memory store and a silent provider.
pub fn test_app() -> App {
    let assistant = Assistant::new(Arc::new(ScriptedProvider::replying(&[])), test_settings());
    App::new(
        SessionStore::load(Box::new(MemoryStore::new())),
        Arc::new(assistant),
    )
}

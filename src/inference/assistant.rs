//! # Assistant
//!
//! The AI collaborator the chat flow talks to. Wraps a [`ChatProvider`]
//! with per-session conversational memory and turns image results into an
//! [`ImageOutcome`].

use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::{Mutex, mpsc};
use tokio::sync::mpsc::Sender;

use crate::core::session::Message;
use crate::inference::memory::ChatMemory;
use crate::inference::provider::{ChatProvider, ImageRequest, ProviderError, TextRequest};
use crate::inference::types::{ImageOutcome, Turn};

/// Bound on fragments buffered between the provider and the caller.
pub const FRAGMENT_BUFFER: usize = 100;

/// Model and prompt settings for an [`Assistant`].
#[derive(Debug, Clone)]
pub struct AssistantSettings {
    pub model: String,
    pub image_model: String,
    pub system_prompt: String,
    pub max_cached_chats: usize,
}

pub struct Assistant {
    provider: Arc<dyn ChatProvider>,
    memory: Mutex<ChatMemory>,
    settings: AssistantSettings,
}

impl Assistant {
    pub fn new(provider: Arc<dyn ChatProvider>, settings: AssistantSettings) -> Self {
        Self {
            provider,
            memory: Mutex::new(ChatMemory::new(settings.max_cached_chats)),
            settings,
        }
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Streams the reply to `text` in session `session_id`.
    ///
    /// `history` is the session's messages before `text`; it only seeds the
    /// session's memory when that memory does not exist yet. Each fragment
    /// is forwarded to `sender` in order. On success the exchange is added
    /// to memory and the full reply is returned.
    pub async fn stream_reply(
        &self,
        session_id: &str,
        history: &[Message],
        text: &str,
        sender: Sender<String>,
    ) -> Result<String, ProviderError> {
        let mut turns = self.memory.lock().await.turns_for(session_id, history);
        turns.push(Turn::user(text));

        info!(
            "Streaming reply: provider={}, model={}, session={}, turns={}",
            self.provider.name(),
            self.settings.model,
            session_id,
            turns.len()
        );

        let (fragment_tx, mut fragment_rx) = mpsc::channel::<String>(FRAGMENT_BUFFER);
        let request = TextRequest {
            model: &self.settings.model,
            system_prompt: &self.settings.system_prompt,
            turns: &turns,
        };

        // Owns the receiver so a dropped caller also stops the provider.
        let forward = async move {
            let mut reply = String::new();
            while let Some(fragment) = fragment_rx.recv().await {
                reply.push_str(&fragment);
                if sender.send(fragment).await.is_err() {
                    warn!("Fragment forward failed: receiver dropped");
                    return Err(ProviderError::ChannelClosed);
                }
            }
            Ok(reply)
        };

        let (streamed, forwarded) =
            tokio::join!(self.provider.stream_text(request, fragment_tx), forward);
        streamed?;
        let reply = forwarded?;

        debug!("Reply complete: {} bytes", reply.len());
        if !reply.is_empty() {
            self.memory.lock().await.record(session_id, text, &reply);
        }
        Ok(reply)
    }

    /// Generates an image for `prompt`. Never fails: errors are logged and
    /// turned into a text outcome.
    pub async fn generate_image(&self, prompt: &str) -> ImageOutcome {
        info!(
            "Generating image: model={}, prompt_len={}",
            self.settings.image_model,
            prompt.len()
        );
        let request = ImageRequest {
            model: &self.settings.image_model,
            prompt,
        };
        match self.provider.generate_image(request).await {
            Ok(Some(image)) => ImageOutcome::Image(image.data_uri()),
            Ok(None) => {
                warn!("Image generation returned no image");
                ImageOutcome::declined()
            }
            Err(e) => {
                error!("Image generation failed: {}", e);
                ImageOutcome::failed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::types::{GeneratedImage, IMAGE_DECLINED_TEXT, IMAGE_FAILED_TEXT};
    use crate::test_support::{ScriptedProvider, test_settings};

    fn scripted(provider: ScriptedProvider) -> (Assistant, Arc<ScriptedProvider>) {
        let provider = Arc::new(provider);
        (Assistant::new(provider.clone(), test_settings()), provider)
    }

    async fn collect(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(fragment) = rx.recv().await {
            out.push(fragment);
        }
        out
    }

    #[tokio::test]
    async fn test_stream_reply_forwards_fragments_in_order() {
        let (assistant, _) = scripted(ScriptedProvider::replying(&["Hel", "lo", "!"]));
        let (tx, mut rx) = mpsc::channel(FRAGMENT_BUFFER);

        let reply = assistant.stream_reply("s1", &[], "hi", tx).await.unwrap();
        assert_eq!(reply, "Hello!");
        assert_eq!(collect(&mut rx).await, vec!["Hel", "lo", "!"]);
    }

    #[tokio::test]
    async fn test_history_seeds_only_first_call() {
        let (assistant, provider) = scripted(ScriptedProvider::replying(&["ok"]));
        let history = vec![Message::user("earlier"), Message::assistant("reply")];

        let (tx, _rx) = mpsc::channel(FRAGMENT_BUFFER);
        assistant.stream_reply("s1", &history, "first", tx).await.unwrap();
        assert_eq!(
            provider.last_turns(),
            vec![Turn::user("earlier"), Turn::model("reply"), Turn::user("first")]
        );

        // Second call: memory holds the exchange, history is ignored
        let (tx, _rx) = mpsc::channel(FRAGMENT_BUFFER);
        assistant.stream_reply("s1", &[], "second", tx).await.unwrap();
        assert_eq!(
            provider.last_turns(),
            vec![
                Turn::user("earlier"),
                Turn::model("reply"),
                Turn::user("first"),
                Turn::model("ok"),
                Turn::user("second"),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_stream_is_not_remembered() {
        let (assistant, provider) = scripted(ScriptedProvider::failing(&["par"]));
        let (tx, _rx) = mpsc::channel(FRAGMENT_BUFFER);
        let result = assistant.stream_reply("s1", &[], "q", tx).await;
        assert!(matches!(result, Err(ProviderError::Network(_))));

        let (tx, _rx) = mpsc::channel(FRAGMENT_BUFFER);
        let _ = assistant.stream_reply("s1", &[], "again", tx).await;
        assert_eq!(provider.last_turns(), vec![Turn::user("again")]);
    }

    #[tokio::test]
    async fn test_dropped_receiver_reports_channel_closed() {
        let (assistant, _) = scripted(ScriptedProvider::replying(&["a", "b"]));
        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);
        drop(rx);
        let result = assistant.stream_reply("s1", &[], "q", tx).await;
        assert!(matches!(result, Err(ProviderError::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_image_outcomes() {
        let image = GeneratedImage {
            mime_type: "image/jpeg".to_string(),
            base64_data: "QUJD".to_string(),
        };
        let (assistant, _) = scripted(ScriptedProvider::with_image(Ok(Some(image))));
        assert_eq!(
            assistant.generate_image("a cat").await,
            ImageOutcome::Image("data:image/jpeg;base64,QUJD".to_string())
        );

        let (assistant, _) = scripted(ScriptedProvider::with_image(Ok(None)));
        assert_eq!(
            assistant.generate_image("a cat").await,
            ImageOutcome::Declined(IMAGE_DECLINED_TEXT.to_string())
        );

        let (assistant, _) = scripted(ScriptedProvider::with_image(Err(
            ProviderError::Api {
                status: 500,
                message: "boom".to_string(),
            },
        )));
        assert_eq!(
            assistant.generate_image("a cat").await,
            ImageOutcome::Failed(IMAGE_FAILED_TEXT.to_string())
        );
    }

    #[test]
    fn test_generate_image_blocking() {
        let (assistant, provider) = scripted(ScriptedProvider::with_image(Ok(None)));
        let outcome = tokio_test::block_on(assistant.generate_image("the sea"));
        assert!(!outcome.is_image());
        assert_eq!(provider.last_image_prompt().as_deref(), Some("the sea"));
    }
}

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use super::types::{GeneratedImage, Turn};

/// Errors that can occur during provider operations.
#[derive(Debug)]
pub enum ProviderError {
    /// Provider misconfigured (missing API key, bad URL).
    Config(String),
    /// Network-level failure (timeout, DNS, connection refused).
    Network(String),
    /// API returned an error response, either as an HTTP status or as an
    /// error object inside the stream.
    Api { status: u16, message: String },
    /// Failed to parse the provider's response.
    Parse(String),
    /// The prompt was refused by the provider's safety filter.
    Blocked(String),
    /// The mpsc channel was closed (receiver dropped, e.g. after cancel).
    ChannelClosed,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Config(msg) => write!(f, "config error: {msg}"),
            ProviderError::Network(msg) => write!(f, "network error: {msg}"),
            ProviderError::Api { status, message } => {
                write!(f, "API error (HTTP {status}): {message}")
            }
            ProviderError::Parse(msg) => write!(f, "parse error: {msg}"),
            ProviderError::Blocked(reason) => write!(f, "prompt blocked: {reason}"),
            ProviderError::ChannelClosed => write!(f, "channel closed"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Everything a provider needs to stream one reply.
pub struct TextRequest<'a> {
    pub model: &'a str,
    pub system_prompt: &'a str,
    /// Full conversation so far, ending with the new user turn.
    pub turns: &'a [Turn],
}

pub struct ImageRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Returns the name of the provider.
    fn name(&self) -> &str;

    /// Streams reply text for `request`, sending each non-empty fragment to
    /// `sender` in order.
    async fn stream_text(
        &self,
        request: TextRequest<'_>,
        sender: Sender<String>,
    ) -> Result<(), ProviderError>;

    /// Generates one image. `Ok(None)` means the provider returned no image.
    async fn generate_image(
        &self,
        request: ImageRequest<'_>,
    ) -> Result<Option<GeneratedImage>, ProviderError>;
}

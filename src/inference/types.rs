use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

pub const IMAGE_DECLINED_TEXT: &str =
    "I couldn't generate an image for that prompt. Please try something different.";
pub const IMAGE_FAILED_TEXT: &str = "Sorry, I ran into an issue trying to create that image.";

/// Who produced a turn, in the provider's vocabulary.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub enum Speaker {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "model")]
    Model,
}

/// One exchange step in the conversational memory.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Model,
            text: text.into(),
        }
    }
}

/// Raw image returned by a provider, still base64 encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub base64_data: String,
}

impl GeneratedImage {
    /// `data:<mime>;base64,<payload>`, the form stored in a message.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_data)
    }

    pub fn bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.base64_data)
    }
}

/// Result of an image request. Only `Image` becomes an image message;
/// the other two carry the text shown instead.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageOutcome {
    Image(String),
    Declined(String),
    Failed(String),
}

impl ImageOutcome {
    pub fn declined() -> Self {
        ImageOutcome::Declined(IMAGE_DECLINED_TEXT.to_string())
    }

    pub fn failed() -> Self {
        ImageOutcome::Failed(IMAGE_FAILED_TEXT.to_string())
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ImageOutcome::Image(_))
    }

    /// Message content for this outcome.
    pub fn content(&self) -> &str {
        match self {
            ImageOutcome::Image(uri) | ImageOutcome::Declined(uri) | ImageOutcome::Failed(uri) => {
                uri
            }
        }
    }
}

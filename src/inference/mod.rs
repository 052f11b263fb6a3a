pub mod assistant;
pub mod memory;
pub mod provider;
pub mod providers;
pub mod types;

pub use assistant::{Assistant, AssistantSettings};
pub use provider::{ChatProvider, ImageRequest, ProviderError, TextRequest};
pub use providers::GeminiProvider;
pub use types::{GeneratedImage, ImageOutcome, Speaker, Turn};

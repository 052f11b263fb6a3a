//! Gemini provider for the Generative Language API.
//!
//! Text goes through `models/{model}:streamGenerateContent?alt=sse`, which
//! answers with SSE `data:` lines, each a full `GenerateContentResponse`
//! JSON object. Images go through the Imagen `models/{model}:predict`
//! endpoint, a single JSON response with base64 payloads.

use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;

use crate::inference::provider::{ChatProvider, ImageRequest, ProviderError, TextRequest};
use crate::inference::types::{GeneratedImage, Speaker, Turn};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const IMAGE_MIME_TYPE: &str = "image/jpeg";

// ============================================================================
// Gemini API Types
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize, Debug)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

#[derive(Serialize, Debug)]
struct PredictRequest<'a> {
    instances: Vec<PredictInstance<'a>>,
    parameters: PredictParameters,
}

#[derive(Serialize, Debug)]
struct PredictInstance<'a> {
    prompt: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u8,
    output_mime_type: &'static str,
}

#[derive(Deserialize, Debug, Default)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: String,
    mime_type: Option<String>,
}

// ============================================================================
// Translation Layer
// ============================================================================

fn turns_to_contents(turns: &[Turn]) -> Vec<Content> {
    turns
        .iter()
        .map(|turn| Content {
            role: Some(match turn.speaker {
                Speaker::User => "user",
                Speaker::Model => "model",
            }),
            parts: vec![Part {
                text: turn.text.clone(),
            }],
        })
        .collect()
}

fn build_text_request(request: &TextRequest<'_>) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: request.system_prompt.to_string(),
            }],
        },
        contents: turns_to_contents(request.turns),
    }
}

fn build_predict_request<'a>(prompt: &'a str) -> PredictRequest<'a> {
    PredictRequest {
        instances: vec![PredictInstance { prompt }],
        parameters: PredictParameters {
            sample_count: 1,
            output_mime_type: IMAGE_MIME_TYPE,
        },
    }
}

/// Text carried by one SSE event: the first candidate's parts, joined.
///
/// An embedded error object or a blocked prompt is an error.
fn parse_event(data: &str) -> Result<String, ProviderError> {
    let event: GenerateContentResponse =
        serde_json::from_str(data).map_err(|e| ProviderError::Parse(e.to_string()))?;

    if let Some(error) = event.error {
        return Err(ProviderError::Api {
            status: error.code,
            message: error.message,
        });
    }
    if let Some(reason) = event.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ProviderError::Blocked(reason));
    }

    let Some(candidate) = event.candidates.into_iter().next() else {
        return Ok(String::new());
    };
    if let Some(reason) = &candidate.finish_reason {
        debug!("Candidate finish reason: {}", reason);
    }
    Ok(candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default())
}

fn first_image(response: PredictResponse) -> Option<GeneratedImage> {
    response
        .predictions
        .into_iter()
        .find(|p| !p.bytes_base64_encoded.is_empty())
        .map(|p| GeneratedImage {
            mime_type: p.mime_type.unwrap_or_else(|| IMAGE_MIME_TYPE.to_string()),
            base64_data: p.bytes_base64_encoded,
        })
}

/// Raw response bytes split into lines. Bytes are only decoded once a
/// whole line is in, so a character split across network chunks survives.
#[derive(Default)]
struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    /// Next complete line, without its `\n`.
    fn next_line(&mut self) -> Result<Option<String>, ProviderError> {
        let Some(pos) = self.bytes.iter().position(|&b| b == b'\n') else {
            return Ok(None);
        };
        let line: Vec<u8> = self.bytes.drain(..=pos).collect();
        decode(&line[..pos]).map(Some)
    }

    /// Whatever is left after the stream ends.
    fn take_rest(&mut self) -> Result<Option<String>, ProviderError> {
        if self.bytes.is_empty() {
            return Ok(None);
        }
        let rest = std::mem::take(&mut self.bytes);
        decode(&rest).map(Some)
    }
}

fn decode(bytes: &[u8]) -> Result<String, ProviderError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| ProviderError::Parse(format!("Invalid UTF-8 in stream: {e}")))
}

// ============================================================================
// Provider Implementation
// ============================================================================

pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Creates a new Gemini provider.
    ///
    /// # Arguments
    /// * `api_key` - Generative Language API key
    /// * `base_url` - Optional custom base URL (defaults to the public v1beta API)
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string());
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// POSTs `body` to `url` and returns the response, mapping non-2xx
    /// statuses to `ProviderError::Api`.
    async fn post<T: Serialize>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<reqwest::Response, ProviderError> {
        let json_body = serde_json::to_string(body)
            .map_err(|e| ProviderError::Parse(format!("Request serialization failed: {e}")))?;
        debug!("Gemini request to {}: {} bytes", url, json_body.len());

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .body(json_body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        debug!("Gemini response status: {}", response.status());

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let err_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            warn!("Gemini API error: {} - {}", status, err_body);
            return Err(ProviderError::Api {
                status,
                message: err_body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn stream_text(
        &self,
        request: TextRequest<'_>,
        sender: Sender<String>,
    ) -> Result<(), ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::Config("Gemini API key is empty".to_string()));
        }

        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, request.model
        );
        let body = build_text_request(&request);
        info!(
            "Gemini stream request: model={}, contents={}",
            request.model,
            body.contents.len()
        );

        let response = self.post(&url, &body).await?;
        let mut stream = response.bytes_stream();
        let mut lines = LineBuffer::default();
        let mut fragment_count = 0usize;
        let mut total_len = 0usize;
        let mut ended = false;

        loop {
            let line = match lines.next_line()? {
                Some(line) => line,
                None if ended => break,
                None => match stream.next().await {
                    Some(chunk) => {
                        let chunk = chunk.map_err(|e| ProviderError::Network(e.to_string()))?;
                        lines.push(&chunk);
                        continue;
                    }
                    None => {
                        ended = true;
                        // A final event without a trailing newline
                        match lines.take_rest()? {
                            Some(rest) => rest,
                            None => break,
                        }
                    }
                },
            };

            let Some(data) = line.trim().strip_prefix("data: ") else {
                continue;
            };

            let text = parse_event(data)?;
            if text.is_empty() {
                continue;
            }
            fragment_count += 1;
            total_len += text.len();
            if sender.send(text).await.is_err() {
                warn!("Fragment send failed: receiver dropped");
                return Err(ProviderError::ChannelClosed);
            }
        }

        info!(
            "Stream ended: {} fragments, {} bytes",
            fragment_count, total_len
        );
        Ok(())
    }

    async fn generate_image(
        &self,
        request: ImageRequest<'_>,
    ) -> Result<Option<GeneratedImage>, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::Config("Gemini API key is empty".to_string()));
        }

        let url = format!("{}/models/{}:predict", self.base_url, request.model);
        info!("Gemini image request: model={}", request.model);

        let response = self.post(&url, &build_predict_request(request.prompt)).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let parsed: PredictResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;

        let image = first_image(parsed);
        debug!("Image returned: {}", image.is_some());
        Ok(image)
    }
}

//! Frame analysis through a vision-capable chat model.
//!
//! [`FrameAnalyzer`] is the capability the pipeline depends on:
//! `analyze(image_bytes) -> text`. [`OpenAiVisionAnalyzer`] implements it
//! against an OpenAI-compatible `/chat/completions` endpoint; tests plug in
//! fakes.
//!
//! Requests are sent once. There is no retry or backoff.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default endpoint base.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Default vision model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default completion budget per frame.
pub const DEFAULT_MAX_TOKENS: u32 = 500;

/// Analysis text used when the model answers without any content.
pub const FALLBACK_ANALYSIS: &str = "Failed to analyze this frame.";

/// Default system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "Analyze this video frame for signs of deception or truthfulness.";

/// Default user prompt sent alongside each frame.
pub const DEFAULT_USER_PROMPT: &str = "Analyze this video frame for facial expressions, body language, and other visual cues that might indicate deception or truthfulness.";

/// Errors from a frame analysis call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnalysisError {
    /// No API key was configured.
    #[error("vision API key is not configured")]
    MissingApiKey,

    /// The request could not be sent or the response could not be read.
    #[error("vision API request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("vision API returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },
}

/// Produces a textual commentary for one encoded frame.
#[async_trait]
pub trait FrameAnalyzer: Send + Sync {
    /// Analyze a JPEG-encoded frame.
    async fn analyze(&self, image_bytes: &[u8]) -> Result<String, AnalysisError>;
}

/// Settings for [`OpenAiVisionAnalyzer`].
#[derive(Debug, Clone)]
pub struct VisionSettings {
    /// Bearer token sent in the `Authorization` header.
    pub api_key: String,
    /// Base URL without the trailing `/chat/completions`.
    pub api_base: String,
    /// Model identifier, e.g. `gpt-4o`.
    pub model: String,
    /// Completion budget per frame.
    pub max_tokens: u32,
    /// System message sent with every frame.
    pub system_prompt: String,
    /// Text part of the user message that carries the image.
    pub user_prompt: String,
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: OPENAI_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            user_prompt: DEFAULT_USER_PROMPT.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatResponse {
    /// First choice's content, or [`FALLBACK_ANALYSIS`] when there is none.
    pub(crate) fn into_analysis(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_ANALYSIS.to_string())
    }
}

/// Encode JPEG bytes as a `data:` URL.
pub fn jpeg_data_url(image_bytes: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", BASE64.encode(image_bytes))
}

/// OpenAI-compatible vision client.
pub struct OpenAiVisionAnalyzer {
    settings: VisionSettings,
    client: Client,
}

impl OpenAiVisionAnalyzer {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::MissingApiKey`] if `settings.api_key` is blank.
    pub fn new(settings: VisionSettings) -> Result<Self, AnalysisError> {
        Self::with_client(settings, Client::new())
    }

    /// Create a client reusing an existing `reqwest` client.
    pub fn with_client(settings: VisionSettings, client: Client) -> Result<Self, AnalysisError> {
        if settings.api_key.trim().is_empty() {
            return Err(AnalysisError::MissingApiKey);
        }
        Ok(Self { settings, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.api_base.trim_end_matches('/'))
    }

    pub(crate) fn build_request(&self, image_bytes: &[u8]) -> ChatRequest {
        ChatRequest {
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(self.settings.system_prompt.clone()),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::Text {
                            text: self.settings.user_prompt.clone(),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: jpeg_data_url(image_bytes),
                            },
                        },
                    ]),
                },
            ],
        }
    }
}

#[async_trait]
impl FrameAnalyzer for OpenAiVisionAnalyzer {
    async fn analyze(&self, image_bytes: &[u8]) -> Result<String, AnalysisError> {
        let request = self.build_request(image_bytes);

        tracing::debug!(
            model = %self.settings.model,
            bytes = image_bytes.len(),
            "Sending frame to vision API"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header(AUTHORIZATION, format!("Bearer {}", self.settings.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        Ok(parsed.into_analysis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> OpenAiVisionAnalyzer {
        OpenAiVisionAnalyzer::new(VisionSettings {
            api_key: "sk-test".to_string(),
            api_base: "http://localhost:9/v1/".to_string(),
            ..VisionSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn blank_api_key_is_rejected() {
        let result = OpenAiVisionAnalyzer::new(VisionSettings::default());
        assert!(matches!(result, Err(AnalysisError::MissingApiKey)));
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        assert_eq!(analyzer().endpoint(), "http://localhost:9/v1/chat/completions");
    }

    #[test]
    fn request_body_shape() {
        let request = analyzer().build_request(&[0xff, 0xd8, 0xff]);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["max_tokens"], 500);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][0]["content"], DEFAULT_SYSTEM_PROMPT);
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"][0]["type"], "text");
        assert_eq!(value["messages"][1]["content"][1]["type"], "image_url");
        assert_eq!(
            value["messages"][1]["content"][1]["image_url"]["url"],
            "data:image/jpeg;base64,/9j/"
        );
    }

    #[test]
    fn response_without_choices_falls_back() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"error": {"message": "x"}}"#).unwrap();
        assert_eq!(parsed.into_analysis(), FALLBACK_ANALYSIS);

        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert_eq!(parsed.into_analysis(), FALLBACK_ANALYSIS);
    }

    #[test]
    fn response_content_is_returned() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "Relaxed posture."}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.into_analysis(), "Relaxed posture.");
    }
}

//! Google Gemini gateway implementation

use super::types::{data_uri, MessageRole, TextRequest};
use super::{GatewayError, GenerationGateway};
use crate::persona::{image_prompt, system_instruction};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sampling temperature for every text request
pub const TEXT_TEMPERATURE: f32 = 1.2;

/// Aspect ratio requested for every image
pub const IMAGE_ASPECT_RATIO: &str = "1:1";

const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Connection settings for [`GeminiGateway`]
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    /// Scheme and host, e.g. `https://generativelanguage.googleapis.com`
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub persona: String,
    pub timeout: Duration,
}

/// Gemini gateway: one `generateContent` call per operation, no retries
pub struct GeminiGateway {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    text_model: String,
    image_model: String,
    persona: String,
}

impl GeminiGateway {
    pub fn new(settings: GeminiSettings) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| GatewayError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: settings.api_key.filter(|k| !k.is_empty()),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            text_model: settings.text_model,
            image_model: settings.image_model,
            persona: settings.persona,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    pub(super) fn translate_text_request(&self, request: &TextRequest) -> GeminiRequest {
        let mut contents: Vec<GeminiContent> = request
            .history
            .iter()
            .map(|turn| GeminiContent::text(provider_role(turn.role), turn.content.clone()))
            .collect();
        contents.push(GeminiContent::text("user", request.message.clone()));

        GeminiRequest {
            contents,
            system_instruction: Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text {
                    text: system_instruction(&self.persona, request.force_language),
                }],
            }),
            generation_config: Some(GeminiGenerationConfig {
                temperature: Some(TEXT_TEMPERATURE),
                image_config: None,
            }),
        }
    }

    pub(super) fn translate_image_request(prompt: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent::text("user", image_prompt(prompt))],
            system_instruction: None,
            generation_config: Some(GeminiGenerationConfig {
                temperature: None,
                image_config: Some(GeminiImageConfig {
                    aspect_ratio: IMAGE_ASPECT_RATIO.to_string(),
                }),
            }),
        }
    }

    /// Concatenated text of the first candidate, `None` when blank
    pub(super) fn extract_text(resp: &GeminiResponse) -> Option<String> {
        let text: String = first_parts(resp)
            .iter()
            .filter_map(|part| match part {
                GeminiPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();

        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub(super) fn finish_reason(resp: &GeminiResponse) -> Option<&str> {
        resp.candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
    }

    /// First inline image of the first candidate as a data URI
    pub(super) fn extract_image(resp: &GeminiResponse) -> Option<String> {
        first_parts(resp).iter().find_map(|part| match part {
            GeminiPart::InlineData { inline_data } => Some(data_uri(
                inline_data.mime_type.as_deref().unwrap_or(DEFAULT_IMAGE_MIME),
                &inline_data.data,
            )),
            _ => None,
        })
    }

    async fn send(&self, model: &str, body: &GeminiRequest) -> Result<GeminiResponse, GatewayError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GatewayError::auth("No API key configured. Set GEMINI_API_KEY"))?;

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    GatewayError::network(format!("Connection failed: {e}"))
                } else {
                    GatewayError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map_or(body, |resp| resp.error.message);
            return Err(GatewayError::from_status(status.as_u16(), &message));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            GatewayError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        if let Some(usage) = &parsed.usage_metadata {
            tracing::debug!(
                model,
                prompt_tokens = usage.prompt_token_count,
                candidate_tokens = usage.candidates_token_count,
                "Gemini usage"
            );
        }

        Ok(parsed)
    }
}

#[async_trait]
impl GenerationGateway for GeminiGateway {
    async fn generate_text(&self, request: &TextRequest) -> Result<Option<String>, GatewayError> {
        let body = self.translate_text_request(request);
        let response = self.send(&self.text_model, &body).await?;
        let text = Self::extract_text(&response);
        if text.is_none() {
            // SAFETY or RECITATION blocks arrive as candidates without text
            tracing::warn!(
                model = %self.text_model,
                finish_reason = ?Self::finish_reason(&response),
                "Gemini returned no text"
            );
        }
        Ok(text)
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<String>, GatewayError> {
        let body = Self::translate_image_request(prompt);
        let response = self.send(&self.image_model, &body).await?;
        Ok(Self::extract_image(&response))
    }

    fn text_model(&self) -> &str {
        &self.text_model
    }

    fn image_model(&self) -> &str {
        &self.image_model
    }
}

fn provider_role(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "model",
    }
}

fn first_parts(resp: &GeminiResponse) -> &[GeminiPart] {
    resp.candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map_or(&[][..], |content| content.parts.as_slice())
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn text(role: &str, text: String) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![GeminiPart::Text { text }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub(super) enum GeminiPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    Text {
        text: String,
    },
    /// Part types this client never produces and ignores on the way in
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiInlineData {
    #[serde(default)]
    pub mime_type: Option<String>,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<GeminiImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiImageConfig {
    pub aspect_ratio: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    pub usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiUsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

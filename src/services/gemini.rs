//! Client for the Gemini `generateContent` API.

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{ConfigError, ExtractError, GeminiError};
use crate::models::GeminiConfig;
use crate::services::ContentExtractor;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

/// Response from `generateContent`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub usage_metadata: Option<UsageMetadata>,
    pub model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<ResponseContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
    #[serde(default)]
    pub thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u32>,
    pub candidates_token_count: Option<u32>,
    pub total_token_count: Option<u32>,
}

/// Model metadata returned by `GET models/{model}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    pub display_name: Option<String>,
    pub input_token_limit: Option<u64>,
    pub output_token_limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, skipping thought parts.
    pub fn text(&self) -> Result<String, GeminiError> {
        let Some(candidate) = self.candidates.first() else {
            let reason = self
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.clone());
            return Err(GeminiError::EmptyResponse(reason));
        };

        let text: String = candidate
            .content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter(|p| !p.thought)
            .filter_map(|p| p.text.as_deref())
            .collect();

        if text.is_empty() {
            return Err(GeminiError::EmptyResponse(candidate.finish_reason.clone()));
        }
        Ok(text)
    }
}

/// Client for the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: Option<f32>,
}

impl GeminiClient {
    /// Create a new client. Fails when no API key is configured.
    pub fn new(config: &GeminiConfig) -> Result<Self, ConfigError> {
        let api_key = config.require_api_key()?.to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.trim_start_matches("models/").to_string(),
            api_key,
            temperature: config.temperature,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn model_url(&self) -> String {
        format!("{}/{}", self.base_url, self.model)
    }

    fn generate_url(&self) -> String {
        format!("{}:generateContent", self.model_url())
    }

    /// Ask the model about one image.
    pub async fn generate_from_image(
        &self,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, GeminiError> {
        let request = build_request(prompt, image, mime_type, self.temperature);
        let url = self.generate_url();
        debug!(%url, bytes = image.len(), mime_type, "sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| GeminiError::InvalidResponse(e.to_string()))?;

        if let Some(ref usage) = parsed.usage_metadata {
            debug!(
                prompt_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                total_tokens = usage.total_token_count,
                model_version = parsed.model_version.as_deref(),
                "generateContent finished"
            );
        }

        parsed.text()
    }

    /// Fetch model metadata; used to verify the key and model name.
    pub async fn check_model(&self) -> Result<ModelInfo, GeminiError> {
        let response = self
            .client
            .get(self.model_url())
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| GeminiError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ContentExtractor for GeminiClient {
    async fn extract(
        &self,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, ExtractError> {
        Ok(self.generate_from_image(prompt, image, mime_type).await?)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

fn build_request<'a>(
    prompt: &'a str,
    image: &[u8],
    mime_type: &'a str,
    temperature: Option<f32>,
) -> GenerateRequest<'a> {
    let data = base64::engine::general_purpose::STANDARD.encode(image);
    GenerateRequest {
        contents: vec![RequestContent {
            role: "user",
            parts: vec![
                RequestPart::Text { text: prompt },
                RequestPart::InlineData {
                    inline_data: InlineData { mime_type, data },
                },
            ],
        }],
        generation_config: temperature.map(|temperature| GenerationConfig { temperature }),
    }
}

fn map_transport_error(e: reqwest::Error) -> GeminiError {
    if e.is_timeout() {
        GeminiError::Timeout
    } else {
        GeminiError::Request(e)
    }
}

fn api_error(status: u16, body: &str) -> GeminiError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    GeminiError::Api { status, message }
}

use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::OcrConfig;
use crate::error::{Result, SnaptextError};

const OCR_PROMPT: &str = "Extract all text from this image. Return only the extracted text without any explanations or formatting.";

/// Default endpoint and model for each supported remote provider.
fn provider_defaults(provider: &str) -> Option<(&'static str, &'static str, &'static str)> {
    match provider {
        "openai" => Some(("openai", "https://api.openai.com/v1", "gpt-4o-mini")),
        "mistral" => Some(("mistral", "https://api.mistral.ai/v1", "pixtral-12b-2409")),
        "deepseek" => Some(("deepseek", "https://api.deepseek.com/v1", "deepseek-vl")),
        _ => None,
    }
}

/// Client for OpenAI-compatible vision chat endpoints.
#[derive(Clone, Debug)]
pub struct VisionOcrClient {
    client: Client,
    provider: &'static str,
    api_key: String,
    base_url: String,
    model: String,
    max_elapsed: Duration,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: String,
}

impl VisionOcrClient {
    pub fn new(provider: &str, model: &str, config: &OcrConfig) -> Result<Self> {
        let (provider, default_base_url, default_model) = provider_defaults(
            &provider.to_lowercase(),
        )
        .ok_or_else(|| SnaptextError::Ocr(format!("Unknown OCR provider: {provider}")))?;

        let api_key = config.api_key.clone().ok_or_else(|| {
            SnaptextError::Ocr(format!("API key required for {provider} OCR"))
        })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url.to_string());

        let model = if model.is_empty() {
            default_model.to_string()
        } else {
            model.to_string()
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SnaptextError::Ocr(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            provider,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            max_elapsed: Duration::from_secs(config.timeout_secs),
        })
    }

    pub fn provider(&self) -> &str {
        self.provider
    }

    pub async fn ocr(&self, image_bytes: &[u8]) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: OCR_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: data_url(image_bytes),
                        },
                    },
                ],
            }],
            max_tokens: 4096,
        };

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(100))
            .with_max_elapsed_time(Some(self.max_elapsed))
            .build();

        let request = &request;
        backoff::future::retry(policy, || async move { self.send_once(request).await }).await
    }

    async fn send_once(
        &self,
        request: &ChatRequest,
    ) -> std::result::Result<String, backoff::Error<SnaptextError>> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                debug!(error = %e, "Vision OCR request failed, will retry");
                backoff::Error::transient(SnaptextError::Ocr(format!("API request failed: {e}")))
            })?;

        let status = response.status();
        if status.is_success() {
            let chat: ChatResponse = response.json().await.map_err(|e| {
                backoff::Error::permanent(SnaptextError::Ocr(format!(
                    "Failed to parse response: {e}"
                )))
            })?;

            return chat
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content.trim().to_string())
                .ok_or_else(|| {
                    backoff::Error::permanent(SnaptextError::Ocr(
                        "No response from API".to_string(),
                    ))
                });
        }

        let body = response.text().await.unwrap_or_default();
        let err = SnaptextError::Ocr(format!("API request failed: {status} - {body}"));

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            debug!(%status, "Vision OCR request rejected, will retry");
            Err(backoff::Error::transient(err))
        } else {
            Err(backoff::Error::permanent(err))
        }
    }
}

fn data_url(image_bytes: &[u8]) -> String {
    let mime = infer::get(image_bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or("image/png");
    format!("data:{mime};base64,{}", STANDARD.encode(image_bytes))
}

//! Ollama adapter (`/api/chat`, non-streaming)

use super::groq::{flat_messages, ChatMessage};
use super::{resolve_model, send_json, LlmProvider, ProviderRequest, ProviderResult};
use ragforge_common::{
    config::ProviderEndpoint,
    errors::{AppError, Result},
    models::ProviderKind,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct OllamaProvider {
    client: reqwest::Client,
    endpoint: ProviderEndpoint,
    connect_timeout: Duration,
}

impl OllamaProvider {
    pub fn new(client: reqwest::Client, endpoint: ProviderEndpoint, connect_timeout: Duration) -> Self {
        Self {
            client,
            endpoint,
            connect_timeout,
        }
    }

    fn base_url<'a>(&'a self, request: &'a ProviderRequest) -> &'a str {
        request
            .endpoint_override
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(self.endpoint.base_url.as_str())
            .trim_end_matches('/')
    }
}

#[async_trait::async_trait]
impl LlmProvider for OllamaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    async fn dispatch(&self, request: &ProviderRequest) -> Result<ProviderResult> {
        let model = resolve_model(&self.endpoint, request);
        let url = format!("{}/api/chat", self.base_url(request));

        let builder = self.client.post(url).json(&build_body(request, &model));

        let response: ChatResponse = send_json(ProviderKind::Ollama, builder, self.connect_timeout).await?;

        Ok(ProviderResult {
            raw_text: extract_text(response)?,
            model,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ModelOptions>,
}

#[derive(Debug, Serialize)]
struct ModelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

fn build_body(request: &ProviderRequest, model: &str) -> ChatRequest {
    let options = (request.temperature.is_some() || request.max_tokens.is_some()).then(|| ModelOptions {
        temperature: request.temperature,
        num_predict: request.max_tokens,
    });

    ChatRequest {
        model: model.to_string(),
        messages: flat_messages(ProviderKind::Ollama, request),
        stream: false,
        options,
    }
}

fn extract_text(response: ChatResponse) -> Result<String> {
    if let Some(error) = response.error {
        return Err(AppError::ProviderResponseInvalid {
            provider: ProviderKind::Ollama,
            status: None,
            message: error,
        });
    }

    response
        .message
        .map(|m| m.content)
        .ok_or_else(|| AppError::ProviderResponseInvalid {
            provider: ProviderKind::Ollama,
            status: None,
            message: "response carried no message".to_string(),
        })
}

//! Groq adapter (OpenAI-compatible chat completions)

use super::{resolve_credential, resolve_model, role_label, send_json, LlmProvider, ProviderRequest, ProviderResult};
use ragforge_common::{
    config::ProviderEndpoint,
    errors::{AppError, Result},
    models::{ApiKeys, ProviderKind},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct GroqProvider {
    client: reqwest::Client,
    endpoint: ProviderEndpoint,
    connect_timeout: Duration,
}

impl GroqProvider {
    pub fn new(client: reqwest::Client, endpoint: ProviderEndpoint, connect_timeout: Duration) -> Self {
        Self {
            client,
            endpoint,
            connect_timeout,
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for GroqProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Groq
    }

    fn preflight(&self, credentials: &ApiKeys) -> Result<()> {
        resolve_credential(ProviderKind::Groq, credentials, &self.endpoint).map(|_| ())
    }

    async fn dispatch(&self, request: &ProviderRequest) -> Result<ProviderResult> {
        let api_key = resolve_credential(ProviderKind::Groq, &request.credentials, &self.endpoint)?;
        let model = resolve_model(&self.endpoint, request);
        let url = format!("{}/chat/completions", self.endpoint.base_url.trim_end_matches('/'));

        let builder = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&build_body(request, &model));

        let response: ChatCompletionResponse =
            send_json(ProviderKind::Groq, builder, self.connect_timeout).await?;

        Ok(ProviderResult {
            raw_text: extract_text(response)?,
            model,
        })
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ChatMessage {
    pub(super) role: &'static str,
    pub(super) content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

/// Flat message list: system prompt, history in order, then the user message.
/// Shared with the Ollama adapter, which uses the same role labels.
pub(super) fn flat_messages(provider: ProviderKind, request: &ProviderRequest) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(request.history.len() + 2);

    if let Some(system) = request.system_prompt.as_deref().filter(|s| !s.trim().is_empty()) {
        messages.push(ChatMessage {
            role: "system",
            content: system.to_string(),
        });
    }

    messages.extend(request.history.iter().filter_map(|turn| {
        role_label(provider, turn.role).map(|role| ChatMessage {
            role,
            content: turn.content.clone(),
        })
    }));

    messages.push(ChatMessage {
        role: "user",
        content: request.user_message.clone(),
    });

    messages
}

fn build_body(request: &ProviderRequest, model: &str) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: model.to_string(),
        messages: flat_messages(ProviderKind::Groq, request),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    }
}

fn extract_text(response: ChatCompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| AppError::ProviderResponseInvalid {
            provider: ProviderKind::Groq,
            status: None,
            message: "Empty response from LLM".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderTarget;
    use crate::test_support::serve_once;
    use ragforge_common::config::AppConfig;
    use ragforge_common::errors::ErrorKind;
    use ragforge_common::models::{ChatTurn, ProviderSelection, Task};
    use serde_json::json;

    fn request(task: Task) -> ProviderRequest {
        let target = ProviderTarget::from_selection(&ProviderSelection::default(), "groq").unwrap();
        target.request(task, "question".into())
    }

    #[test]
    fn test_body_preserves_history_order() {
        let mut req = request(Task::Synthesis);
        req.system_prompt = Some("You are a tutor.".into());
        req.history = vec![
            ChatTurn::user("first"),
            ChatTurn::assistant("second"),
            ChatTurn::system("third"),
        ];
        req.temperature = Some(0.2);
        req.max_tokens = Some(512);

        let body = serde_json::to_value(build_body(&req, "llama3-8b-8192")).unwrap();
        let roles: Vec<&str> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();

        assert_eq!(roles, vec!["system", "user", "assistant", "system", "user"]);
        assert_eq!(body["messages"][4]["content"], "question");
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["model"], "llama3-8b-8192");
    }

    #[test]
    fn test_optional_parameters_omitted() {
        let body = serde_json::to_value(build_body(&request(Task::SubQuery), "m")).unwrap();
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_model_resolution_per_task() {
        let mut endpoint = AppConfig::default().providers.groq;
        endpoint.models.subquery = "llama3-70b-8192".into();

        assert_eq!(resolve_model(&endpoint, &request(Task::SubQuery)), "llama3-70b-8192");
        assert_eq!(resolve_model(&endpoint, &request(Task::Synthesis)), "llama3-8b-8192");

        let mut req = request(Task::SubQuery);
        req.model = Some("mixtral-8x7b-32768".into());
        assert_eq!(resolve_model(&endpoint, &req), "mixtral-8x7b-32768");
    }

    #[test]
    fn test_extract_text() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "role": "assistant", "content": "hello" } }]
        }))
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "hello");

        let empty: ChatCompletionResponse = serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert_eq!(extract_text(empty).unwrap_err().kind(), ErrorKind::ProviderResponseInvalid);
    }

    async fn dispatch_against(status: u16, body: &str) -> Result<ProviderResult> {
        let mut endpoint = AppConfig::default().providers.groq;
        endpoint.base_url = serve_once(status, body).await;
        endpoint.api_key = Some("gsk-test".into());

        let connect = Duration::from_secs(5);
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let provider = GroqProvider::new(client, endpoint, connect);
        provider.dispatch(&request(Task::Synthesis)).await
    }

    #[tokio::test]
    async fn test_dispatch_success_over_http() {
        let result = dispatch_against(200, r#"{"choices":[{"message":{"role":"assistant","content":"hi there"}}]}"#)
            .await
            .unwrap();
        assert_eq!(result.raw_text, "hi there");
        assert_eq!(result.model, "llama3-8b-8192");
    }

    #[tokio::test]
    async fn test_dispatch_classifies_http_status() {
        let err = dispatch_against(429, r#"{"error":{"message":"quota"}}"#).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderRateLimited);
        assert!(err.to_string().contains("quota"));

        let err = dispatch_against(500, "boom").await.unwrap_err();
        assert!(matches!(err, AppError::ProviderUnavailable { status: Some(500), .. }));

        let err = dispatch_against(401, "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderAuthRejected);
    }

    #[tokio::test]
    async fn test_dispatch_malformed_body_is_invalid() {
        let err = dispatch_against(200, "<html>not json</html>").await.unwrap_err();
        assert!(matches!(err, AppError::ProviderResponseInvalid { status: Some(200), .. }));
        assert!(err.to_string().contains("not json"));
    }
}

//! Google Gemini adapter (`generateContent`)

use super::{resolve_credential, resolve_model, role_label, send_json, LlmProvider, ProviderRequest, ProviderResult};
use ragforge_common::{
    config::ProviderEndpoint,
    errors::{AppError, Result},
    models::{ApiKeys, ProviderKind},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Finish reasons that mean the backend refused to answer
const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST"];

pub struct GeminiProvider {
    client: reqwest::Client,
    endpoint: ProviderEndpoint,
    connect_timeout: Duration,
}

impl GeminiProvider {
    pub fn new(client: reqwest::Client, endpoint: ProviderEndpoint, connect_timeout: Duration) -> Self {
        Self {
            client,
            endpoint,
            connect_timeout,
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn preflight(&self, credentials: &ApiKeys) -> Result<()> {
        resolve_credential(ProviderKind::Gemini, credentials, &self.endpoint).map(|_| ())
    }

    async fn dispatch(&self, request: &ProviderRequest) -> Result<ProviderResult> {
        let api_key = resolve_credential(ProviderKind::Gemini, &request.credentials, &self.endpoint)?;
        let model = resolve_model(&self.endpoint, request);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.base_url.trim_end_matches('/'),
            model
        );

        let builder = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&build_body(request));

        let response: GenerateContentResponse =
            send_json(ProviderKind::Gemini, builder, self.connect_timeout).await?;

        Ok(ProviderResult {
            raw_text: extract_text(response)?,
            model,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// System turns leave the history and join the system prompt in the
/// dedicated instruction slot; assistant turns are relabelled `model`.
fn build_body(request: &ProviderRequest) -> GenerateContentRequest {
    let mut system_parts: Vec<&str> = request
        .system_prompt
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .into_iter()
        .collect();
    let mut contents = Vec::with_capacity(request.history.len() + 1);

    for turn in &request.history {
        match role_label(ProviderKind::Gemini, turn.role) {
            Some(role) => contents.push(Content {
                role,
                parts: vec![Part {
                    text: turn.content.clone(),
                }],
            }),
            None => system_parts.push(&turn.content),
        }
    }

    contents.push(Content {
        role: "user",
        parts: vec![Part {
            text: request.user_message.clone(),
        }],
    });

    let system_instruction = (!system_parts.is_empty()).then(|| SystemInstruction {
        parts: vec![Part {
            text: system_parts.join("\n\n"),
        }],
    });

    let generation_config = (request.temperature.is_some() || request.max_tokens.is_some()).then(|| {
        GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
        }
    });

    GenerateContentRequest {
        contents,
        system_instruction,
        generation_config,
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(AppError::ProviderContentBlocked {
            provider: ProviderKind::Gemini,
            reason,
        });
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AppError::ProviderResponseInvalid {
            provider: ProviderKind::Gemini,
            status: None,
            message: "response contained no candidates".to_string(),
        })?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if !text.is_empty() {
        return Ok(text);
    }

    match candidate.finish_reason {
        Some(reason) if BLOCKING_FINISH_REASONS.contains(&reason.as_str()) => {
            Err(AppError::ProviderContentBlocked {
                provider: ProviderKind::Gemini,
                reason,
            })
        }
        reason => Err(AppError::ProviderResponseInvalid {
            provider: ProviderKind::Gemini,
            status: None,
            message: format!(
                "candidate had no text (finish reason: {})",
                reason.as_deref().unwrap_or("none")
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderTarget;
    use ragforge_common::config::AppConfig;
    use ragforge_common::errors::ErrorKind;
    use ragforge_common::models::{ChatTurn, ProviderSelection, Task};
    use serde_json::json;

    fn request() -> ProviderRequest {
        let target = ProviderTarget::from_selection(&ProviderSelection::default(), "gemini").unwrap();
        target.request(Task::Synthesis, "What is backpropagation?".into())
    }

    #[test]
    fn test_body_roles_and_system_instruction() {
        let mut req = request();
        req.system_prompt = Some("Be precise.".into());
        req.history = vec![
            ChatTurn::user("hi"),
            ChatTurn::system("Answer in English."),
            ChatTurn::assistant("hello"),
        ];

        let body = serde_json::to_value(build_body(&req)).unwrap();

        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][1]["parts"][0]["text"], "hello");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "What is backpropagation?");
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "Be precise.\n\nAnswer in English."
        );
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_generation_config_only_when_set() {
        let mut req = request();
        req.max_tokens = Some(256);

        let body = serde_json::to_value(build_body(&req)).unwrap();
        assert_eq!(body["generationConfig"], json!({ "maxOutputTokens": 256 }));
    }

    #[test]
    fn test_extract_concatenates_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "<reasoning>x</reasoning>" }, { "text": "answer" }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "<reasoning>x</reasoning>answer");
    }

    #[test]
    fn test_extract_blocked() {
        let prompt_blocked: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        assert_eq!(
            extract_text(prompt_blocked).unwrap_err().kind(),
            ErrorKind::ProviderContentBlocked
        );

        let candidate_blocked: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "PROHIBITED_CONTENT" }]
        }))
        .unwrap();
        assert_eq!(
            extract_text(candidate_blocked).unwrap_err().kind(),
            ErrorKind::ProviderContentBlocked
        );
    }

    #[test]
    fn test_extract_empty_is_invalid() {
        let err = extract_text(GenerateContentResponse::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderResponseInvalid);
    }

    #[tokio::test]
    async fn test_missing_credential_before_network() {
        let mut endpoint = AppConfig::default().providers.gemini;
        endpoint.api_key = None;
        // Nothing listens here; reaching the network would surface as unavailable
        endpoint.base_url = "http://127.0.0.1:9".into();
        let provider = GeminiProvider::new(reqwest::Client::new(), endpoint, Duration::from_secs(1));

        let err = provider.dispatch(&request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingCredential);
        assert!(provider.preflight(&ApiKeys::default()).is_err());
    }
}

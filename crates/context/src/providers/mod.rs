//! LLM provider adapters
//!
//! One [`LlmProvider`] implementation per backend, each translating the
//! provider-neutral [`ProviderRequest`] into its own wire format and mapping
//! every failure into the shared error taxonomy. Adapters make exactly one
//! outbound call per dispatch and never retry.

mod gemini;
mod groq;
mod ollama;

pub use gemini::GeminiProvider;
pub use groq::GroqProvider;
pub use ollama::OllamaProvider;

use ragforge_common::{
    config::{AppConfig, ProviderEndpoint},
    errors::{AppError, Result},
    metrics::{self, Outcome},
    models::{ApiKeys, ChatRole, ChatTurn, ProviderKind, ProviderSelection, Task},
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest response-body excerpt carried in error diagnostics
const BODY_EXCERPT_CHARS: usize = 300;

/// Provider-neutral call description. Built once, never mutated after dispatch.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub provider: ProviderKind,
    pub task: Task,
    /// Caller-chosen model; the adapter falls back to its per-task default
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub history: Vec<ChatTurn>,
    pub user_message: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub credentials: ApiKeys,
    /// Replaces the configured base URL for this call (Ollama only)
    pub endpoint_override: Option<String>,
}

/// Raw model output plus the model that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResult {
    pub raw_text: String,
    pub model: String,
}

/// Where and how to reach a provider for one request
#[derive(Debug, Clone)]
pub struct ProviderTarget {
    pub provider: ProviderKind,
    pub model: Option<String>,
    pub credentials: ApiKeys,
    pub endpoint_override: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ProviderTarget {
    /// Resolve a caller selection, using `default_provider` when none is named
    pub fn from_selection(selection: &ProviderSelection, default_provider: &str) -> Result<Self> {
        let name = selection
            .provider
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(default_provider);
        let provider: ProviderKind = name.parse()?;

        Ok(Self {
            provider,
            model: selection
                .model
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
            credentials: selection.api_keys.clone(),
            endpoint_override: selection
                .ollama_url
                .clone()
                .filter(|_| provider == ProviderKind::Ollama),
            temperature: selection.temperature,
            max_tokens: selection.max_tokens,
        })
    }

    /// Single-turn request for `task`
    pub fn request(&self, task: Task, user_message: String) -> ProviderRequest {
        ProviderRequest {
            provider: self.provider,
            task,
            model: self.model.clone(),
            system_prompt: None,
            history: Vec::new(),
            user_message,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            credentials: self.credentials.clone(),
            endpoint_override: self.endpoint_override.clone(),
        }
    }
}

/// Uniform call contract over one LLM backend
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Backend this adapter speaks to
    fn kind(&self) -> ProviderKind;

    /// Fail fast when the request cannot be sent at all. No network access.
    fn preflight(&self, _credentials: &ApiKeys) -> Result<()> {
        Ok(())
    }

    /// Send one request and return the raw model text
    async fn dispatch(&self, request: &ProviderRequest) -> Result<ProviderResult>;
}

/// Dispatch under a deadline, recording the outcome.
///
/// An elapsed deadline drops the in-flight call and surfaces as `ProviderTimeout`.
pub async fn dispatch_with_timeout(
    provider: &dyn LlmProvider,
    request: &ProviderRequest,
    limit: Duration,
) -> Result<ProviderResult> {
    let start = Instant::now();
    let result = match tokio::time::timeout(limit, provider.dispatch(request)).await {
        Ok(result) => result,
        Err(_) => Err(AppError::ProviderTimeout {
            provider: request.provider,
            timeout_ms: Some(limit.as_millis() as u64),
            status: None,
        }),
    };

    let outcome = match &result {
        Ok(_) => Outcome::Success,
        Err(AppError::ProviderTimeout { .. }) => Outcome::Timeout,
        Err(_) => Outcome::Error,
    };
    metrics::record_dispatch(request.provider, request.task, start.elapsed().as_secs_f64(), outcome);

    result
}

/// Provider role label for a history turn. `None` means the turn is excised
/// from the message list and carried in the provider's system slot.
pub fn role_label(provider: ProviderKind, role: ChatRole) -> Option<&'static str> {
    match (provider, role) {
        (ProviderKind::Gemini, ChatRole::System) => None,
        (ProviderKind::Gemini, ChatRole::User) => Some("user"),
        (ProviderKind::Gemini, ChatRole::Assistant) => Some("model"),
        (_, ChatRole::System) => Some("system"),
        (_, ChatRole::User) => Some("user"),
        (_, ChatRole::Assistant) => Some("assistant"),
    }
}

/// Caller model if given, else the endpoint's default for the task
pub(crate) fn resolve_model(endpoint: &ProviderEndpoint, request: &ProviderRequest) -> String {
    request
        .model
        .clone()
        .unwrap_or_else(|| endpoint.models.for_task(request.task).to_string())
}

/// Per-request key first, then the process-wide fallback
pub(crate) fn resolve_credential(
    provider: ProviderKind,
    credentials: &ApiKeys,
    endpoint: &ProviderEndpoint,
) -> Result<String> {
    credentials
        .for_provider(provider)
        .or_else(|| endpoint.fallback_key())
        .map(str::to_string)
        .ok_or(AppError::MissingCredential { provider })
}

/// Map a non-success HTTP status onto the taxonomy
pub fn classify_status(provider: ProviderKind, status: u16, body: &str) -> AppError {
    let message = excerpt(body);
    match status {
        401 | 403 => AppError::ProviderAuthRejected { provider, status },
        429 => AppError::ProviderRateLimited { provider, message },
        // Upstream gave up; no deadline of ours elapsed
        408 | 504 => AppError::ProviderTimeout {
            provider,
            timeout_ms: None,
            status: Some(status),
        },
        500..=599 => AppError::ProviderUnavailable {
            provider,
            status: Some(status),
            message,
        },
        _ => AppError::ProviderResponseInvalid {
            provider,
            status: Some(status),
            message,
        },
    }
}

/// Map a transport-level failure onto the taxonomy
pub(crate) fn classify_transport(provider: ProviderKind, err: reqwest::Error, connect: Duration) -> AppError {
    if err.is_timeout() {
        AppError::ProviderTimeout {
            provider,
            timeout_ms: Some(connect.as_millis() as u64),
            status: None,
        }
    } else if err.is_decode() {
        AppError::ProviderResponseInvalid {
            provider,
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    } else {
        // Drop the URL from diagnostics
        AppError::ProviderUnavailable {
            provider,
            status: None,
            message: err.without_url().to_string(),
        }
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Send a prepared request and decode the success body as `T`
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: ProviderKind,
    builder: reqwest::RequestBuilder,
    connect: Duration,
) -> Result<T> {
    let response = builder
        .send()
        .await
        .map_err(|e| classify_transport(provider, e, connect))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(classify_status(provider, status.as_u16(), &body));
    }

    let body = response
        .text()
        .await
        .map_err(|e| classify_transport(provider, e, connect))?;

    serde_json::from_str(&body).map_err(|e| AppError::ProviderResponseInvalid {
        provider,
        status: Some(status.as_u16()),
        message: format!("malformed JSON ({}): {}", e, excerpt(&body)),
    })
}

/// Build the shared outbound HTTP client
pub fn http_client(connect: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(connect)
        .build()
        .map_err(|e| AppError::Internal {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

/// Adapters keyed by backend, selected once per request
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn LlmProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the three HTTP adapters sharing one client
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let connect = config.timeouts.connect();
        let client = http_client(connect)?;

        Ok(Self::new()
            .with(Arc::new(GeminiProvider::new(client.clone(), config.providers.gemini.clone(), connect)))
            .with(Arc::new(GroqProvider::new(client.clone(), config.providers.groq.clone(), connect)))
            .with(Arc::new(OllamaProvider::new(client, config.providers.ollama.clone(), connect))))
    }

    /// Register or replace the adapter for its backend
    pub fn with(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn LlmProvider>> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or_else(|| AppError::UnsupportedProvider {
                provider: kind.to_string(),
            })
    }
}

//! Configuration management for RagForge services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values
//!
//! The loaded value is immutable. Build it once at startup and share it
//! behind an `Arc`.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use crate::models::Task;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// LLM provider configuration
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Retrieval and prompt budget configuration
    #[serde(default)]
    pub rag: RagConfig,

    /// Call timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// External vector index service
    #[serde(default)]
    pub index: IndexConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvidersConfig {
    /// Provider used when a request names none
    #[serde(default = "default_provider")]
    pub default_provider: String,

    #[serde(default = "default_gemini", deserialize_with = "gemini_endpoint")]
    pub gemini: ProviderEndpoint,

    #[serde(default = "default_groq", deserialize_with = "groq_endpoint")]
    pub groq: ProviderEndpoint,

    #[serde(default = "default_ollama", deserialize_with = "ollama_endpoint")]
    pub ollama: ProviderEndpoint,
}

/// Endpoint, fallback credential and default models for one provider.
///
/// Deserialised field by field over the provider's own defaults, so a
/// source that sets only `api_key` keeps the default URL and models.
#[derive(Clone, Serialize)]
pub struct ProviderEndpoint {
    /// Process-wide fallback API key
    pub api_key: Option<String>,

    /// API base URL
    pub base_url: String,

    /// Default model per task
    pub models: TaskModels,
}

impl std::fmt::Debug for ProviderEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEndpoint")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("models", &self.models)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskModels {
    pub analysis: String,
    pub subquery: String,
    pub synthesis: String,
}

/// Provider table as read from a source; unset fields fall back later
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PartialEndpoint {
    api_key: Option<String>,
    base_url: Option<String>,
    models: PartialModels,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PartialModels {
    analysis: Option<String>,
    subquery: Option<String>,
    synthesis: Option<String>,
}

impl PartialEndpoint {
    fn over(self, defaults: ProviderEndpoint) -> ProviderEndpoint {
        ProviderEndpoint {
            api_key: self.api_key.or(defaults.api_key),
            base_url: self.base_url.unwrap_or(defaults.base_url),
            models: TaskModels {
                analysis: self.models.analysis.unwrap_or(defaults.models.analysis),
                subquery: self.models.subquery.unwrap_or(defaults.models.subquery),
                synthesis: self.models.synthesis.unwrap_or(defaults.models.synthesis),
            },
        }
    }
}

fn gemini_endpoint<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ProviderEndpoint, D::Error> {
    PartialEndpoint::deserialize(deserializer).map(|partial| partial.over(default_gemini()))
}

fn groq_endpoint<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ProviderEndpoint, D::Error> {
    PartialEndpoint::deserialize(deserializer).map(|partial| partial.over(default_groq()))
}

fn ollama_endpoint<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ProviderEndpoint, D::Error> {
    PartialEndpoint::deserialize(deserializer).map(|partial| partial.over(default_ollama()))
}

impl TaskModels {
    fn uniform(model: &str) -> Self {
        Self {
            analysis: model.to_string(),
            subquery: model.to_string(),
            synthesis: model.to_string(),
        }
    }

    pub fn for_task(&self, task: Task) -> &str {
        match task {
            Task::Analysis => &self.analysis,
            Task::SubQuery => &self.subquery,
            Task::Synthesis => &self.synthesis,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RagConfig {
    /// Chunks requested from the index per query
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Sub-queries generated when expansion is on and the request sets no count
    #[serde(default = "default_subquery_count")]
    pub subquery_count: usize,

    /// Upper bound on fused chunks placed in a prompt
    #[serde(default = "default_max_context_chunks")]
    pub max_context_chunks: usize,

    /// Character budget for document excerpts in analysis prompts
    #[serde(default = "default_analysis_max_chars")]
    pub analysis_max_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeoutConfig {
    /// Main synthesis dispatch
    #[serde(default = "default_synthesis_timeout")]
    pub synthesis_secs: u64,

    /// Best-effort sub-query generation
    #[serde(default = "default_expansion_timeout")]
    pub expansion_secs: u64,

    /// Document analysis dispatch
    #[serde(default = "default_analysis_timeout")]
    pub analysis_secs: u64,

    /// Single vector index lookup
    #[serde(default = "default_retrieval_timeout")]
    pub retrieval_secs: u64,

    /// TCP connect timeout for outbound HTTP clients
    #[serde(default = "default_connect_timeout")]
    pub connect_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Vector index service base URL
    #[serde(default = "default_index_url")]
    pub base_url: String,

    /// Query route on the index service
    #[serde(default = "default_index_path")]
    pub query_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default)]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_provider() -> String { "gemini".to_string() }
fn default_gemini() -> ProviderEndpoint {
    ProviderEndpoint {
        api_key: None,
        base_url: "https://generativelanguage.googleapis.com".to_string(),
        models: TaskModels::uniform("gemini-1.5-flash"),
    }
}
fn default_groq() -> ProviderEndpoint {
    ProviderEndpoint {
        api_key: None,
        base_url: "https://api.groq.com/openai/v1".to_string(),
        models: TaskModels::uniform("llama3-8b-8192"),
    }
}
fn default_ollama() -> ProviderEndpoint {
    ProviderEndpoint {
        api_key: None,
        base_url: "http://127.0.0.1:11434".to_string(),
        models: TaskModels::uniform("llama3"),
    }
}
fn default_k() -> usize { 5 }
fn default_subquery_count() -> usize { 3 }
fn default_max_context_chunks() -> usize { 10 }
fn default_analysis_max_chars() -> usize { 30_000 }
fn default_synthesis_timeout() -> u64 { 120 }
fn default_expansion_timeout() -> u64 { 20 }
fn default_analysis_timeout() -> u64 { 180 }
fn default_retrieval_timeout() -> u64 { 15 }
fn default_connect_timeout() -> u64 { 10 }
fn default_index_url() -> String { "http://127.0.0.1:5001".to_string() }
fn default_index_path() -> String { "/query_rag_documents".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "ragforge-context".to_string() }

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            gemini: default_gemini(),
            groq: default_groq(),
            ollama: default_ollama(),
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            default_k: default_k(),
            subquery_count: default_subquery_count(),
            max_context_chunks: default_max_context_chunks(),
            analysis_max_chars: default_analysis_max_chars(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            synthesis_secs: default_synthesis_timeout(),
            expansion_secs: default_expansion_timeout(),
            analysis_secs: default_analysis_timeout(),
            retrieval_secs: default_retrieval_timeout(),
            connect_secs: default_connect_timeout(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            base_url: default_index_url(),
            query_path: default_index_path(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: 0,
            service_name: default_service_name(),
        }
    }
}

impl ProviderEndpoint {
    /// Process-wide key, ignoring blank values
    pub fn fallback_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

impl TimeoutConfig {
    pub fn for_task(&self, task: Task) -> Duration {
        let secs = match task {
            Task::Analysis => self.analysis_secs,
            Task::SubQuery => self.expansion_secs,
            Task::Synthesis => self.synthesis_secs,
        };
        Duration::from_secs(secs)
    }

    pub fn retrieval(&self) -> Duration {
        Duration::from_secs(self.retrieval_secs)
    }

    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__RAG__DEFAULT_K=8
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        let mut loaded: AppConfig = config.try_deserialize()?;
        loaded.apply_env_fallbacks(|name| std::env::var(name).ok());
        Ok(loaded)
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        let mut loaded: AppConfig = config.try_deserialize()?;
        loaded.apply_env_fallbacks(|name| std::env::var(name).ok());
        Ok(loaded)
    }

    /// Fill unset credentials and the Ollama endpoint from the conventional
    /// un-prefixed variables (`GEMINI_API_KEY`, `GROQ_API_KEY`, `OLLAMA_BASE_URL`).
    pub fn apply_env_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        if self.providers.gemini.api_key.is_none() {
            self.providers.gemini.api_key = present(lookup("GEMINI_API_KEY"));
        }
        if self.providers.groq.api_key.is_none() {
            self.providers.groq.api_key = present(lookup("GROQ_API_KEY"));
        }
        if let Some(url) = present(lookup("OLLAMA_BASE_URL")) {
            if self.providers.ollama.base_url == default_ollama().base_url {
                self.providers.ollama.base_url = url;
            }
        }
    }
}
